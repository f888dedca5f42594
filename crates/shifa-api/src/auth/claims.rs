// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! JWT claims structure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shifa_core::{Session, UserId};
use uuid::Uuid;

/// Claims carried by a session token.
///
/// Identity only. There is no role claim; the role is read from the profile
/// store on every guarded request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    // =========================================================================
    // Standard JWT Claims (RFC 7519)
    // =========================================================================
    /// Subject, the user ID.
    pub sub: String,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Issued at time (Unix timestamp).
    pub iat: i64,

    /// Not before time (Unix timestamp).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// Issuer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// JWT ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,

    // =========================================================================
    // Custom Claims
    // =========================================================================
    /// Email used to sign in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Session ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl Claims {
    /// Creates claims for `session` valid for `expires_in_secs`.
    pub fn for_session(session: &Session, expires_in_secs: i64) -> Self {
        let now = Utc::now().timestamp();

        Self {
            sub: session.user_id.as_str().to_string(),
            exp: now + expires_in_secs,
            iat: session.issued_at.timestamp(),
            nbf: Some(now),
            iss: None,
            jti: Some(Uuid::now_v7().to_string()),
            email: session.email.clone(),
            session_id: Some(session.id.clone()),
        }
    }

    /// Sets the issuer.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.iss = Some(issuer.into());
        self
    }

    /// Returns the user ID.
    pub fn user_id(&self) -> &str {
        &self.sub
    }

    /// Returns `true` if the token has expired.
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }

    /// Returns the expiration time.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Rebuilds the session the token was issued for.
    pub fn to_session(&self) -> Session {
        let mut session = Session::new(UserId::new(self.sub.clone()));
        if let Some(id) = &self.session_id {
            session = session.with_id(id.clone());
        }
        if let Some(email) = &self.email {
            session = session.with_email(email.clone());
        }
        if let Some(issued_at) = DateTime::from_timestamp(self.iat, 0) {
            session.issued_at = issued_at;
        }
        session
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_carry_identity_only() {
        let session = Session::new("u-42").with_email("dana@clinic.org");
        let claims = Claims::for_session(&session, 3600).with_issuer("shifa");

        let json = serde_json::to_value(&claims).unwrap();
        assert!(json.get("role").is_none());
        assert!(json.get("roles").is_none());
        assert_eq!(json["sub"], "u-42");
        assert!(!claims.is_expired());

        let restored = claims.to_session();
        assert_eq!(restored.user_id, session.user_id);
        assert_eq!(restored.id, session.id);
        assert_eq!(restored.email, session.email);
    }

    #[test]
    fn test_expired_claims() {
        let mut claims = Claims::for_session(&Session::new("u-1"), 60);
        claims.exp = Utc::now().timestamp() - 10;
        assert!(claims.is_expired());
        assert!(claims.expires_at().is_some());
    }
}
