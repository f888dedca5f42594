// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Authenticated sessions and resolved identities.
//!
//! A [`Session`] says who signed in. A [`SessionIdentity`] says what role
//! that user currently acts under, as resolved from the profile store when a
//! protected view is entered. Identities are values: they are passed
//! explicitly to guards and navigation filters and discarded with the view.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::permission::{Permission, PermissionSet};
use crate::registry::RoleRegistry;
use crate::role::Role;

// =============================================================================
// UserId
// =============================================================================

/// Opaque user identifier issued by the authentication provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wraps an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh time-ordered identifier.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// =============================================================================
// Session
// =============================================================================

/// An authenticated session.
///
/// Carries identity only. The role is never part of the session; it is
/// looked up from the profile store every time it is needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Session identifier.
    pub id: String,
    /// Authenticated user.
    pub user_id: UserId,
    /// Email used to sign in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// When the session was established.
    pub issued_at: DateTime<Utc>,
}

impl Session {
    /// Starts a session for `user_id` now.
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            user_id: user_id.into(),
            email: None,
            issued_at: Utc::now(),
        }
    }

    /// Sets the email.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the session identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

// =============================================================================
// SessionIdentity
// =============================================================================

/// The role resolved for a session at a point in time.
///
/// `role == None` is the unknown role: no session, a failed lookup, a
/// missing profile, or a stored value that is not a recognized role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    /// User the role was resolved for, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    /// Resolved role.
    pub role: Option<Role>,
    /// When the role was resolved.
    pub resolved_at: DateTime<Utc>,
}

impl SessionIdentity {
    /// An identity with a known role.
    pub fn known(user_id: impl Into<UserId>, role: Role) -> Self {
        Self {
            user_id: Some(user_id.into()),
            role: Some(role),
            resolved_at: Utc::now(),
        }
    }

    /// The unknown identity for an unauthenticated visitor.
    pub fn unknown() -> Self {
        Self {
            user_id: None,
            role: None,
            resolved_at: Utc::now(),
        }
    }

    /// The unknown identity for an authenticated user whose role could not
    /// be determined.
    pub fn unknown_for(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            role: None,
            resolved_at: Utc::now(),
        }
    }

    /// Returns the resolved role.
    pub fn role(&self) -> Option<Role> {
        self.role
    }

    /// Returns `true` when the role is known.
    pub fn is_known(&self) -> bool {
        self.role.is_some()
    }

    /// Returns `true` if the identity holds `permission`.
    pub fn can(&self, registry: &RoleRegistry, permission: Permission) -> bool {
        registry.has_permission(self.role, permission)
    }

    /// Every permission held by the identity.
    pub fn permissions(&self, registry: &RoleRegistry) -> PermissionSet {
        registry.permissions_for(self.role)
    }
}

impl Default for SessionIdentity {
    fn default() -> Self {
        Self::unknown()
    }
}
