// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session token management.

use std::sync::Arc;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use shifa_config::schema::{JwtSettings, MIN_JWT_SECRET_LENGTH};
use shifa_core::Session;

use super::Claims;
use crate::error::{ApiError, ApiResult};

// =============================================================================
// JwtConfig
// =============================================================================

/// Signing parameters.
#[derive(Clone)]
pub struct JwtConfig {
    /// Signing secret.
    pub secret: String,
    /// Token issuer.
    pub issuer: String,
    /// Token lifetime in seconds.
    pub expiration_secs: i64,
    /// Clock skew tolerance in seconds.
    pub leeway_secs: u64,
}

impl JwtConfig {
    /// Creates a configuration with the given secret and defaults.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: "shifa".to_string(),
            expiration_secs: 28_800,
            leeway_secs: 30,
        }
    }

    /// Builds from configuration, using `secret` as the signing key.
    pub fn from_settings(settings: &JwtSettings, secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: settings.issuer.clone(),
            expiration_secs: i64::try_from(settings.expiration_secs).unwrap_or(i64::MAX),
            leeway_secs: 30,
        }
    }

    /// Sets the issuer.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Sets the token lifetime.
    pub fn with_expiration_secs(mut self, secs: i64) -> Self {
        self.expiration_secs = secs;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ApiResult<()> {
        if self.secret.is_empty() {
            return Err(ApiError::internal("JWT secret is not configured"));
        }
        if self.secret.len() < MIN_JWT_SECRET_LENGTH {
            tracing::warn!(
                min = MIN_JWT_SECRET_LENGTH,
                "JWT secret is shorter than recommended"
            );
        }
        if self.expiration_secs <= 0 {
            return Err(ApiError::internal("JWT expiration must be positive"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("issuer", &self.issuer)
            .field("expiration_secs", &self.expiration_secs)
            .field("leeway_secs", &self.leeway_secs)
            .finish()
    }
}

// =============================================================================
// JwtManager
// =============================================================================

/// Issues and validates session tokens (HS256).
#[derive(Clone)]
pub struct JwtManager {
    config: Arc<JwtConfig>,
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    validation: Arc<Validation>,
}

impl JwtManager {
    /// Creates a manager.
    pub fn new(config: JwtConfig) -> ApiResult<Self> {
        config.validate()?;

        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.issuer]);
        validation.leeway = config.leeway_secs;
        validation.validate_aud = false;

        Ok(Self {
            config: Arc::new(config),
            encoding_key: Arc::new(encoding_key),
            decoding_key: Arc::new(decoding_key),
            validation: Arc::new(validation),
        })
    }

    /// Signs `claims`.
    pub fn create_token(&self, claims: &Claims) -> ApiResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| ApiError::internal(format!("Failed to create token: {e}")))
    }

    /// Issues a token for `session`.
    pub fn create_session_token(&self, session: &Session) -> ApiResult<String> {
        let claims = Claims::for_session(session, self.config.expiration_secs)
            .with_issuer(&self.config.issuer);
        self.create_token(&claims)
    }

    /// Validates a token and returns its claims.
    pub fn validate_token(&self, token: &str) -> ApiResult<Claims> {
        use jsonwebtoken::errors::ErrorKind;

        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => ApiError::unauthorized("Token has expired"),
                ErrorKind::InvalidToken => ApiError::unauthorized("Invalid token format"),
                ErrorKind::InvalidSignature => ApiError::unauthorized("Invalid token signature"),
                ErrorKind::InvalidIssuer => ApiError::unauthorized("Invalid token issuer"),
                _ => ApiError::unauthorized(format!("Token validation failed: {e}")),
            })
    }

    /// Validates a token and rebuilds its session.
    pub fn session_from_token(&self, token: &str) -> ApiResult<Session> {
        self.validate_token(token).map(|claims| claims.to_session())
    }

    /// Token lifetime in seconds.
    pub fn expiration_secs(&self) -> i64 {
        self.config.expiration_secs
    }

    /// Token issuer.
    pub fn issuer(&self) -> &str {
        &self.config.issuer
    }
}

impl std::fmt::Debug for JwtManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtManager")
            .field("config", &self.config)
            .finish()
    }
}
