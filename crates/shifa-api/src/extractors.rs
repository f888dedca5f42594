// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Custom extractors for API handlers.

use std::net::SocketAddr;

use axum::{
    Json,
    extract::{ConnectInfo, FromRequestParts},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use shifa_core::{Session, SessionIdentity};

use crate::error::ApiError;
use crate::middleware::RequestSession;

// =============================================================================
// Session Extractors
// =============================================================================

/// The caller's session. Rejects with 401 when there is none.
///
/// ```rust,ignore
/// async fn handler(CurrentSession(session): CurrentSession) -> impl IntoResponse {
///     session.user_id.to_string()
/// }
/// ```
pub struct CurrentSession(pub Session);

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestSession>()
            .and_then(|s| s.0.clone())
            .map(CurrentSession)
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// The caller's session, if any.
pub struct OptionalSession(pub Option<Session>);

impl<S> FromRequestParts<S> for OptionalSession
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalSession(
            parts
                .extensions
                .get::<RequestSession>()
                .and_then(|s| s.0.clone()),
        ))
    }
}

// =============================================================================
// Guarded Identity
// =============================================================================

/// The identity a route guard resolved for this request.
///
/// Only present behind a guard layer; elsewhere the request is rejected.
pub struct GuardedIdentity(pub SessionIdentity);

impl<S> FromRequestParts<S> for GuardedIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionIdentity>()
            .cloned()
            .map(GuardedIdentity)
            .ok_or_else(|| ApiError::internal("Route is not guarded"))
    }
}

// =============================================================================
// Client IP
// =============================================================================

/// Client address, when the server was started with connect info.
pub struct ClientIp(pub Option<String>);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientIp(
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ci| ci.0.ip().to_string()),
        ))
    }
}

// =============================================================================
// Validated JSON Extractor
// =============================================================================

/// JSON body with malformed input reported as 400.
pub struct ValidatedJson<T>(pub T);

impl<S, T> axum::extract::FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(
        req: axum::http::Request<axum::body::Body>,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid JSON: {e}")))?;

        Ok(ValidatedJson(value))
    }
}
