// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session token middleware.
//!
//! Turns the bearer token into a [`RequestSession`] extension. A missing,
//! expired or forged token yields an empty session rather than an error;
//! whether that is acceptable is up to the route.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    http::{Request, header},
    response::Response,
};
use shifa_core::Session;
use tower::{Layer, Service};

use crate::auth::JwtManager;

/// The session attached to a request, if any.
#[derive(Debug, Clone, Default)]
pub struct RequestSession(pub Option<Session>);

impl RequestSession {
    /// Borrows the session.
    pub fn session(&self) -> Option<&Session> {
        self.0.as_ref()
    }
}

// =============================================================================
// SessionLayer
// =============================================================================

/// Layer attaching a [`RequestSession`] to every request.
#[derive(Clone)]
pub struct SessionLayer {
    jwt_manager: Arc<JwtManager>,
}

impl SessionLayer {
    /// Creates a session layer.
    pub fn new(jwt_manager: Arc<JwtManager>) -> Self {
        Self { jwt_manager }
    }
}

impl<S> Layer<S> for SessionLayer {
    type Service = SessionMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SessionMiddleware {
            inner,
            jwt_manager: self.jwt_manager.clone(),
        }
    }
}

// =============================================================================
// SessionMiddleware
// =============================================================================

/// Middleware produced by [`SessionLayer`].
#[derive(Clone)]
pub struct SessionMiddleware<S> {
    inner: S,
    jwt_manager: Arc<JwtManager>,
}

impl<S> Service<Request<Body>> for SessionMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let session = extract_bearer_token(&req).and_then(|token| {
            self.jwt_manager
                .session_from_token(&token)
                .inspect_err(|e| tracing::debug!(error = %e, "Ignoring invalid session token"))
                .ok()
        });

        req.extensions_mut().insert(RequestSession(session));

        let mut inner = self.inner.clone();
        Box::pin(async move { inner.call(req).await })
    }
}

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token<B>(req: &Request<B>) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_bearer_token() {
        let mut req = Request::builder().uri("/").body(Body::empty()).unwrap();
        assert!(extract_bearer_token(&req).is_none());

        req.headers_mut()
            .insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(extract_bearer_token(&req).is_none());

        req.headers_mut()
            .insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(extract_bearer_token(&req).is_none());

        req.headers_mut().insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );
        assert_eq!(extract_bearer_token(&req).as_deref(), Some("abc.def.ghi"));
    }
}
