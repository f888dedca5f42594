// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Route guard middleware.
//!
//! Applied per route. Resolves the caller's role from the profile store on
//! every request and either passes the request on with the resolved
//! [`SessionIdentity`] attached, or answers `303 See Other` to the guard's
//! redirect target. A denial carries no body, so the caller learns nothing
//! about what the route requires.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode, header},
    response::{IntoResponse, Response},
};
use shifa_core::{AuditLog, AuditLogger, GuardOutcome, RouteGuard, SessionIdentity, SessionRoleResolver};
use tower::{Layer, Service};

use super::session::RequestSession;

// =============================================================================
// RouteGuardLayer
// =============================================================================

/// Layer enforcing a [`RouteGuard`].
#[derive(Clone)]
pub struct RouteGuardLayer {
    guard: Arc<RouteGuard>,
    resolver: SessionRoleResolver,
    audit: Option<Arc<dyn AuditLogger>>,
}

impl RouteGuardLayer {
    /// Creates a guard layer.
    pub fn new(guard: RouteGuard, resolver: SessionRoleResolver) -> Self {
        Self {
            guard: Arc::new(guard),
            resolver,
            audit: None,
        }
    }

    /// Records every decision with `logger`.
    pub fn with_audit(mut self, logger: Arc<dyn AuditLogger>) -> Self {
        self.audit = Some(logger);
        self
    }
}

impl<S> Layer<S> for RouteGuardLayer {
    type Service = RouteGuardMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RouteGuardMiddleware {
            inner,
            guard: self.guard.clone(),
            resolver: self.resolver.clone(),
            audit: self.audit.clone(),
        }
    }
}

// =============================================================================
// RouteGuardMiddleware
// =============================================================================

/// Middleware produced by [`RouteGuardLayer`].
#[derive(Clone)]
pub struct RouteGuardMiddleware<S> {
    inner: S,
    guard: Arc<RouteGuard>,
    resolver: SessionRoleResolver,
    audit: Option<Arc<dyn AuditLogger>>,
}

impl<S> Service<Request<Body>> for RouteGuardMiddleware<S>
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
        let guard = self.guard.clone();
        let resolver = self.resolver.clone();
        let audit = self.audit.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let session = req
                .extensions()
                .get::<RequestSession>()
                .and_then(|s| s.0.clone());
            let route = req.uri().path().to_string();
            let client_ip = req
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ci| ci.0.ip().to_string());

            let outcome = guard.check(&resolver, session.as_ref()).await;
            if let Some(logger) = audit {
                record(logger, &outcome, route, client_ip);
            }

            match outcome {
                GuardOutcome::Render(identity) => {
                    req.extensions_mut().insert(identity);
                    inner.call(req).await
                }
                GuardOutcome::Redirect { to, .. } => Ok(redirect(&to)),
            }
        })
    }
}

/// `303 See Other` to `to` with an empty body.
fn redirect(to: &str) -> Response {
    match header::HeaderValue::from_str(to) {
        Ok(location) => (StatusCode::SEE_OTHER, [(header::LOCATION, location)]).into_response(),
        Err(_) => StatusCode::FORBIDDEN.into_response(),
    }
}

fn record(
    logger: Arc<dyn AuditLogger>,
    outcome: &GuardOutcome,
    route: String,
    client_ip: Option<String>,
) {
    let identity: &SessionIdentity = outcome.identity();
    let mut entry = AuditLog::access(
        outcome.is_render(),
        route,
        identity.user_id.as_ref().map(|u| u.as_str()),
        identity.role(),
    );
    if let Some(ip) = client_ip {
        entry = entry.with_client_ip(ip);
    }

    tokio::spawn(async move {
        if let Err(e) = logger.log(entry).await {
            tracing::warn!(error = %e, "Failed to record access decision");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_response() {
        let response = redirect("/");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");
    }

    #[test]
    fn test_unencodable_target_is_forbidden() {
        let response = redirect("/bad\nroute");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
