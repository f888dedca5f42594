// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! API server implementation.

use std::future::Future;
use std::net::SocketAddr;

use axum::{
    Router,
    http::{HeaderValue, Method, StatusCode, header},
    routing::{get, post},
};
use shifa_core::Permission;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::config::ApiSettings;
use crate::error::{ApiError, ApiResult};
use crate::handlers;
use crate::middleware::{RouteGuardLayer, SessionLayer};
use crate::state::AppState;

/// Guarded view routes and the permission each requires.
pub const GUARDED_VIEWS: [(&str, Permission); 10] = [
    ("/dashboard", Permission::ViewDashboard),
    ("/patients", Permission::ManagePatients),
    ("/sessions", Permission::ManageSessions),
    ("/rooms", Permission::ManageRooms),
    ("/finance", Permission::ViewFinance),
    ("/expenses", Permission::ManageExpenses),
    ("/reports", Permission::ViewReports),
    ("/facility", Permission::ManageFacility),
    ("/users", Permission::ManageUsers),
    ("/chat", Permission::AccessChat),
];

// =============================================================================
// ApiServer
// =============================================================================

/// The HTTP server.
pub struct ApiServer {
    state: AppState,
}

impl ApiServer {
    /// Creates a server over `state`.
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Returns the shared state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Returns the configured bind address.
    pub fn addr(&self) -> SocketAddr {
        self.state.settings.socket_addr()
    }

    /// Creates the router with all routes and middleware.
    pub fn router(&self) -> Router {
        let state = &self.state;
        let guarded = |permission: Permission| {
            RouteGuardLayer::new(state.guard(permission), state.resolver.clone())
                .with_audit(state.audit_logger.clone())
        };

        let mut router = Router::new()
            // Public
            .route("/health", get(handlers::health))
            .route("/ready", get(handlers::ready))
            .route("/api/auth/sign-up", post(handlers::sign_up))
            .route("/api/auth/sign-in", post(handlers::sign_in))
            // Session required
            .route("/api/auth/sign-out", post(handlers::sign_out))
            .route("/api/auth/session", get(handlers::current_session))
            .route("/api/navigation", get(handlers::navigation));

        // Guarded views
        for (path, permission) in GUARDED_VIEWS {
            router = router.route(path, get(handlers::view).route_layer(guarded(permission)));
        }

        let router = router
            .route(
                "/users/accounts",
                get(handlers::list_accounts).route_layer(guarded(Permission::ManageUsers)),
            )
            .route(
                "/chat/messages",
                get(handlers::list_messages)
                    .post(handlers::post_message)
                    .route_layer(guarded(Permission::AccessChat)),
            );

        let middleware_stack = ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new())
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                state.settings.request_timeout,
            ))
            .layer(create_cors_layer(&state.settings))
            .layer(SessionLayer::new(state.jwt_manager.clone()));

        router.layer(middleware_stack).with_state(state.clone())
    }

    /// Binds the configured address and serves until `shutdown` resolves.
    pub async fn run_with_shutdown(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> ApiResult<()> {
        let addr = self.addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to bind {addr}: {e}")))?;
        self.serve(listener, shutdown).await
    }

    /// Serves on an already bound listener until `shutdown` resolves.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> ApiResult<()> {
        let router = self.router();
        let local = listener
            .local_addr()
            .map_err(|e| ApiError::internal(format!("Listener has no address: {e}")))?;

        info!(addr = %local, "Starting API server");

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ApiError::internal(format!("Server error: {e}")))?;

        info!("API server shutdown complete");
        Ok(())
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Creates the CORS layer from settings.
fn create_cors_layer(settings: &ApiSettings) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT]);

    if settings.allows_any_origin() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = settings
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}
