// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Health check handlers.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::response::{ComponentStatus, HealthResponse, ReadinessResponse};
use crate::state::AppState;

/// GET /health
///
/// Liveness check. Returns 200 OK if the service is running.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse::healthy())
}

/// GET /ready
///
/// Reports the components the service depends on.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let mut components = vec![ComponentStatus {
        name: "profile_store".to_string(),
        healthy: true,
        message: Some(state.resolver.store_name().to_string()),
    }];

    components.push(match &state.fallback {
        Some(store) => ComponentStatus {
            name: "local_accounts".to_string(),
            healthy: true,
            message: Some(format!("{} accounts", store.len())),
        },
        None => ComponentStatus {
            name: "local_accounts".to_string(),
            healthy: true,
            message: Some("Disabled".to_string()),
        },
    });

    components.push(ComponentStatus {
        name: "chat".to_string(),
        healthy: true,
        message: Some(
            if state.chat.is_some() {
                "Sealed"
            } else {
                "Not configured"
            }
            .to_string(),
        ),
    });

    let ready = components.iter().all(|c| c.healthy);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(ReadinessResponse { ready, components }))
}
