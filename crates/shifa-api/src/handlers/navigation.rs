// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Navigation handler.

use axum::{Json, extract::State};

use crate::extractors::CurrentSession;
use crate::response::NavigationResponse;
use crate::state::AppState;

/// GET /api/navigation
///
/// Menu entries the caller's current role may open, in menu order. An
/// unresolvable role gets an empty menu.
pub async fn navigation(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Json<NavigationResponse> {
    let identity = state.resolver.resolve(Some(&session)).await;
    let role = identity.role();

    Json(NavigationResponse {
        role,
        entries: state.navigation.visible(role),
    })
}
