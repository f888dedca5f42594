// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Guarded view handlers.
//!
//! The guard has already resolved and checked the role by the time these
//! run; they only describe what was rendered.

use axum::{
    Json,
    extract::{MatchedPath, State},
};

use crate::error::ApiResult;
use crate::extractors::GuardedIdentity;
use crate::handlers::auth::summary;
use crate::response::{AccountSummary, ApiResponse, ViewResponse};
use crate::state::AppState;

/// GET on any guarded view route.
pub async fn view(
    State(state): State<AppState>,
    path: MatchedPath,
    GuardedIdentity(identity): GuardedIdentity,
) -> Json<ViewResponse> {
    Json(ViewResponse::new(path.as_str(), &identity, &state.registry))
}

/// GET /users/accounts
///
/// Local accounts, for user administration.
pub async fn list_accounts(
    State(state): State<AppState>,
    GuardedIdentity(_identity): GuardedIdentity,
) -> ApiResult<Json<ApiResponse<Vec<AccountSummary>>>> {
    let accounts = state.accounts()?.users().iter().map(summary).collect();
    Ok(Json(ApiResponse::success(accounts)))
}
