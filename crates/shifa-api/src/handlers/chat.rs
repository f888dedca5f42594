// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Chat message handlers.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::extractors::{GuardedIdentity, ValidatedJson};
use crate::response::ApiResponse;
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 500;

/// Query parameters for listing messages.
#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    /// Newest messages to return.
    pub limit: Option<usize>,
}

/// New message body.
#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    /// Message text.
    pub body: String,
}

/// GET /chat/messages
pub async fn list_messages(
    State(state): State<AppState>,
    GuardedIdentity(_identity): GuardedIdentity,
    Query(query): Query<ChatQuery>,
) -> ApiResult<impl IntoResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let messages = state.chat_room()?.recent(limit);
    Ok(Json(ApiResponse::success(messages)))
}

/// POST /chat/messages
pub async fn post_message(
    State(state): State<AppState>,
    GuardedIdentity(identity): GuardedIdentity,
    ValidatedJson(request): ValidatedJson<PostMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let sender = identity
        .user_id
        .clone()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    let message = state
        .chat_room()?
        .post(sender, identity.role(), &request.body)?;

    tracing::debug!(message_id = %message.id, "Chat message posted");
    Ok((StatusCode::CREATED, Json(ApiResponse::success(message))))
}
