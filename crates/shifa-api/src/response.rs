// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! API response types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use shifa_core::{NavEntry, Role, SessionIdentity, UserId};

// =============================================================================
// ApiResponse
// =============================================================================

/// Success envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Always `true`; errors use the error body instead.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T> ApiResponse<T> {
    /// Wraps `data`.
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

// =============================================================================
// Health
// =============================================================================

/// Liveness response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: String,
    /// Version string.
    pub version: String,
}

impl HealthResponse {
    /// Creates a healthy response.
    pub fn healthy() -> Self {
        Self {
            status: "ok".to_string(),
            version: crate::VERSION.to_string(),
        }
    }
}

/// Readiness response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// Whether the service is ready.
    pub ready: bool,
    /// Component statuses.
    pub components: Vec<ComponentStatus>,
}

/// Status of a system component.
#[derive(Debug, Serialize, Deserialize)]
pub struct ComponentStatus {
    /// Component name.
    pub name: String,
    /// Whether the component is healthy.
    pub healthy: bool,
    /// Optional message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// =============================================================================
// Auth
// =============================================================================

/// Account summary returned after sign-in and sign-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSummary {
    /// User ID.
    pub id: UserId,
    /// Email.
    pub email: String,
    /// Display name.
    pub full_name: String,
    /// Current role, if recognized.
    pub role: Option<Role>,
    /// Whether the account may sign in.
    pub active: bool,
}

/// Sign-in and sign-up response.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Session token.
    pub token: String,
    /// Token type (always "Bearer").
    pub token_type: String,
    /// Expires in seconds.
    pub expires_in: i64,
    /// The signed-in account.
    pub user: AccountSummary,
}

impl AuthResponse {
    /// Creates an auth response.
    pub fn new(token: String, expires_in: i64, user: AccountSummary) -> Self {
        Self {
            token,
            token_type: "Bearer".to_string(),
            expires_in,
            user,
        }
    }
}

/// Current session with its freshly resolved role.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    /// User ID.
    pub user_id: UserId,
    /// Session ID.
    pub session_id: String,
    /// Email, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Resolved role; `null` when unknown.
    pub role: Option<Role>,
    /// Granted permissions.
    pub permissions: Vec<String>,
}

// =============================================================================
// Views and navigation
// =============================================================================

/// Descriptor returned by a guarded view.
#[derive(Debug, Serialize, Deserialize)]
pub struct ViewResponse {
    /// View route.
    pub view: String,
    /// Role the view was rendered for.
    pub role: Option<Role>,
    /// Permissions of that role.
    pub permissions: Vec<String>,
}

impl ViewResponse {
    /// Describes `view` as seen by `identity`.
    pub fn new(
        view: impl Into<String>,
        identity: &SessionIdentity,
        registry: &shifa_core::RoleRegistry,
    ) -> Self {
        Self {
            view: view.into(),
            role: identity.role(),
            permissions: identity
                .permissions(registry)
                .names()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Menu visible to the caller.
#[derive(Debug, Serialize, Deserialize)]
pub struct NavigationResponse {
    /// Resolved role; `null` when unknown.
    pub role: Option<Role>,
    /// Visible entries in menu order.
    pub entries: Vec<NavEntry>,
}
