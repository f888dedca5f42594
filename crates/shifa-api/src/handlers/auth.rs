// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Authentication handlers.
//!
//! Accounts live in the local store. Password hashing is CPU bound, so
//! store calls run on the blocking pool. The handlers never touch the
//! store's current-session slot; the bearer token is the session.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use shifa_core::{AuditAction, AuditLog, Permission, Role, Session, UserId};
use shifa_store::{FallbackUser, LocalFallbackStore, NewUser};

use crate::error::{ApiError, ApiResult};
use crate::extractors::{ClientIp, CurrentSession, OptionalSession, ValidatedJson};
use crate::response::{AccountSummary, ApiResponse, AuthResponse, SessionResponse};
use crate::state::AppState;

// =============================================================================
// Sign-up
// =============================================================================

/// Sign-up request body.
#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    /// Email address.
    pub email: String,
    /// Password.
    pub password: String,
    /// Display name.
    #[serde(default)]
    pub full_name: String,
    /// Requested role, `patient` when absent.
    #[serde(default)]
    pub role: Option<String>,
}

/// POST /api/auth/sign-up
///
/// Anyone may create a patient account. Any other role must be assigned by
/// a signed-in caller holding `users:manage`.
pub async fn sign_up(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    OptionalSession(caller): OptionalSession,
    ValidatedJson(request): ValidatedJson<SignUpRequest>,
) -> ApiResult<impl IntoResponse> {
    let role = match request.role.as_deref() {
        None => Role::Patient,
        Some(raw) => Role::parse(raw)
            .ok_or_else(|| ApiError::validation(format!("Unknown role '{raw}'")))?,
    };
    let assigned_by = authorize_role(&state, caller.as_ref(), role, client_ip.clone()).await?;
    let store = state.accounts()?.clone();

    let new_user = NewUser::new(request.email, request.password, request.full_name, role);
    let user = run_blocking(store, move |store| Ok(store.register(new_user)?)).await?;
    let session = session_for(&user);

    let mut entry = AuditLog::new(AuditAction::SignUp, &user.email)
        .with_user(user.id.as_str())
        .with_role(Some(role));
    if let Some(admin) = assigned_by {
        entry = entry.with_details(format!("assigned by {admin}"));
    }
    audit(&state, entry, client_ip);

    let token = state.jwt().create_session_token(&session)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse::new(
            token,
            state.jwt().expiration_secs(),
            summary(&user),
        )),
    ))
}

/// Checks that the caller may create an account with `role`.
///
/// Returns the assigning administrator for privileged roles.
async fn authorize_role(
    state: &AppState,
    caller: Option<&Session>,
    role: Role,
    client_ip: Option<String>,
) -> ApiResult<Option<UserId>> {
    if role == Role::Patient {
        return Ok(None);
    }

    let identity = state.resolver.resolve(caller).await;
    if identity.can(&state.registry, Permission::ManageUsers) {
        return Ok(identity.user_id);
    }

    tracing::warn!(
        requested = %role,
        caller = identity.user_id.as_ref().map(UserId::as_str).unwrap_or("anonymous"),
        "Role assignment refused"
    );
    let mut entry = AuditLog::new(AuditAction::AccessDenied, "/api/auth/sign-up")
        .with_role(identity.role())
        .with_details(format!("assign role {role}"));
    if let Some(user_id) = &identity.user_id {
        entry = entry.with_user(user_id.as_str());
    }
    audit(state, entry, client_ip);

    Err(ApiError::forbidden(format!(
        "Creating a {role} account requires users:manage"
    )))
}

// =============================================================================
// Sign-in
// =============================================================================

/// Sign-in request body.
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    /// Email address.
    pub email: String,
    /// Password.
    pub password: String,
}

/// POST /api/auth/sign-in
pub async fn sign_in(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    ValidatedJson(request): ValidatedJson<SignInRequest>,
) -> ApiResult<impl IntoResponse> {
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }
    let store = state.accounts()?.clone();

    let email = request.email.clone();
    let result = run_blocking(store, move |store| {
        Ok(store.authenticate(&request.email, &request.password)?)
    })
    .await;

    let user = match result {
        Ok(user) => user,
        Err(e) => {
            audit(
                &state,
                AuditLog::new(AuditAction::SignInFailed, email.trim().to_lowercase())
                    .with_details(e.error_code()),
                client_ip,
            );
            return Err(e);
        }
    };
    let session = session_for(&user);

    audit(
        &state,
        AuditLog::new(AuditAction::SignIn, &user.email)
            .with_user(session.user_id.as_str())
            .with_role(user.role()),
        client_ip,
    );

    let token = state.jwt().create_session_token(&session)?;
    Ok(Json(AuthResponse::new(
        token,
        state.jwt().expiration_secs(),
        summary(&user),
    )))
}

// =============================================================================
// Sign-out
// =============================================================================

/// POST /api/auth/sign-out
///
/// Records the sign-out. Tokens are stateless and stay valid until they
/// expire; the client discards its copy.
pub async fn sign_out(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    CurrentSession(session): CurrentSession,
) -> ApiResult<impl IntoResponse> {
    audit(
        &state,
        AuditLog::new(AuditAction::SignOut, session.id.as_str()).with_user(session.user_id.as_str()),
        client_ip,
    );

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Signed out"
    }))))
}

// =============================================================================
// Session
// =============================================================================

/// GET /api/auth/session
///
/// Returns the caller's session and the role resolved for it right now.
pub async fn current_session(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> ApiResult<impl IntoResponse> {
    let identity = state.resolver.resolve(Some(&session)).await;

    Ok(Json(ApiResponse::success(SessionResponse {
        user_id: session.user_id.clone(),
        session_id: session.id.clone(),
        email: session.email.clone(),
        role: identity.role(),
        permissions: identity
            .permissions(&state.registry)
            .names()
            .into_iter()
            .map(str::to_string)
            .collect(),
    })))
}

// =============================================================================
// Helpers
// =============================================================================

async fn run_blocking<T, F>(store: Arc<LocalFallbackStore>, f: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(Arc<LocalFallbackStore>) -> ApiResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(store))
        .await
        .map_err(|e| ApiError::internal(format!("Account task failed: {e}")))?
}

fn session_for(user: &FallbackUser) -> Session {
    Session::new(user.id.clone()).with_email(user.email.clone())
}

pub(crate) fn summary(user: &FallbackUser) -> AccountSummary {
    AccountSummary {
        id: user.id.clone(),
        email: user.email.clone(),
        full_name: user.full_name.clone(),
        role: user.role(),
        active: user.is_active,
    }
}

fn audit(state: &AppState, entry: AuditLog, client_ip: Option<String>) {
    let entry = match client_ip {
        Some(ip) => entry.with_client_ip(ip),
        None => entry,
    };
    let logger = state.audit().clone();
    tokio::spawn(async move {
        if let Err(e) = logger.log(entry).await {
            tracing::warn!(error = %e, "Failed to record audit entry");
        }
    });
}
