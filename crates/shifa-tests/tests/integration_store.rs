// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Store Integration Tests
//!
//! The local account file, the hosted profile table behind a stub REST
//! endpoint, and the failover pair in front of both.
//!
//! ## Test Categories
//!
//! - `test_local_*`: Local fallback accounts
//! - `test_hosted_*`: Hosted profile reads
//! - `test_failover_*`: Hosted-then-local resolution

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::get,
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use shifa_store::{
    AuthError, FailoverProfileStore, HostedProfileStore, LocalFallbackStore, NewUser,
};
use shifa_tests::prelude::*;

// =============================================================================
// Stub REST Endpoint
// =============================================================================

/// What the stub answers, and what it saw.
#[derive(Clone)]
struct Stub {
    status: StatusCode,
    body: String,
    seen: Arc<Mutex<Vec<(HashMap<String, String>, HeaderMap)>>>,
}

async fn profiles(
    State(stub): State<Stub>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    stub.seen.lock().push((query, headers));
    (stub.status, stub.body.clone()).into_response()
}

/// Serves `/rest/v1/profiles` and returns the base URL.
async fn spawn_stub(status: StatusCode, body: Value) -> (String, Stub) {
    let stub = Stub {
        status,
        body: body.to_string(),
        seen: Arc::new(Mutex::new(Vec::new())),
    };
    let app = Router::new()
        .route("/rest/v1/profiles", get(profiles))
        .with_state(stub.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), stub)
}

/// A base URL nothing listens on.
fn dead_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn hosted(url: &str) -> HostedProfileStore {
    HostedProfileStore::new(url, Duration::from_secs(2))
        .unwrap()
        .with_table("profiles")
}

fn open_local(dir: &tempfile::TempDir) -> LocalFallbackStore {
    LocalFallbackStore::open(dir.path().join("users.json")).unwrap()
}

// =============================================================================
// Local Account Tests
// =============================================================================

#[test]
fn test_local_sign_up_persists_hashed_account() {
    init_test_logging();
    let dir = temp_test_dir("shifa-store-");

    let session = {
        let store = open_local(&dir);
        let session = store.sign_up(AccountFixtures::new_user(Role::Therapist)).unwrap();
        assert_eq!(store.current_session(), Some(session.clone()));
        session
    };

    let store = open_local(&dir);
    let user = store.find_by_email("THERAPIST@clinic.example").unwrap();
    assert_eq!(user.id, session.user_id);
    assert_eq!(user.role(), Some(Role::Therapist));
    assert!(user.is_hashed());
    assert_ne!(user.password, TEST_PASSWORD);
    assert_eq!(
        user.permissions,
        RoleRegistry::new().legacy_permission_map(Role::Therapist)
    );
    assert!(store.current_session().is_none());
}

#[test]
fn test_local_sign_in_round_trip() {
    let store = LocalFallbackStore::in_memory();
    let created = store.sign_up(AccountFixtures::new_user(Role::Accountant)).unwrap();
    store.sign_out();
    assert!(store.current_session().is_none());

    let session = store
        .sign_in(&AccountFixtures::email(Role::Accountant), TEST_PASSWORD)
        .unwrap();
    assert_eq!(session.user_id, created.user_id);
    assert_eq!(store.role_of(&session.user_id), Some(Role::Accountant));
}

#[test]
fn test_local_bad_credentials_look_the_same() {
    let store = LocalFallbackStore::in_memory();
    store.sign_up(AccountFixtures::new_user(Role::Patient)).unwrap();

    let wrong_password = store
        .sign_in(&AccountFixtures::email(Role::Patient), "not-the-password")
        .unwrap_err();
    let unknown_email = store.sign_in("ghost@clinic.example", TEST_PASSWORD).unwrap_err();

    assert!(matches!(wrong_password, AuthError::InvalidCredentials));
    assert!(matches!(unknown_email, AuthError::InvalidCredentials));
    assert_eq!(wrong_password.to_string(), unknown_email.to_string());
}

#[test]
fn test_local_sign_up_rejections() {
    let store = LocalFallbackStore::in_memory().with_min_password_length(10);

    let weak = store
        .sign_up(NewUser::new("a@clinic.example", "short", "A", Role::Patient))
        .unwrap_err();
    assert!(matches!(weak, AuthError::WeakPassword { min_length: 10 }));

    let malformed = store
        .sign_up(NewUser::new("not-an-email", TEST_PASSWORD, "A", Role::Patient))
        .unwrap_err();
    assert!(matches!(malformed, AuthError::InvalidEmail { .. }));

    store.sign_up(AccountFixtures::new_user(Role::Patient)).unwrap();
    let duplicate = store
        .sign_up(AccountFixtures::new_user(Role::Patient))
        .unwrap_err();
    assert!(matches!(duplicate, AuthError::EmailTaken { .. }));
    assert_eq!(store.len(), 1);
}

#[test]
fn test_local_plain_text_password_is_upgraded() {
    let dir = temp_test_dir("shifa-store-");
    std::fs::write(
        dir.path().join("users.json"),
        json!([{
            "id": "legacy-1",
            "email": "old@clinic.example",
            "password": "plain-pass-1",
            "full_name": "Old Account",
            "role": "receptionist",
        }])
        .to_string(),
    )
    .unwrap();

    let store = open_local(&dir);
    assert!(!store.find_by_email("old@clinic.example").unwrap().is_hashed());
    assert!(store.sign_in("old@clinic.example", "wrong").is_err());

    store.sign_in("old@clinic.example", "plain-pass-1").unwrap();

    let reopened = open_local(&dir);
    let user = reopened.find_by_email("old@clinic.example").unwrap();
    assert!(user.is_hashed());
    assert!(reopened.sign_in("old@clinic.example", "plain-pass-1").is_ok());
}

#[test]
fn test_local_legacy_drift_is_reported() {
    let dir = temp_test_dir("shifa-store-");
    std::fs::write(
        dir.path().join("users.json"),
        json!([{
            "id": "t-1",
            "email": "t@clinic.example",
            "password": "irrelevant",
            "role": "therapist",
            "permissions": {
                "dashboard": true, "patients": true, "sessions": true,
                "chat": true, "finance": true
            },
        }])
        .to_string(),
    )
    .unwrap();

    let drift = open_local(&dir).legacy_drift();
    assert_eq!(drift.len(), 1);
    assert_eq!(drift[0].role, Role::Therapist);
    assert_eq!(drift[0].permissions, vec![Permission::ViewFinance]);
}

#[tokio::test]
async fn test_local_deactivation_ends_session_and_role() {
    let store = Arc::new(LocalFallbackStore::in_memory());
    let session = store.sign_up(AccountFixtures::new_user(Role::Supervisor)).unwrap();
    let resolver = SessionRoleResolver::new(store.clone());
    assert_eq!(
        resolver.resolve(Some(&session)).await.role(),
        Some(Role::Supervisor)
    );

    store
        .set_active(&AccountFixtures::email(Role::Supervisor), false)
        .unwrap();

    assert!(store.current_session().is_none());
    assert_eq!(store.role_of(&session.user_id), None);
    assert!(!resolver.resolve(Some(&session)).await.is_known());
    assert!(matches!(
        store.sign_in(&AccountFixtures::email(Role::Supervisor), TEST_PASSWORD),
        Err(AuthError::AccountDisabled)
    ));
}

#[tokio::test]
async fn test_local_subscription_reports_sign_in_and_out() {
    let store = LocalFallbackStore::in_memory();
    let mut subscription = store.subscribe();

    let session = store.sign_up(AccountFixtures::new_user(Role::Patient)).unwrap();
    let change = tokio::time::timeout(Duration::from_secs(1), subscription.next())
        .await
        .unwrap();
    assert_eq!(change, Some(Some(session)));

    store.sign_out();
    let change = tokio::time::timeout(Duration::from_secs(1), subscription.next())
        .await
        .unwrap();
    assert_eq!(change, Some(None));

    subscription.cancel();
    assert_eq!(subscription.next().await, None);
}

// =============================================================================
// Hosted Store Tests
// =============================================================================

#[tokio::test]
async fn test_hosted_reads_profile_row() {
    init_test_logging();
    let (url, stub) = spawn_stub(
        StatusCode::OK,
        json!([{"id": "u-1", "role": "therapist", "full_name": "Nour", "is_active": true}]),
    )
    .await;
    let store = hosted(&url).with_api_key("anon-key");

    let profile = store
        .fetch_profile(&UserId::new("u-1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(profile.role, "therapist");
    assert_eq!(profile.full_name.as_deref(), Some("Nour"));

    let seen = stub.seen.lock();
    let (query, headers) = &seen[0];
    assert_eq!(query["id"], "eq.u-1");
    assert_eq!(query["select"], "id,role,full_name,is_active");
    assert_eq!(headers["apikey"], "anon-key");
    assert_eq!(headers["authorization"], "Bearer anon-key");
}

#[tokio::test]
async fn test_hosted_no_rows_is_none() {
    let (url, _stub) = spawn_stub(StatusCode::OK, json!([])).await;
    let profile = hosted(&url).fetch_profile(&UserId::new("u-1")).await.unwrap();
    assert!(profile.is_none());
}

#[tokio::test]
async fn test_hosted_error_statuses() {
    let (url, _stub) = spawn_stub(StatusCode::SERVICE_UNAVAILABLE, json!({})).await;
    let err = hosted(&url).fetch_profile(&UserId::new("u-1")).await.unwrap_err();
    assert!(err.is_unreachable(), "{err}");

    let (url, _stub) = spawn_stub(StatusCode::UNAUTHORIZED, json!({"message": "bad key"})).await;
    let err = hosted(&url).fetch_profile(&UserId::new("u-1")).await.unwrap_err();
    assert!(matches!(err, StoreError::Backend { status: 401, .. }), "{err}");
}

#[tokio::test]
async fn test_hosted_garbage_body_is_decode_error() {
    let (url, _stub) = spawn_stub(StatusCode::OK, json!({"not": "a list"})).await;
    let err = hosted(&url).fetch_profile(&UserId::new("u-1")).await.unwrap_err();
    assert!(matches!(err, StoreError::Decode { .. }), "{err}");
}

// =============================================================================
// Failover Tests
// =============================================================================

fn local_with_therapist() -> (Arc<LocalFallbackStore>, Session) {
    let local = Arc::new(LocalFallbackStore::in_memory());
    let session = local.sign_up(AccountFixtures::new_user(Role::Therapist)).unwrap();
    (local, session)
}

#[tokio::test]
async fn test_failover_uses_local_when_hosted_is_down() {
    init_test_logging();
    let (local, session) = local_with_therapist();
    let failover = FailoverProfileStore::new(Arc::new(hosted(&dead_url())), local);
    let resolver = SessionRoleResolver::new(Arc::new(failover));

    assert_eq!(resolver.store_name(), "failover");
    assert_eq!(
        resolver.resolve(Some(&session)).await.role(),
        Some(Role::Therapist)
    );
}

#[tokio::test]
async fn test_failover_trusts_hosted_answer() {
    let (local, session) = local_with_therapist();
    let (url, stub) = spawn_stub(StatusCode::OK, json!([])).await;
    let failover = FailoverProfileStore::new(Arc::new(hosted(&url)), local);

    let identity = SessionRoleResolver::new(Arc::new(failover))
        .resolve(Some(&session))
        .await;

    assert!(!identity.is_known());
    assert_eq!(stub.seen.lock().len(), 1);
}

#[tokio::test]
async fn test_failover_does_not_mask_backend_errors() {
    let (local, session) = local_with_therapist();
    let (url, _stub) = spawn_stub(StatusCode::INTERNAL_SERVER_ERROR, json!({})).await;
    let failover = FailoverProfileStore::new(Arc::new(hosted(&url)), local);

    let err = failover.fetch_profile(&session.user_id).await.unwrap_err();
    assert!(matches!(err, StoreError::Backend { status: 500, .. }));
}

#[tokio::test]
async fn test_failover_with_scripted_primary() {
    let primary =
        Arc::new(ScriptedProfileStore::named("primary").failing(FailureMode::Unavailable));
    let secondary =
        Arc::new(ScriptedProfileStore::named("secondary").with_profile("u-1", "accountant"));
    let failover = FailoverProfileStore::new(primary.clone(), secondary.clone());

    let profile = failover.fetch_profile(&UserId::new("u-1")).await.unwrap();
    assert_eq!(profile.map(|p| p.role), Some("accountant".to_string()));
    assert_eq!((primary.calls(), secondary.calls()), (1, 1));

    primary.set_failure(FailureMode::None);
    primary.insert(ProfileRecord::new("u-1", "admin"));
    let profile = failover.fetch_profile(&UserId::new("u-1")).await.unwrap();
    assert_eq!(profile.map(|p| p.role), Some("admin".to_string()));
    assert_eq!(secondary.calls(), 1);
}
