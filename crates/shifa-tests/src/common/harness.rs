// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Harness
//!
//! Drives the full HTTP router in process with `tower::ServiceExt::oneshot`.
//! Each harness owns a temporary directory for its account file, an
//! in-memory audit log and a chat room with a fresh key.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Request, StatusCode, header};
use axum::response::Response;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use shifa_api::{ApiServer, ApiSettings, AppState, ChatRoom, JwtConfig, JwtManager};
use shifa_config::{MessageSealer, generate_key};
use shifa_core::audit::InMemoryAuditLogger;
use shifa_core::{AuditLog, ProfileStore, Role, Session, SessionRoleResolver};
use shifa_store::LocalFallbackStore;

use super::fixtures::{AccountFixtures, TEST_JWT_SECRET, TEST_PASSWORD};
use super::temp_test_dir;

// =============================================================================
// Builder
// =============================================================================

/// Options for an [`ApiHarness`].
#[derive(Default)]
pub struct ApiHarnessBuilder {
    profile_store: Option<Arc<dyn ProfileStore>>,
    default_route: Option<String>,
    resolver_timeout: Option<Duration>,
}

impl ApiHarnessBuilder {
    /// Resolves roles from `store` instead of the harness's account file.
    pub fn profile_store(mut self, store: Arc<dyn ProfileStore>) -> Self {
        self.profile_store = Some(store);
        self
    }

    /// Sends denied requests to `route`.
    pub fn default_route(mut self, route: impl Into<String>) -> Self {
        self.default_route = Some(route.into());
        self
    }

    /// Bounds every role resolution.
    pub fn resolver_timeout(mut self, timeout: Duration) -> Self {
        self.resolver_timeout = Some(timeout);
        self
    }

    /// Builds the harness.
    pub fn build(self) -> ApiHarness {
        let dir = temp_test_dir("shifa-api-");
        let accounts = Arc::new(
            LocalFallbackStore::open(dir.path().join("users.json"))
                .expect("Failed to open account store"),
        );
        let audit = Arc::new(InMemoryAuditLogger::new());
        let jwt = Arc::new(
            JwtManager::new(JwtConfig::new(TEST_JWT_SECRET)).expect("Failed to create JWT manager"),
        );

        let store = self
            .profile_store
            .unwrap_or_else(|| accounts.clone() as Arc<dyn ProfileStore>);
        let mut resolver = SessionRoleResolver::new(store);
        if let Some(timeout) = self.resolver_timeout {
            resolver = resolver.with_timeout(timeout);
        }

        let mut settings = ApiSettings::default();
        if let Some(route) = self.default_route {
            settings = settings.with_default_route(route);
        }

        let state = AppState::builder()
            .settings(settings)
            .jwt_manager(jwt)
            .resolver(resolver)
            .fallback(accounts.clone())
            .chat(Arc::new(ChatRoom::new(MessageSealer::new(generate_key()))))
            .audit_logger(audit.clone())
            .build()
            .expect("Failed to build app state");

        let router = ApiServer::new(state.clone()).router();

        ApiHarness {
            state,
            accounts,
            audit,
            router,
            _dir: dir,
        }
    }
}

// =============================================================================
// ApiHarness
// =============================================================================

/// The full router over throwaway stores.
pub struct ApiHarness {
    /// Application state behind the router.
    pub state: AppState,
    /// The account store behind sign-up and sign-in.
    pub accounts: Arc<LocalFallbackStore>,
    /// Every audit entry the router recorded.
    pub audit: Arc<InMemoryAuditLogger>,
    router: Router,
    _dir: TempDir,
}

impl ApiHarness {
    /// A harness resolving roles from its own account file.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts a customized harness.
    pub fn builder() -> ApiHarnessBuilder {
        ApiHarnessBuilder::default()
    }

    /// Sends one request through the router.
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Router is infallible")
    }

    /// GET `path`, optionally with a bearer token.
    pub async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, HeaderMap, Value) {
        let request = with_token(Request::get(path), token)
            .body(Body::empty())
            .expect("Failed to build request");
        read(self.send(request).await).await
    }

    /// POST a JSON body to `path`, optionally with a bearer token.
    pub async fn post_json(
        &self,
        path: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, HeaderMap, Value) {
        let request = with_token(Request::post(path), token)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("Failed to build request");
        read(self.send(request).await).await
    }

    /// Creates the fixture account for `role` and returns its token.
    ///
    /// Patients sign up through the public endpoint. Staff accounts are
    /// written to the account store directly, the way `shifa users add`
    /// does, and then sign in.
    pub async fn enroll(&self, role: Role) -> String {
        if role == Role::Patient {
            let (status, _, body) = self
                .post_json(
                    "/api/auth/sign-up",
                    None,
                    serde_json::json!({
                        "email": AccountFixtures::email(role),
                        "password": TEST_PASSWORD,
                        "full_name": "Test patient",
                    }),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "sign-up failed: {body}");
            return token_of(&body);
        }

        self.accounts
            .register(AccountFixtures::new_user(role))
            .expect("Failed to create account");
        let (status, _, body) = self
            .post_json(
                "/api/auth/sign-in",
                None,
                serde_json::json!({
                    "email": AccountFixtures::email(role),
                    "password": TEST_PASSWORD,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "sign-in failed: {body}");
        token_of(&body)
    }

    /// A token for an arbitrary session, bypassing sign-in.
    pub fn token_for(&self, session: &Session) -> String {
        self.state
            .jwt()
            .create_session_token(session)
            .expect("Failed to sign token")
    }

    /// Waits until at least `count` audit entries were recorded.
    ///
    /// Entries are written from spawned tasks, so they may trail the
    /// response slightly.
    pub async fn wait_for_audit(&self, count: usize) -> Vec<AuditLog> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while self.audit.len() < count && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.audit.entries()
    }
}

impl Default for ApiHarness {
    fn default() -> Self {
        Self::new()
    }
}

fn token_of(body: &Value) -> String {
    body["token"]
        .as_str()
        .expect("auth response has a token")
        .to_string()
}

fn with_token(builder: http::request::Builder, token: Option<&str>) -> http::request::Builder {
    match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}

async fn read(response: Response) -> (StatusCode, HeaderMap, Value) {
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, headers, body)
}
