// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Service runtime orchestration.
//!
//! Turns a [`ShifaConfig`] into a running service:
//!
//! - Session token manager (random secret when none is configured)
//! - Profile stores: hosted, local fallback, or hosted with local failover
//! - Role resolver with the configured read timeout
//! - Audit sink and the sealed chat room
//! - HTTP server with graceful shutdown

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use shifa_api::{ApiServer, ApiSettings, AppState, ChatRoom, JwtConfig, JwtManager};
use shifa_config::encryption::{MASTER_KEY_ENV, decode_key};
use shifa_config::schema::AuditSink;
use shifa_config::{ConfigLoader, MessageSealer, ShifaConfig, generate_key_base64};
use shifa_core::audit::{InMemoryAuditLogger, NoOpAuditLogger, TracingAuditLogger};
use shifa_core::{AuditLogger, ProfileStore, SessionRoleResolver};
use shifa_store::{CancelHandle, FailoverProfileStore, HostedProfileStore, LocalFallbackStore};

use crate::error::{BinError, BinResult};
use crate::shutdown::ShutdownCoordinator;

/// Entries kept by the in-memory audit sink.
const MEMORY_AUDIT_CAPACITY: usize = 10_000;

// =============================================================================
// Configuration Loading
// =============================================================================

/// A loader that decrypts `ENC:` secrets with the master key from
/// `SHIFA_MASTER_KEY`, when set.
pub fn config_loader() -> BinResult<ConfigLoader> {
    let loader = ConfigLoader::new();
    match std::env::var(MASTER_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => {
            let key = decode_key(key.trim())
                .map_err(|e| BinError::config(format!("{MASTER_KEY_ENV}: {e}")))?;
            Ok(loader.with_encryption_key(key))
        }
        _ => Ok(loader),
    }
}

/// Loads and validates the configuration at `path`.
pub fn load_configuration(path: &Path) -> BinResult<ShifaConfig> {
    config_loader()?.load(path).map_err(|e| {
        BinError::from(e).with_context(format!("Failed to load {}", path.display()))
    })
}

// =============================================================================
// ServiceRuntime
// =============================================================================

/// The running service.
pub struct ServiceRuntime {
    config: Arc<ShifaConfig>,
    shutdown: ShutdownCoordinator,
}

impl ServiceRuntime {
    /// Creates a runtime for `config`.
    pub fn new(config: ShifaConfig) -> Self {
        Self {
            config: Arc::new(config),
            shutdown: ShutdownCoordinator::new(),
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &ShifaConfig {
        &self.config
    }

    /// A handle that stops the service when shutdown is initiated on it.
    pub fn shutdown_handle(&self) -> ShutdownCoordinator {
        self.shutdown.clone()
    }

    /// Assembles the shared HTTP state from configuration.
    pub fn build_state(&self) -> BinResult<AppState> {
        let config = &self.config;

        let jwt_manager = Arc::new(self.create_jwt_manager()?);
        let fallback = self.create_fallback_store()?;
        let store = self.create_profile_store(fallback.clone())?;

        let mut resolver = SessionRoleResolver::new(store);
        if let Some(timeout) = config.resolver.timeout {
            resolver = resolver.with_timeout(timeout);
        }
        info!(store = resolver.store_name(), "Role resolver ready");

        let mut builder = AppState::builder()
            .settings(ApiSettings::from_config(config))
            .jwt_manager(jwt_manager)
            .resolver(resolver)
            .audit_logger(self.create_audit_logger());

        if let Some(store) = fallback {
            builder = builder.fallback(store);
        }
        if let Some(room) = self.create_chat_room()? {
            builder = builder.chat(Arc::new(room));
        }

        Ok(builder.build()?)
    }

    /// Binds the configured address and serves until shutdown.
    pub async fn run(self) -> BinResult<()> {
        let addr = self.config.server.socket_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| BinError::init(format!("Failed to bind {addr}: {e}")))?;
        self.serve(listener).await
    }

    /// Serves on `listener` until an OS signal or
    /// [`ShutdownCoordinator::initiate_shutdown`].
    pub async fn serve(self, listener: TcpListener) -> BinResult<()> {
        info!("Starting Shifa Care access service v{}", shifa_core::VERSION);

        let state = self.build_state()?;
        let listener_handle = state.fallback.as_ref().map(|store| watch_auth_state(store));

        let server = ApiServer::new(state);
        let serve = server.serve(listener, self.shutdown.signal());
        tokio::pin!(serve);

        let result = tokio::select! {
            result = &mut serve => result.map_err(BinError::from),
            signal = self.shutdown.wait_for_shutdown() => match signal {
                Ok(()) => {
                    info!("Draining in-flight requests");
                    serve.await.map_err(BinError::from)
                }
                Err(e) => Err(e),
            },
        };

        if let Some(handle) = listener_handle {
            handle.cancel();
        }
        info!("Shifa Care access service stopped");
        result
    }

    fn create_jwt_manager(&self) -> BinResult<JwtManager> {
        let settings = &self.config.security.jwt;
        let secret = match &settings.secret {
            Some(secret) => secret.expose().to_string(),
            None => {
                warn!("No security.jwt.secret configured; using a random secret, sessions end on restart");
                generate_key_base64()
            }
        };
        Ok(JwtManager::new(JwtConfig::from_settings(settings, secret))?)
    }

    fn create_fallback_store(&self) -> BinResult<Option<Arc<LocalFallbackStore>>> {
        let fallback = &self.config.fallback;
        if !fallback.enabled {
            info!("Local fallback store disabled");
            return Ok(None);
        }

        let store = LocalFallbackStore::open(&fallback.path)?
            .with_min_password_length(fallback.min_password_length);
        info!(
            path = %fallback.path.display(),
            accounts = store.len(),
            "Local fallback store opened"
        );

        for drift in store.legacy_drift() {
            warn!(
                email = %drift.email,
                role = %drift.role,
                permissions = ?drift.permissions,
                "Stored permission map disagrees with the grant table; the grant table wins"
            );
        }
        Ok(Some(Arc::new(store)))
    }

    fn create_profile_store(
        &self,
        fallback: Option<Arc<LocalFallbackStore>>,
    ) -> BinResult<Arc<dyn ProfileStore>> {
        let hosted = self.create_hosted_store()?;
        let fallback = fallback.map(|s| s as Arc<dyn ProfileStore>);

        match (hosted, fallback) {
            (Some(hosted), Some(local)) => {
                info!("Profiles from the hosted store, local store on outage");
                Ok(Arc::new(FailoverProfileStore::new(hosted, local)))
            }
            (Some(hosted), None) => Ok(hosted),
            (None, Some(local)) => Ok(local),
            (None, None) => Err(BinError::config(
                "at least one of backend or fallback must be enabled",
            )),
        }
    }

    fn create_hosted_store(&self) -> BinResult<Option<Arc<dyn ProfileStore>>> {
        let backend = &self.config.backend;
        if !backend.enabled {
            return Ok(None);
        }
        let url = backend
            .url
            .as_deref()
            .ok_or_else(|| BinError::config("backend.url is required"))?;

        let mut store = HostedProfileStore::new(url, backend.timeout)?
            .with_table(backend.profiles_table.clone());
        if let Some(key) = &backend.api_key {
            store = store.with_api_key(key.expose());
        }
        info!(endpoint = %store.endpoint(), "Hosted profile store configured");
        Ok(Some(Arc::new(store)))
    }

    fn create_audit_logger(&self) -> Arc<dyn AuditLogger> {
        let audit = &self.config.audit;
        if !audit.enabled {
            info!("Audit logging disabled");
            return Arc::new(NoOpAuditLogger);
        }
        match audit.sink {
            AuditSink::Tracing => Arc::new(TracingAuditLogger),
            AuditSink::Memory => Arc::new(InMemoryAuditLogger::with_capacity(MEMORY_AUDIT_CAPACITY)),
        }
    }

    fn create_chat_room(&self) -> BinResult<Option<ChatRoom>> {
        match &self.config.chat.sealing_key {
            Some(key) => Ok(Some(ChatRoom::new(MessageSealer::from_secret(key)?))),
            None => {
                info!("No chat.sealing_key configured; chat disabled");
                Ok(None)
            }
        }
    }
}

/// Logs sign-in and sign-out transitions of the local session slot.
fn watch_auth_state(store: &LocalFallbackStore) -> CancelHandle {
    let (handle, _task) = store.subscribe().spawn_listener(|session| match session {
        Some(session) => info!(user_id = %session.user_id, "Local session started"),
        None => info!("Local session ended"),
    });
    handle
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for [`ServiceRuntime`].
#[derive(Default)]
pub struct RuntimeBuilder {
    config_path: Option<PathBuf>,
    config: Option<ShifaConfig>,
    host: Option<IpAddr>,
    port: Option<u16>,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration file path.
    pub fn config_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the configuration directly.
    pub fn config(mut self, config: ShifaConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Overrides the bind address.
    pub fn host(mut self, host: Option<IpAddr>) -> Self {
        self.host = host;
        self
    }

    /// Overrides the port.
    pub fn port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    /// Builds the runtime.
    pub fn build(self) -> BinResult<ServiceRuntime> {
        let mut config = match self.config {
            Some(cfg) => cfg,
            None => {
                let path = self
                    .config_path
                    .ok_or_else(|| BinError::config("No configuration provided"))?;
                load_configuration(&path)?
            }
        };

        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }

        Ok(ServiceRuntime::new(config))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use shifa_config::SecretValue;
    use tempfile::TempDir;

    fn local_config(dir: &TempDir) -> ShifaConfig {
        let mut config = ShifaConfig::default();
        config.fallback.path = dir.path().join("users.json");
        config
    }

    #[test]
    fn test_runtime_builder_requires_config() {
        assert!(RuntimeBuilder::new().build().is_err());
    }

    #[test]
    fn test_runtime_builder_overrides() {
        let runtime = RuntimeBuilder::new()
            .config(ShifaConfig::default())
            .host(Some("127.0.0.1".parse().unwrap()))
            .port(Some(9191))
            .build()
            .unwrap();
        assert_eq!(runtime.config().server.port, 9191);
        assert_eq!(
            runtime.config().server.host,
            "127.0.0.1".parse::<IpAddr>().unwrap()
        );
    }

    #[test]
    fn test_build_state_local_only() {
        let dir = TempDir::new().unwrap();
        let runtime = ServiceRuntime::new(local_config(&dir));
        let state = runtime.build_state().unwrap();

        assert!(state.fallback.is_some());
        assert!(state.chat.is_none());
        assert_eq!(state.resolver.store_name(), "fallback");
    }

    #[test]
    fn test_build_state_with_backend_uses_failover() {
        let dir = TempDir::new().unwrap();
        let mut config = local_config(&dir);
        config.backend.enabled = true;
        config.backend.url = Some("http://127.0.0.1:9".into());

        let state = ServiceRuntime::new(config).build_state().unwrap();
        assert_eq!(state.resolver.store_name(), "failover");
    }

    #[test]
    fn test_build_state_with_chat_key() {
        let dir = TempDir::new().unwrap();
        let mut config = local_config(&dir);
        config.chat.sealing_key = Some(SecretValue::new(generate_key_base64()));

        let state = ServiceRuntime::new(config).build_state().unwrap();
        assert!(state.chat.is_some());
    }

    #[test]
    fn test_build_state_rejects_bad_chat_key() {
        let dir = TempDir::new().unwrap();
        let mut config = local_config(&dir);
        config.chat.sealing_key = Some(SecretValue::new("not-a-key"));

        assert!(ServiceRuntime::new(config).build_state().is_err());
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let dir = TempDir::new().unwrap();
        let runtime = ServiceRuntime::new(local_config(&dir));
        let shutdown = runtime.shutdown_handle();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let task = tokio::spawn(runtime.serve(listener));

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.initiate_shutdown();

        let result = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("service should stop")
            .unwrap();
        assert!(result.is_ok());
    }
}
