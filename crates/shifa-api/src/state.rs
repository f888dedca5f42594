// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Application state shared across handlers.

use std::sync::Arc;

use shifa_core::{
    AuditLogger, NavigationFilter, Permission, RoleRegistry, RouteGuard, SessionRoleResolver,
    audit::NoOpAuditLogger,
};
use shifa_store::LocalFallbackStore;

use crate::auth::JwtManager;
use crate::chat::ChatRoom;
use crate::config::ApiSettings;
use crate::error::{ApiError, ApiResult};

// =============================================================================
// AppState
// =============================================================================

/// State passed to every handler through axum's state extraction.
#[derive(Clone)]
pub struct AppState {
    /// Server settings.
    pub settings: Arc<ApiSettings>,
    /// Session token manager.
    pub jwt_manager: Arc<JwtManager>,
    /// Grant table.
    pub registry: RoleRegistry,
    /// Role resolver used by guards and navigation.
    pub resolver: SessionRoleResolver,
    /// Navigation entries.
    pub navigation: NavigationFilter,
    /// Local account store, when enabled.
    pub fallback: Option<Arc<LocalFallbackStore>>,
    /// Chat room, when a sealing key is configured.
    pub chat: Option<Arc<ChatRoom>>,
    /// Audit logger.
    pub audit_logger: Arc<dyn AuditLogger>,
}

impl AppState {
    /// Creates a new app state builder.
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::new()
    }

    /// Returns the JWT manager.
    pub fn jwt(&self) -> &JwtManager {
        &self.jwt_manager
    }

    /// Returns the audit logger.
    pub fn audit(&self) -> &Arc<dyn AuditLogger> {
        &self.audit_logger
    }

    /// Returns the local account store or 503 when it is disabled.
    pub fn accounts(&self) -> ApiResult<&Arc<LocalFallbackStore>> {
        self.fallback
            .as_ref()
            .ok_or_else(|| ApiError::service_unavailable("Local accounts are disabled"))
    }

    /// Returns the chat room or 503 when chat is not configured.
    pub fn chat_room(&self) -> ApiResult<&Arc<ChatRoom>> {
        self.chat
            .as_ref()
            .ok_or_else(|| ApiError::service_unavailable("Chat is not configured"))
    }

    /// A guard for `permission` redirecting to the configured default route.
    pub fn guard(&self, permission: Permission) -> RouteGuard {
        RouteGuard::new(permission)
            .with_registry(self.registry.clone())
            .with_redirect(self.settings.default_route.clone())
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("settings", &self.settings)
            .field("resolver", &self.resolver)
            .field("fallback", &self.fallback.is_some())
            .field("chat", &self.chat.is_some())
            .field("audit_logger", &self.audit_logger.name())
            .finish()
    }
}

// =============================================================================
// AppStateBuilder
// =============================================================================

/// Builder for [`AppState`].
#[derive(Default)]
pub struct AppStateBuilder {
    settings: Option<ApiSettings>,
    jwt_manager: Option<Arc<JwtManager>>,
    registry: Option<RoleRegistry>,
    resolver: Option<SessionRoleResolver>,
    navigation: Option<NavigationFilter>,
    fallback: Option<Arc<LocalFallbackStore>>,
    chat: Option<Arc<ChatRoom>>,
    audit_logger: Option<Arc<dyn AuditLogger>>,
}

impl AppStateBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the server settings.
    pub fn settings(mut self, settings: ApiSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Sets the JWT manager.
    pub fn jwt_manager(mut self, manager: Arc<JwtManager>) -> Self {
        self.jwt_manager = Some(manager);
        self
    }

    /// Sets the grant table.
    pub fn registry(mut self, registry: RoleRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets the role resolver.
    pub fn resolver(mut self, resolver: SessionRoleResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Sets the navigation entries.
    pub fn navigation(mut self, navigation: NavigationFilter) -> Self {
        self.navigation = Some(navigation);
        self
    }

    /// Sets the local account store.
    pub fn fallback(mut self, store: Arc<LocalFallbackStore>) -> Self {
        self.fallback = Some(store);
        self
    }

    /// Sets the chat room.
    pub fn chat(mut self, room: Arc<ChatRoom>) -> Self {
        self.chat = Some(room);
        self
    }

    /// Sets the audit logger.
    pub fn audit_logger(mut self, logger: Arc<dyn AuditLogger>) -> Self {
        self.audit_logger = Some(logger);
        self
    }

    /// Builds the state.
    ///
    /// The JWT manager is required. Without an explicit resolver, roles are
    /// resolved from the local account store; with neither, the build fails.
    pub fn build(self) -> ApiResult<AppState> {
        let jwt_manager = self
            .jwt_manager
            .ok_or_else(|| ApiError::internal("JWT manager is not configured"))?;

        let resolver = match (self.resolver, &self.fallback) {
            (Some(resolver), _) => resolver,
            (None, Some(store)) => SessionRoleResolver::new(store.clone()),
            (None, None) => {
                return Err(ApiError::internal(
                    "No profile store configured for role resolution",
                ));
            }
        };

        let registry = self.registry.unwrap_or_default();
        let navigation = self
            .navigation
            .unwrap_or_else(|| NavigationFilter::standard(&registry));

        Ok(AppState {
            settings: Arc::new(self.settings.unwrap_or_default()),
            jwt_manager,
            registry,
            resolver,
            navigation,
            fallback: self.fallback,
            chat: self.chat,
            audit_logger: self
                .audit_logger
                .unwrap_or_else(|| Arc::new(NoOpAuditLogger)),
        })
    }
}

// =============================================================================
// FromRef implementations for extracting parts of state
// =============================================================================

impl axum::extract::FromRef<AppState> for Arc<JwtManager> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt_manager.clone()
    }
}

impl axum::extract::FromRef<AppState> for RoleRegistry {
    fn from_ref(state: &AppState) -> Self {
        state.registry.clone()
    }
}
