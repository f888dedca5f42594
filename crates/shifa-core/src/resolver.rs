// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session role resolution.
//!
//! The resolver turns a session into a [`SessionIdentity`] by reading the
//! user's profile from a [`ProfileStore`]. It never fails: every problem on
//! the way resolves to the unknown role, which no permission is granted to.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::identity::{Session, SessionIdentity, UserId};
use crate::role::Role;

// =============================================================================
// ProfileStore
// =============================================================================

/// A user profile as stored by the authentication backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    /// User identifier.
    pub id: UserId,
    /// Raw role value. May be anything; only recognized values grant access.
    pub role: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Deactivated profiles resolve to the unknown role.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl ProfileRecord {
    /// Creates an active profile.
    pub fn new(id: impl Into<UserId>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
            full_name: None,
            is_active: true,
        }
    }

    /// Sets the display name.
    pub fn with_full_name(mut self, name: impl Into<String>) -> Self {
        self.full_name = Some(name.into());
        self
    }

    /// Sets the active flag.
    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }
}

/// Read access to user profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fetches the profile of `user_id`. `Ok(None)` means no such profile.
    async fn fetch_profile(&self, user_id: &UserId) -> StoreResult<Option<ProfileRecord>>;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "profile-store"
    }
}

#[async_trait]
impl<T: ProfileStore + ?Sized> ProfileStore for Arc<T> {
    async fn fetch_profile(&self, user_id: &UserId) -> StoreResult<Option<ProfileRecord>> {
        (**self).fetch_profile(user_id).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

// =============================================================================
// SessionRoleResolver
// =============================================================================

/// Resolves the current role of a session.
///
/// Each call performs exactly one profile read. Nothing is cached, so a role
/// change in the store is observed on the next resolution.
#[derive(Clone)]
pub struct SessionRoleResolver {
    store: Arc<dyn ProfileStore>,
    timeout: Option<Duration>,
}

impl SessionRoleResolver {
    /// Creates a resolver over `store`.
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self {
            store,
            timeout: None,
        }
    }

    /// Bounds the profile read. A read exceeding it resolves to unknown.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the configured timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Name of the underlying store.
    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    /// Resolves the role of `session`.
    pub async fn resolve(&self, session: Option<&Session>) -> SessionIdentity {
        let Some(session) = session else {
            debug!("No active session, role is unknown");
            return SessionIdentity::unknown();
        };
        let user_id = &session.user_id;

        let record = match self.fetch(user_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                warn!(
                    user_id = %user_id,
                    store = self.store.name(),
                    "Profile not found, role is unknown"
                );
                return SessionIdentity::unknown_for(user_id.clone());
            }
            Err(e) => {
                warn!(
                    user_id = %user_id,
                    store = self.store.name(),
                    error = %e,
                    "Role resolution failed, role is unknown"
                );
                return SessionIdentity::unknown_for(user_id.clone());
            }
        };

        if !record.is_active {
            warn!(user_id = %user_id, "Profile is deactivated, role is unknown");
            return SessionIdentity::unknown_for(user_id.clone());
        }

        match Role::parse(&record.role) {
            Some(role) => {
                debug!(user_id = %user_id, role = %role, "Role resolved");
                SessionIdentity::known(user_id.clone(), role)
            }
            None => {
                warn!(
                    user_id = %user_id,
                    stored_role = %record.role,
                    "Unrecognized role value, role is unknown"
                );
                SessionIdentity::unknown_for(user_id.clone())
            }
        }
    }

    async fn fetch(&self, user_id: &UserId) -> StoreResult<Option<ProfileRecord>> {
        match self.timeout {
            None => self.store.fetch_profile(user_id).await,
            Some(limit) => {
                let started = Instant::now();
                tokio::time::timeout(limit, self.store.fetch_profile(user_id))
                    .await
                    .unwrap_or_else(|_| {
                        Err(StoreError::Timeout {
                            elapsed_ms: started.elapsed().as_millis() as u64,
                        })
                    })
            }
        }
    }
}

impl std::fmt::Debug for SessionRoleResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRoleResolver")
            .field("store", &self.store.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::Permission;
    use crate::registry::RoleRegistry;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MapStore {
        profiles: HashMap<String, ProfileRecord>,
        reads: AtomicUsize,
    }

    impl MapStore {
        fn with(records: Vec<ProfileRecord>) -> Self {
            Self {
                profiles: records
                    .into_iter()
                    .map(|r| (r.id.as_str().to_string(), r))
                    .collect(),
                reads: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ProfileStore for MapStore {
        async fn fetch_profile(&self, user_id: &UserId) -> StoreResult<Option<ProfileRecord>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.profiles.get(user_id.as_str()).cloned())
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl ProfileStore for BrokenStore {
        async fn fetch_profile(&self, _user_id: &UserId) -> StoreResult<Option<ProfileRecord>> {
            Err(StoreError::unavailable("connection refused"))
        }
    }

    struct SlowStore;

    #[async_trait]
    impl ProfileStore for SlowStore {
        async fn fetch_profile(&self, user_id: &UserId) -> StoreResult<Option<ProfileRecord>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Some(ProfileRecord::new(user_id.clone(), "admin")))
        }
    }

    #[tokio::test]
    async fn test_resolve_known_role() {
        let store = Arc::new(MapStore::with(vec![ProfileRecord::new("u-1", "therapist")]));
        let resolver = SessionRoleResolver::new(store.clone());

        let identity = resolver.resolve(Some(&Session::new("u-1"))).await;
        assert_eq!(identity.role(), Some(Role::Therapist));
        assert_eq!(store.reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resolve_reads_every_time() {
        let store = Arc::new(MapStore::with(vec![ProfileRecord::new("u-1", "patient")]));
        let resolver = SessionRoleResolver::new(store.clone());
        let session = Session::new("u-1");

        resolver.resolve(Some(&session)).await;
        resolver.resolve(Some(&session)).await;
        assert_eq!(store.reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_resolve_without_session() {
        let store = Arc::new(MapStore::with(vec![]));
        let resolver = SessionRoleResolver::new(store.clone());

        let identity = resolver.resolve(None).await;
        assert!(!identity.is_known());
        assert!(identity.user_id.is_none());
        assert_eq!(store.reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resolve_failure_is_unknown() {
        let resolver = SessionRoleResolver::new(Arc::new(BrokenStore));
        let registry = RoleRegistry::new();

        let identity = resolver.resolve(Some(&Session::new("u-1"))).await;
        assert!(!identity.is_known());
        for p in Permission::all() {
            assert!(!identity.can(&registry, *p));
        }
    }

    #[tokio::test]
    async fn test_resolve_missing_unrecognized_and_inactive() {
        let store = Arc::new(MapStore::with(vec![
            ProfileRecord::new("odd", "doctor"),
            ProfileRecord::new("gone", "admin").with_active(false),
        ]));
        let resolver = SessionRoleResolver::new(store);

        for user in ["missing", "odd", "gone"] {
            let identity = resolver.resolve(Some(&Session::new(user))).await;
            assert_eq!(identity.role(), None, "{user} should be unknown");
            assert_eq!(identity.user_id.as_ref().map(|u| u.as_str()), Some(user));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_timeout_is_unknown() {
        let resolver =
            SessionRoleResolver::new(Arc::new(SlowStore)).with_timeout(Duration::from_millis(50));

        let identity = resolver.resolve(Some(&Session::new("u-1"))).await;
        assert!(!identity.is_known());
    }

    #[test]
    fn test_profile_record_defaults() {
        let record: ProfileRecord =
            serde_json::from_str(r#"{"id":"u-9","role":"supervisor"}"#).unwrap();
        assert!(record.is_active);
        assert!(record.full_name.is_none());
    }
}
