// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Primary/secondary profile store.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use shifa_core::{ProfileRecord, ProfileStore, StoreResult, UserId};

/// Reads from `primary` and falls back to `secondary` only when the primary
/// cannot be reached.
///
/// A primary that answers "no such profile" is authoritative; the secondary
/// is not consulted. Backend and decode errors are returned as-is.
pub struct FailoverProfileStore {
    primary: Arc<dyn ProfileStore>,
    secondary: Arc<dyn ProfileStore>,
}

impl FailoverProfileStore {
    /// Creates a failover pair.
    pub fn new(primary: Arc<dyn ProfileStore>, secondary: Arc<dyn ProfileStore>) -> Self {
        Self { primary, secondary }
    }
}

impl std::fmt::Debug for FailoverProfileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailoverProfileStore")
            .field("primary", &self.primary.name())
            .field("secondary", &self.secondary.name())
            .finish()
    }
}

#[async_trait]
impl ProfileStore for FailoverProfileStore {
    async fn fetch_profile(&self, user_id: &UserId) -> StoreResult<Option<ProfileRecord>> {
        match self.primary.fetch_profile(user_id).await {
            Err(e) if e.is_unreachable() => {
                warn!(
                    store = self.primary.name(),
                    fallback = self.secondary.name(),
                    error = %e,
                    "Primary profile store unreachable, using fallback"
                );
                self.secondary.fetch_profile(user_id).await
            }
            other => other,
        }
    }

    fn name(&self) -> &str {
        "failover"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryProfileStore;
    use shifa_core::StoreError;

    struct Failing(fn() -> StoreError);

    #[async_trait]
    impl ProfileStore for Failing {
        async fn fetch_profile(&self, _user_id: &UserId) -> StoreResult<Option<ProfileRecord>> {
            Err((self.0)())
        }
    }

    fn secondary() -> Arc<dyn ProfileStore> {
        let store = InMemoryProfileStore::new();
        store.insert(ProfileRecord::new("u-1", "therapist"));
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_unreachable_primary_uses_secondary() {
        let store = FailoverProfileStore::new(
            Arc::new(Failing(|| StoreError::unavailable("down"))),
            secondary(),
        );
        let profile = store.fetch_profile(&UserId::new("u-1")).await.unwrap();
        assert_eq!(profile.map(|p| p.role), Some("therapist".to_string()));

        let store = FailoverProfileStore::new(
            Arc::new(Failing(|| StoreError::Timeout { elapsed_ms: 5000 })),
            secondary(),
        );
        assert!(store.fetch_profile(&UserId::new("u-1")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_backend_error_is_returned() {
        let store = FailoverProfileStore::new(
            Arc::new(Failing(|| StoreError::backend(401, "bad key"))),
            secondary(),
        );
        assert!(matches!(
            store.fetch_profile(&UserId::new("u-1")).await,
            Err(StoreError::Backend { status: 401, .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_profile_is_final() {
        let store = FailoverProfileStore::new(Arc::new(InMemoryProfileStore::new()), secondary());
        assert!(store.fetch_profile(&UserId::new("u-1")).await.unwrap().is_none());
    }
}
