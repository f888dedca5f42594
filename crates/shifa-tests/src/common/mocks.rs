// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Mock Implementations
//!
//! Profile stores with scripted behavior and a navigator that records
//! where guards send the user.
//!
//! All mocks are thread-safe and count their calls, so tests can check
//! that a guard performs exactly one profile read per resolution.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::sync::Semaphore;

use shifa_core::{Navigator, ProfileRecord, ProfileStore, Role, StoreError, StoreResult, UserId};

// =============================================================================
// Scripted Profile Store
// =============================================================================

/// How a [`ScriptedProfileStore`] fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Answers normally.
    None,
    /// Network-level failure; failover may retry elsewhere.
    Unavailable,
    /// The store answered with an error status.
    Backend(u16),
    /// The store answered with an unreadable body.
    Decode,
}

impl FailureMode {
    fn error(self) -> Option<StoreError> {
        match self {
            FailureMode::None => None,
            FailureMode::Unavailable => Some(StoreError::unavailable("connection refused")),
            FailureMode::Backend(status) => Some(StoreError::backend(status, "scripted failure")),
            FailureMode::Decode => Some(StoreError::decode("scripted garbage")),
        }
    }
}

/// A profile store whose contents, latency and failures are set by the test.
#[derive(Debug)]
pub struct ScriptedProfileStore {
    name: &'static str,
    profiles: RwLock<HashMap<UserId, ProfileRecord>>,
    failure: Mutex<FailureMode>,
    latency: Mutex<Duration>,
    calls: AtomicU64,
}

impl ScriptedProfileStore {
    /// Creates an empty store named "scripted".
    pub fn new() -> Self {
        Self::named("scripted")
    }

    /// Creates an empty store with a custom name.
    pub fn named(name: &'static str) -> Self {
        Self {
            name,
            profiles: RwLock::new(HashMap::new()),
            failure: Mutex::new(FailureMode::None),
            latency: Mutex::new(Duration::ZERO),
            calls: AtomicU64::new(0),
        }
    }

    /// Adds an active profile with a raw role value.
    pub fn with_profile(self, user_id: &str, role: &str) -> Self {
        self.insert(ProfileRecord::new(user_id, role));
        self
    }

    /// Starts out failing.
    pub fn failing(self, mode: FailureMode) -> Self {
        self.set_failure(mode);
        self
    }

    /// Inserts or replaces a profile.
    pub fn insert(&self, profile: ProfileRecord) {
        self.profiles.write().insert(profile.id.clone(), profile);
    }

    /// Changes the stored role of `user_id`.
    pub fn set_role(&self, user_id: &str, role: &str) {
        if let Some(profile) = self.profiles.write().get_mut(&UserId::new(user_id)) {
            profile.role = role.to_string();
        }
    }

    /// Changes the failure mode.
    pub fn set_failure(&self, mode: FailureMode) {
        *self.failure.lock() = mode;
    }

    /// Delays every read.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Number of reads so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProfileStore for ScriptedProfileStore {
    async fn fetch_profile(&self, user_id: &UserId) -> StoreResult<Option<ProfileRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let failure = *self.failure.lock();
        if let Some(err) = failure.error() {
            return Err(err);
        }
        Ok(self.profiles.read().get(user_id).cloned())
    }

    fn name(&self) -> &str {
        self.name
    }
}

// =============================================================================
// Gated Profile Store
// =============================================================================

/// A profile store whose reads block until the test opens the gate.
///
/// Lets a test observe the loading state, or unmount a view while its
/// resolution is still in flight.
#[derive(Debug)]
pub struct GatedProfileStore {
    profiles: RwLock<HashMap<UserId, ProfileRecord>>,
    gate: Semaphore,
    started: AtomicU64,
}

impl GatedProfileStore {
    /// Creates a closed store holding one profile.
    pub fn with_profile(user_id: &str, role: Role) -> Self {
        let mut profiles = HashMap::new();
        profiles.insert(UserId::new(user_id), ProfileRecord::new(user_id, role.as_str()));
        Self {
            profiles: RwLock::new(profiles),
            gate: Semaphore::new(0),
            started: AtomicU64::new(0),
        }
    }

    /// Lets all pending and future reads complete.
    pub fn open(&self) {
        self.gate.add_permits(1024);
    }

    /// Number of reads that have started.
    pub fn started(&self) -> u64 {
        self.started.load(Ordering::SeqCst)
    }

    /// Waits until at least one read is blocked on the gate.
    pub async fn wait_until_started(&self) {
        while self.started() == 0 {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl ProfileStore for GatedProfileStore {
    async fn fetch_profile(&self, user_id: &UserId) -> StoreResult<Option<ProfileRecord>> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| StoreError::unavailable("gate closed"))?;
        permit.forget();
        Ok(self.profiles.read().get(user_id).cloned())
    }

    fn name(&self) -> &str {
        "gated"
    }
}

// =============================================================================
// Recording Navigator
// =============================================================================

/// A navigator that remembers every destination.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    destinations: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    /// Creates a shared navigator.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Destinations in the order they were requested.
    pub fn destinations(&self) -> Vec<String> {
        self.destinations.lock().clone()
    }

    /// Number of navigations.
    pub fn count(&self) -> usize {
        self.destinations.lock().len()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, destination: &str) {
        self.destinations.lock().push(destination.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_store_counts_calls() {
        let store = ScriptedProfileStore::new().with_profile("u-1", "admin");
        let profile = store.fetch_profile(&UserId::new("u-1")).await.unwrap();
        assert_eq!(profile.unwrap().role, "admin");
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn test_scripted_store_failure_modes() {
        let store = ScriptedProfileStore::new().failing(FailureMode::Unavailable);
        let err = store.fetch_profile(&UserId::new("u-1")).await.unwrap_err();
        assert!(err.is_unreachable());

        store.set_failure(FailureMode::Backend(500));
        let err = store.fetch_profile(&UserId::new("u-1")).await.unwrap_err();
        assert!(!err.is_unreachable());
    }

    #[test]
    fn test_recording_navigator() {
        let navigator = RecordingNavigator::new();
        navigator.navigate("/");
        assert_eq!(navigator.destinations(), vec!["/".to_string()]);
    }
}
