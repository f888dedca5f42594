// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! In-memory profile store.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use shifa_core::{ProfileRecord, ProfileStore, StoreResult, UserId};

/// Profile store held in a map. Used for development and tests.
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<UserId, ProfileRecord>>,
}

impl InMemoryProfileStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a profile.
    pub fn insert(&self, profile: ProfileRecord) -> Option<ProfileRecord> {
        self.profiles.write().insert(profile.id.clone(), profile)
    }

    /// Removes a profile.
    pub fn remove(&self, user_id: &UserId) -> Option<ProfileRecord> {
        self.profiles.write().remove(user_id)
    }

    /// Changes the stored role value. Returns `false` if there is no such
    /// profile.
    pub fn set_role(&self, user_id: &UserId, role: impl Into<String>) -> bool {
        match self.profiles.write().get_mut(user_id) {
            Some(profile) => {
                profile.role = role.into();
                true
            }
            None => false,
        }
    }

    /// Number of profiles.
    pub fn len(&self) -> usize {
        self.profiles.read().len()
    }

    /// Returns `true` if empty.
    pub fn is_empty(&self) -> bool {
        self.profiles.read().is_empty()
    }
}

impl FromIterator<ProfileRecord> for InMemoryProfileStore {
    fn from_iter<I: IntoIterator<Item = ProfileRecord>>(iter: I) -> Self {
        let store = Self::new();
        for profile in iter {
            store.insert(profile);
        }
        store
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn fetch_profile(&self, user_id: &UserId) -> StoreResult<Option<ProfileRecord>> {
        Ok(self.profiles.read().get(user_id).cloned())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
