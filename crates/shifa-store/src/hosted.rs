// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Hosted profile store.
//!
//! Reads profiles from a PostgREST-style endpoint:
//!
//! ```text
//! GET {base}/rest/v1/{table}?id=eq.{id}&select=id,role,full_name,is_active
//! apikey: {key}
//! Authorization: Bearer {key}
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use shifa_core::{ProfileRecord, ProfileStore, StoreError, StoreResult, UserId};

/// Profiles table used when none is configured.
pub const DEFAULT_PROFILES_TABLE: &str = "profiles";

const SELECT_COLUMNS: &str = "id,role,full_name,is_active";

/// Profile store backed by the hosted database's REST interface.
#[derive(Debug, Clone)]
pub struct HostedProfileStore {
    client: reqwest::Client,
    base_url: String,
    table: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HostedProfileStore {
    /// Creates a store for `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> StoreResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| StoreError::unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            table: DEFAULT_PROFILES_TABLE.to_string(),
            api_key: None,
            timeout,
        })
    }

    /// Sets the API key sent as `apikey` and bearer token.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the profiles table.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Endpoint queried for profiles.
    pub fn endpoint(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn map_request_error(&self, err: reqwest::Error) -> StoreError {
        if err.is_timeout() {
            StoreError::Timeout {
                elapsed_ms: self.timeout.as_millis() as u64,
            }
        } else if err.is_decode() {
            StoreError::decode(err.to_string())
        } else {
            StoreError::unavailable(format!("HTTP request failed: {err}"))
        }
    }
}

#[async_trait]
impl ProfileStore for HostedProfileStore {
    async fn fetch_profile(&self, user_id: &UserId) -> StoreResult<Option<ProfileRecord>> {
        let filter = format!("eq.{user_id}");
        let mut request = self
            .client
            .get(self.endpoint())
            .query(&[("id", filter.as_str()), ("select", SELECT_COLUMNS)]);
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key).bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::BAD_GATEWAY
                | StatusCode::SERVICE_UNAVAILABLE
                | StatusCode::GATEWAY_TIMEOUT => {
                    StoreError::unavailable(format!("upstream returned {status}"))
                }
                _ => StoreError::backend(status.as_u16(), body),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.map_request_error(e))?;
        let mut rows: Vec<ProfileRecord> = serde_json::from_slice(&bytes)?;

        debug!(user_id = %user_id, rows = rows.len(), "Fetched profile");
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    fn name(&self) -> &str {
        "hosted"
    }
}
