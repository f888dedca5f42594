// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Audit trail for authentication and access decisions.
//!
//! Loggers are pluggable through the [`AuditLogger`] trait:
//!
//! - [`NoOpAuditLogger`]: discards everything
//! - [`InMemoryAuditLogger`]: keeps entries in memory and supports queries
//! - [`TracingAuditLogger`]: emits entries as `tracing` events on the
//!   `audit` target

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::role::Role;

// =============================================================================
// Errors
// =============================================================================

/// Audit logging failure.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The entry could not be written.
    #[error("Failed to write audit log: {message}")]
    WriteFailed {
        /// Error message.
        message: String,
    },

    /// The logger cannot answer queries.
    #[error("Query not supported by this logger: {logger}")]
    QueryNotSupported {
        /// Logger name.
        logger: String,
    },
}

/// Result type for audit operations.
pub type AuditResult<T> = Result<T, AuditError>;

// =============================================================================
// Entry Types
// =============================================================================

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Successful sign-in.
    SignIn,
    /// Rejected sign-in.
    SignInFailed,
    /// New account registered.
    SignUp,
    /// Session ended.
    SignOut,
    /// A guarded view was rendered.
    AccessGranted,
    /// A guarded view redirected.
    AccessDenied,
    /// Account deactivated.
    UserDeactivated,
}

impl AuditAction {
    /// Snake case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::SignIn => "sign_in",
            AuditAction::SignInFailed => "sign_in_failed",
            AuditAction::SignUp => "sign_up",
            AuditAction::SignOut => "sign_out",
            AuditAction::AccessGranted => "access_granted",
            AuditAction::AccessDenied => "access_denied",
            AuditAction::UserDeactivated => "user_deactivated",
        }
    }

    /// Returns `true` for security-relevant failures.
    pub fn is_failure(&self) -> bool {
        matches!(self, AuditAction::SignInFailed | AuditAction::AccessDenied)
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLog {
    /// Entry identifier.
    pub id: Uuid,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub action: AuditAction,
    /// Acting user, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Role at the time, if resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// Route or account the action concerned.
    pub resource: String,
    /// Free-form details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Client address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
}

impl AuditLog {
    /// Creates an entry for `action` on `resource`.
    pub fn new(action: AuditAction, resource: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            timestamp: Utc::now(),
            action,
            user_id: None,
            role: None,
            resource: resource.into(),
            details: None,
            client_ip: None,
        }
    }

    /// Sets the user.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Sets the role.
    pub fn with_role(mut self, role: Option<Role>) -> Self {
        self.role = role;
        self
    }

    /// Sets free-form details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Sets the client address.
    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = Some(ip.into());
        self
    }

    /// Entry for a guard decision.
    pub fn access(
        granted: bool,
        route: impl Into<String>,
        user_id: Option<&str>,
        role: Option<Role>,
    ) -> Self {
        let action = if granted {
            AuditAction::AccessGranted
        } else {
            AuditAction::AccessDenied
        };
        let mut entry = Self::new(action, route).with_role(role);
        entry.user_id = user_id.map(str::to_string);
        entry
    }
}

/// Query filter for loggers that keep entries.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    /// Only this action.
    pub action: Option<AuditAction>,
    /// Only this user.
    pub user_id: Option<String>,
    /// At most this many entries, newest last.
    pub limit: Option<usize>,
}

impl AuditFilter {
    /// Matches everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to `action`.
    pub fn action(mut self, action: AuditAction) -> Self {
        self.action = Some(action);
        self
    }

    /// Restricts to `user_id`.
    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Caps the result size.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn matches(&self, entry: &AuditLog) -> bool {
        self.action.is_none_or(|a| a == entry.action)
            && self
                .user_id
                .as_deref()
                .is_none_or(|u| entry.user_id.as_deref() == Some(u))
    }
}

// =============================================================================
// AuditLogger
// =============================================================================

/// Sink for audit entries.
#[async_trait]
pub trait AuditLogger: Send + Sync {
    /// Records an entry.
    async fn log(&self, entry: AuditLog) -> AuditResult<()>;

    /// Returns entries matching `filter`.
    async fn query(&self, filter: AuditFilter) -> AuditResult<Vec<AuditLog>> {
        let _ = filter;
        Err(AuditError::QueryNotSupported {
            logger: self.name().to_string(),
        })
    }

    /// Flushes buffered entries.
    async fn flush(&self) -> AuditResult<()> {
        Ok(())
    }

    /// Logger name.
    fn name(&self) -> &str {
        "audit_logger"
    }
}

/// Discards all entries.
#[derive(Debug, Default, Clone)]
pub struct NoOpAuditLogger;

#[async_trait]
impl AuditLogger for NoOpAuditLogger {
    async fn log(&self, _entry: AuditLog) -> AuditResult<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "noop"
    }
}

/// Emits entries as structured `tracing` events.
#[derive(Debug, Default, Clone)]
pub struct TracingAuditLogger;

#[async_trait]
impl AuditLogger for TracingAuditLogger {
    async fn log(&self, entry: AuditLog) -> AuditResult<()> {
        let role = entry.role.map(|r| r.as_str()).unwrap_or("unknown");
        let user = entry.user_id.as_deref().unwrap_or("-");
        if entry.action.is_failure() {
            tracing::warn!(
                target: "audit",
                id = %entry.id,
                action = %entry.action,
                user_id = user,
                role,
                resource = %entry.resource,
                details = entry.details.as_deref().unwrap_or(""),
                "Audit event"
            );
        } else {
            tracing::info!(
                target: "audit",
                id = %entry.id,
                action = %entry.action,
                user_id = user,
                role,
                resource = %entry.resource,
                details = entry.details.as_deref().unwrap_or(""),
                "Audit event"
            );
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "tracing"
    }
}

/// Keeps entries in memory, oldest first.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuditLogger {
    logs: Arc<RwLock<Vec<AuditLog>>>,
    max_entries: usize,
}

impl InMemoryAuditLogger {
    /// Creates an unbounded logger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a logger that keeps only the newest `max_entries`.
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            logs: Arc::default(),
            max_entries,
        }
    }

    /// Snapshot of all entries.
    pub fn entries(&self) -> Vec<AuditLog> {
        self.logs.read().clone()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.logs.read().len()
    }

    /// Returns `true` if nothing was logged.
    pub fn is_empty(&self) -> bool {
        self.logs.read().is_empty()
    }

    /// Drops all entries.
    pub fn clear(&self) {
        self.logs.write().clear();
    }
}

#[async_trait]
impl AuditLogger for InMemoryAuditLogger {
    async fn log(&self, entry: AuditLog) -> AuditResult<()> {
        let mut logs = self.logs.write();
        logs.push(entry);
        if self.max_entries > 0 && logs.len() > self.max_entries {
            let excess = logs.len() - self.max_entries;
            logs.drain(..excess);
        }
        Ok(())
    }

    async fn query(&self, filter: AuditFilter) -> AuditResult<Vec<AuditLog>> {
        let logs = self.logs.read();
        let mut matched: Vec<AuditLog> =
            logs.iter().filter(|e| filter.matches(e)).cloned().collect();
        if let Some(limit) = filter.limit {
            let skip = matched.len().saturating_sub(limit);
            matched.drain(..skip);
        }
        Ok(matched)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
