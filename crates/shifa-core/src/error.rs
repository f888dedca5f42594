// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the access-control core.

use thiserror::Error;

// =============================================================================
// ParseError
// =============================================================================

/// Failure to interpret a role or permission name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The value is not a recognized role.
    #[error("unknown role: '{0}'")]
    UnknownRole(String),

    /// The value is not a recognized permission.
    #[error("unknown permission: '{0}'")]
    UnknownPermission(String),
}

impl ParseError {
    /// Creates an unknown role error.
    pub fn unknown_role(value: impl Into<String>) -> Self {
        Self::UnknownRole(value.into())
    }

    /// Creates an unknown permission error.
    pub fn unknown_permission(value: impl Into<String>) -> Self {
        Self::UnknownPermission(value.into())
    }
}

// =============================================================================
// StoreError
// =============================================================================

/// Failure of a profile store read.
///
/// Role resolution never surfaces these to callers; they are logged and the
/// session resolves to the unknown role.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing service could not be reached.
    #[error("profile store unavailable: {message}")]
    Unavailable {
        /// Error message.
        message: String,
    },

    /// The read did not complete in time.
    #[error("profile store timed out after {elapsed_ms}ms")]
    Timeout {
        /// Time waited in milliseconds.
        elapsed_ms: u64,
    },

    /// The backend answered with an error status.
    #[error("profile store returned status {status}: {message}")]
    Backend {
        /// HTTP or backend status code.
        status: u16,
        /// Error message.
        message: String,
    },

    /// The stored data could not be decoded.
    #[error("profile store returned malformed data: {message}")]
    Decode {
        /// Error message.
        message: String,
    },

    /// Local storage I/O failure.
    #[error("profile store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a backend error.
    pub fn backend(status: u16, message: impl Into<String>) -> Self {
        Self::Backend {
            status,
            message: message.into(),
        }
    }

    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Returns `true` when the store could not be reached at all, as opposed
    /// to answering with an error. Failover stores switch to their secondary
    /// only in this case.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::decode(err.to_string())
    }
}

/// Result type for profile store operations.
pub type StoreResult<T> = Result<T, StoreError>;
