// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Authentication errors of the local fallback store.

use shifa_core::StoreError;
use thiserror::Error;

/// Sign-up, sign-in and account management failures.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Email is empty or malformed.
    #[error("Invalid email address: {email}")]
    InvalidEmail {
        /// The rejected address.
        email: String,
    },

    /// Password shorter than the configured minimum.
    #[error("Password must be at least {min_length} characters")]
    WeakPassword {
        /// Required length.
        min_length: usize,
    },

    /// An account already uses this email.
    #[error("An account with email '{email}' already exists")]
    EmailTaken {
        /// The duplicate address.
        email: String,
    },

    /// Unknown email or wrong password. The two are reported identically.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// The account was deactivated.
    #[error("Account is disabled")]
    AccountDisabled,

    /// No account with this email.
    #[error("User not found: {email}")]
    UserNotFound {
        /// The address looked up.
        email: String,
    },

    /// Password hashing failed.
    #[error("Password hashing failed: {message}")]
    Hashing {
        /// Error message.
        message: String,
    },

    /// Underlying storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuthError {
    /// Creates an invalid email error.
    pub fn invalid_email(email: impl Into<String>) -> Self {
        Self::InvalidEmail {
            email: email.into(),
        }
    }

    /// Creates a hashing error.
    pub fn hashing(message: impl Into<String>) -> Self {
        Self::Hashing {
            message: message.into(),
        }
    }

    /// Returns `true` for errors caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Hashing { .. } | Self::Store(_))
    }
}

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;
