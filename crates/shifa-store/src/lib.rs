// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # shifa-store
//!
//! Profile stores and the local account store.
//!
//! - [`HostedProfileStore`]: reads profiles from the hosted backend over HTTP
//! - [`LocalFallbackStore`]: file-backed accounts with sign-up, sign-in and a
//!   current-session slot
//! - [`FailoverProfileStore`]: hosted first, local when the hosted store is
//!   unreachable
//! - [`InMemoryProfileStore`]: map-backed store for development
//! - [`AuthStateSubscription`]: sign-in/sign-out notifications with explicit
//!   cancellation
//!
//! Every store implements [`shifa_core::ProfileStore`], so any of them can
//! feed a [`shifa_core::SessionRoleResolver`].

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod failover;
pub mod fallback;
pub mod hosted;
pub mod memory;
pub mod subscription;

pub use error::{AuthError, AuthResult};
pub use failover::FailoverProfileStore;
pub use fallback::{FallbackUser, LegacyDrift, LocalFallbackStore, NewUser};
pub use hosted::HostedProfileStore;
pub use memory::InMemoryProfileStore;
pub use subscription::{AuthStateSubscription, CancelHandle};

/// Commonly used types.
pub mod prelude {
    pub use crate::error::{AuthError, AuthResult};
    pub use crate::failover::FailoverProfileStore;
    pub use crate::fallback::{FallbackUser, LocalFallbackStore, NewUser};
    pub use crate::hosted::HostedProfileStore;
    pub use crate::memory::InMemoryProfileStore;
    pub use crate::subscription::{AuthStateSubscription, CancelHandle};
}
