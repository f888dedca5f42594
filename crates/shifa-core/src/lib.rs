// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # shifa-core
//!
//! Access-control core of the Shifa Care clinic management system.
//!
//! ## Components
//!
//! ```text
//!  Role ──► Grant table (registry) ──► Permission check
//!                                            │
//!  Session ──► SessionRoleResolver ──► SessionIdentity
//!                    │                       │
//!               ProfileStore          ┌──────┴───────┐
//!                                     ▼              ▼
//!                                RouteGuard   NavigationFilter
//! ```
//!
//! - [`role`] / [`permission`]: the closed sets of roles and permissions
//! - [`registry`]: the exhaustive grant table and permission checks
//! - [`resolver`]: reads a session's role from a [`ProfileStore`], failing
//!   closed to the unknown role
//! - [`guard`]: gates a protected view and redirects on denial
//! - [`navigation`]: filters the menu down to what a role may open
//! - [`audit`]: records sign-ins and access decisions
//!
//! ## Example
//!
//! ```rust
//! use shifa_core::prelude::*;
//!
//! let registry = RoleRegistry::new();
//! assert!(registry.has_permission(Some(Role::Therapist), Permission::ManageSessions));
//! assert!(!registry.has_permission(Some(Role::Therapist), Permission::ViewFinance));
//! assert!(!registry.has_permission(None, Permission::ViewDashboard));
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod audit;
pub mod error;
pub mod guard;
pub mod identity;
pub mod navigation;
pub mod permission;
pub mod registry;
pub mod resolver;
pub mod role;

pub use audit::{AuditAction, AuditFilter, AuditLog, AuditLogger};
pub use error::{ParseError, StoreError, StoreResult};
pub use guard::{GuardOutcome, GuardState, MountedView, Navigator, Requirement, RouteGuard};
pub use identity::{Session, SessionIdentity, UserId};
pub use navigation::{NavEntry, NavigationFilter, NavigationMenu};
pub use permission::{Permission, PermissionSet};
pub use registry::{RoleRegistry, has_permission, has_permission_named};
pub use resolver::{ProfileRecord, ProfileStore, SessionRoleResolver};
pub use role::Role;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Commonly used types.
pub mod prelude {
    pub use crate::audit::{
        AuditAction, AuditLog, AuditLogger, InMemoryAuditLogger, NoOpAuditLogger,
        TracingAuditLogger,
    };
    pub use crate::error::{StoreError, StoreResult};
    pub use crate::guard::{
        DEFAULT_ROUTE, GuardOutcome, GuardState, MountedView, Navigator, Requirement, RouteGuard,
    };
    pub use crate::identity::{Session, SessionIdentity, UserId};
    pub use crate::navigation::{NavEntry, NavigationFilter, NavigationMenu, filter_entries};
    pub use crate::permission::{Permission, PermissionSet};
    pub use crate::registry::{RoleRegistry, has_permission, has_permission_named};
    pub use crate::resolver::{ProfileRecord, ProfileStore, SessionRoleResolver};
    pub use crate::role::Role;
}
