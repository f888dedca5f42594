// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Shifa Care Integration Tests
//!
//! Integration tests for the Shifa Care access service, plus the shared
//! mocks, fixtures and the HTTP harness they run on.
//!
//! ## Module Structure
//!
//! - [`common`]: Shared test utilities
//!   - `fixtures`: Accounts, sessions and configuration files
//!   - `mocks`: Scriptable profile stores and a recording navigator
//!   - `harness`: A router over a throwaway account store
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all integration tests
//! cargo test -p shifa-tests
//!
//! # Run one suite
//! cargo test -p shifa-tests --test integration_access
//! cargo test -p shifa-tests --test integration_store
//! cargo test -p shifa-tests --test integration_config
//! cargo test -p shifa-tests --test integration_api
//! ```
//!
//! ## Test Categories
//!
//! ### Access Tests (`integration_access.rs`)
//! - Grant table lookups, including the unknown role
//! - Role resolution against failing and stalled stores
//! - Route guards: loading, render, redirect, unmount
//! - Navigation filtering and the reactive menu
//!
//! ### Store Tests (`integration_store.rs`)
//! - Local accounts: sign-up, sign-in, plain-text upgrade, deactivation
//! - Hosted profile reads against a stub REST endpoint
//! - Failover between hosted and local profiles
//!
//! ### Config Tests (`integration_config.rs`)
//! - YAML, TOML and JSON files
//! - Placeholders, `SHIFA_*` overrides and encrypted secrets
//!
//! ### API Tests (`integration_api.rs`)
//! - Sign-up and sign-in flows
//! - Guarded views: render vs. `303 See Other`
//! - Navigation, chat and audit records
//!
//! ## Writing New Tests
//!
//! ```rust,ignore
//! use shifa_tests::prelude::*;
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let harness = ApiHarness::new();
//!     let token = harness.enroll(Role::Therapist).await;
//!     let (status, _, _) = harness.get("/sessions", Some(&token)).await;
//!     assert_eq!(status, StatusCode::OK);
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod common;

/// Everything a test usually needs.
pub mod prelude {
    pub use crate::common::fixtures::*;
    pub use crate::common::harness::*;
    pub use crate::common::mocks::*;
    pub use crate::common::{init_test_logging, temp_test_dir};

    pub use axum::http::StatusCode;
    pub use shifa_core::prelude::*;
}
