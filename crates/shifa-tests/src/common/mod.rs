// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Common Test Utilities
//!
//! Shared helpers for the integration suites. Each test builds its own
//! stores and temporary directories, so suites run in parallel without
//! sharing state.
//!
//! ## Module Structure
//!
//! - `fixtures`: Accounts, sessions and configuration files
//! - `mocks`: Profile stores with scripted behavior, and a navigator that
//!   records where it was sent
//! - `harness`: An [`ApiHarness`](harness::ApiHarness) driving the router
//!   in process

pub mod fixtures;
pub mod harness;
pub mod mocks;

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Initialize test logging. Call this at the start of each test.
pub fn init_test_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("warn,shifa=debug")),
            )
            .with_test_writer()
            .init();
    });
}

/// Create a temporary directory for test data.
pub fn temp_test_dir(prefix: &str) -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("Failed to create temp directory")
}
