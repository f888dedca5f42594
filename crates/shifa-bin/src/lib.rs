// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # shifa-bin
//!
//! Command-line entry point for the Shifa Care access service.
//!
//! ```text
//!   main.rs ──► cli.rs ──► commands ──► runtime ──► shifa-api server
//!                              │            │
//!                              │        shutdown
//!                              ▼
//!                  access / users / validate / keys
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the service (default command)
//! shifa -c /etc/shifa/shifa.yaml
//!
//! # Check configuration before deploying
//! shifa validate --strict
//!
//! # Would a therapist see the finance view?
//! shifa access --role therapist --permission finance:view
//!
//! # Seed the local account store
//! shifa users add admin@clinic.example --role admin --password-stdin
//!
//! # Encrypt the hosted store API key
//! shifa encrypt "$API_KEY" -k "$(shifa gen-key)"
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod shutdown;

pub use cli::{Cli, Commands};
pub use error::{BinError, BinResult};
pub use logging::init_logging;
pub use runtime::{RuntimeBuilder, ServiceRuntime};
pub use shutdown::ShutdownCoordinator;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
