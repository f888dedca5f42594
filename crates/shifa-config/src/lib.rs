// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # shifa-config
//!
//! Configuration management for the Shifa Care access service.
//!
//! ## Features
//!
//! - **Schema**: typed sections for the HTTP server, session tokens, the
//!   hosted and fallback profile stores, role resolution, audit, chat and
//!   logging, each with validation
//! - **Multi-Format**: YAML, TOML and JSON files
//! - **Environment**: `${VAR:default}` placeholders and `SHIFA_*` overrides
//! - **Encryption**: AES-256-GCM `ENC:` secrets and chat message sealing
//!
//! ## Quick Start
//!
//! ```no_run
//! use shifa_config::loader::load_config;
//!
//! let config = load_config("shifa.yaml").unwrap();
//! println!("Listening on {}", config.server.socket_addr());
//! ```
//!
//! ## Example File
//!
//! ```yaml
//! server:
//!   port: 8080
//! security:
//!   jwt:
//!     secret: ${SHIFA_JWT_SECRET}
//!   default_route: /
//! backend:
//!   enabled: true
//!   url: https://project.example.co
//!   api_key: ENC:...
//! fallback:
//!   path: data/users.json
//! chat:
//!   sealing_key: ENC:...
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod encryption;
pub mod error;
pub mod loader;
pub mod schema;

pub use encryption::{Encryptor, MessageSealer, generate_key, generate_key_base64};
pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigFormat, ConfigLoader, load_config, load_config_str};
pub use schema::{SecretValue, ShifaConfig};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Convenience re-exports.
pub mod prelude {
    pub use crate::encryption::{Encryptor, MessageSealer};
    pub use crate::error::{ConfigError, ConfigResult};
    pub use crate::loader::{ConfigFormat, ConfigLoader, load_config};
    pub use crate::schema::{
        AuditSink, BackendConfig, FallbackConfig, LogFormat, LogLevel, SecretValue, ShifaConfig,
    };
}
