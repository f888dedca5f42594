// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # shifa-api
//!
//! HTTP service for the Shifa Care access core.
//!
//! Requests pass through a [`SessionLayer`](middleware::SessionLayer) that
//! reads the bearer token, then, on protected routes, a
//! [`RouteGuardLayer`](middleware::RouteGuardLayer) that resolves the
//! caller's role from the profile store and either lets the request through
//! or redirects it to the default route.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod server;
pub mod state;

pub use auth::{Claims, JwtConfig, JwtManager};
pub use chat::{ChatMessage, ChatRoom};
pub use config::ApiSettings;
pub use error::{ApiError, ApiResult};
pub use server::{ApiServer, GUARDED_VIEWS};
pub use state::{AppState, AppStateBuilder};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
