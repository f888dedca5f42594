// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Middleware implementations for the API server.
//!
//! - [`SessionLayer`]: bearer token to [`RequestSession`]
//! - [`RouteGuardLayer`]: per-route role check with redirect on denial

mod guard;
mod session;

pub use guard::{RouteGuardLayer, RouteGuardMiddleware};
pub use session::{RequestSession, SessionLayer, SessionMiddleware};
