// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! API handlers.
//!
//! - `health`: liveness and readiness
//! - `auth`: sign-up, sign-in, sign-out and the current session
//! - `views`: guarded clinic views
//! - `navigation`: the caller's menu
//! - `chat`: sealed staff chat

mod auth;
mod chat;
mod health;
mod navigation;
mod views;

pub use auth::*;
pub use chat::*;
pub use health::*;
pub use navigation::*;
pub use views::*;
