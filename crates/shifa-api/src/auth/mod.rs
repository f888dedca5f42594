// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session tokens.
//!
//! Tokens prove who the caller is. What the caller may do is decided per
//! request by the route guard.

mod claims;
mod jwt;

pub use claims::Claims;
pub use jwt::{JwtConfig, JwtManager};
