// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Fixtures
//!
//! Pre-built accounts, sessions and configuration files, so every suite
//! talks about the same clinic.

use std::path::{Path, PathBuf};

use shifa_core::{NavEntry, Role, Session};
use shifa_store::NewUser;

/// Signing secret for test tokens.
pub const TEST_JWT_SECRET: &str = "test-secret-key-for-jwt-signing-must-be-at-least-32-chars";

/// Password used by every fixture account.
pub const TEST_PASSWORD: &str = "correct-horse-battery";

// =============================================================================
// Accounts and Sessions
// =============================================================================

/// Fixture accounts, one per role.
pub struct AccountFixtures;

impl AccountFixtures {
    /// Email of the fixture account for `role`.
    pub fn email(role: Role) -> String {
        format!("{}@clinic.example", role.as_str())
    }

    /// Sign-up request for the fixture account of `role`.
    pub fn new_user(role: Role) -> NewUser {
        NewUser::new(
            Self::email(role),
            TEST_PASSWORD,
            format!("Test {}", role.as_str()),
            role,
        )
    }
}

/// Fixture sessions.
pub struct SessionFixtures;

impl SessionFixtures {
    /// A session for `user_id`.
    pub fn for_user(user_id: &str) -> Session {
        Session::new(user_id).with_email(format!("{user_id}@clinic.example"))
    }
}

// =============================================================================
// Navigation
// =============================================================================

/// Fixture navigation entries.
pub struct NavigationFixtures;

impl NavigationFixtures {
    /// `A` for administrators, `B` for everyone, `C` for accountants.
    pub fn admin_open_accountant() -> Vec<NavEntry> {
        vec![
            NavEntry::new("/a", "A").with_roles([Role::Administrator]),
            NavEntry::new("/b", "B"),
            NavEntry::new("/c", "C").with_roles([Role::Accountant]),
        ]
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Fixture configuration files.
pub struct ConfigFixtures;

impl ConfigFixtures {
    /// A local-only YAML configuration.
    pub fn local_only_yaml() -> &'static str {
        r#"
server:
  host: 127.0.0.1
  port: 8089
security:
  jwt:
    secret: test-secret-key-for-jwt-signing-must-be-at-least-32-chars
  default_route: /
fallback:
  enabled: true
  path: data/users.json
  min_password_length: 8
resolver:
  timeout: 2s
audit:
  sink: memory
logging:
  level: debug
  format: json
"#
    }

    /// A YAML configuration with the hosted store in front of the local one.
    pub fn hosted_yaml(url: &str) -> String {
        format!(
            r#"
security:
  jwt:
    secret: ${{SHIFA_TEST_JWT:test-secret-key-for-jwt-signing-must-be-at-least-32-chars}}
backend:
  enabled: true
  url: {url}
  api_key: ${{SHIFA_TEST_API_KEY}}
  profiles_table: profiles
  timeout: 3s
fallback:
  path: users.json
"#
        )
    }

    /// Writes `content` to `dir/name` and returns the path.
    pub fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).expect("Failed to write fixture config");
        path
    }
}
