// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Staff and patient roles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;
use crate::permission::PermissionSet;
use crate::registry;

/// The role a user acts under.
///
/// Every acting user holds exactly one role at a time. Role strings that do
/// not parse into one of these variants are treated as an unknown role,
/// which is granted nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full access to every area.
    #[serde(rename = "admin", alias = "administrator")]
    Administrator,
    /// Clinical lead.
    Supervisor,
    /// Finance staff.
    Accountant,
    /// Treating clinician.
    Therapist,
    /// Front desk.
    Receptionist,
    /// Patient self-service.
    Patient,
}

impl Role {
    /// Every role, in declaration order.
    pub const ALL: [Role; 6] = [
        Role::Administrator,
        Role::Supervisor,
        Role::Accountant,
        Role::Therapist,
        Role::Receptionist,
        Role::Patient,
    ];

    /// Returns the stored name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "admin",
            Role::Supervisor => "supervisor",
            Role::Accountant => "accountant",
            Role::Therapist => "therapist",
            Role::Receptionist => "receptionist",
            Role::Patient => "patient",
        }
    }

    /// Human readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Administrator => "Administrator",
            Role::Supervisor => "Supervisor",
            Role::Accountant => "Accountant",
            Role::Therapist => "Therapist",
            Role::Receptionist => "Receptionist",
            Role::Patient => "Patient",
        }
    }

    /// Parses a stored role value, ignoring case and surrounding whitespace.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" | "administrator" => Some(Role::Administrator),
            "supervisor" => Some(Role::Supervisor),
            "accountant" => Some(Role::Accountant),
            "therapist" => Some(Role::Therapist),
            "receptionist" => Some(Role::Receptionist),
            "patient" => Some(Role::Patient),
            _ => None,
        }
    }

    /// Returns all roles.
    pub fn all() -> &'static [Role] {
        &Self::ALL
    }

    /// Returns `true` for clinic staff roles.
    pub fn is_staff(&self) -> bool {
        !matches!(self, Role::Patient)
    }

    /// Permissions granted to this role by the static grant table.
    pub fn permissions(&self) -> PermissionSet {
        registry::permissions_of(*self)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ParseError::unknown_role(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("admin"), Some(Role::Administrator));
        assert_eq!(Role::parse(" Administrator "), Some(Role::Administrator));
        assert_eq!(Role::parse("THERAPIST"), Some(Role::Therapist));
        assert_eq!(Role::parse("doctor"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn test_role_round_trip() {
        for role in Role::all() {
            assert_eq!(Role::parse(role.as_str()), Some(*role));
            assert_eq!(role.to_string().parse::<Role>().ok(), Some(*role));
        }
    }

    #[test]
    fn test_role_serde() {
        let json = serde_json::to_string(&Role::Administrator).unwrap();
        assert_eq!(json, "\"admin\"");

        let role: Role = serde_json::from_str("\"administrator\"").unwrap();
        assert_eq!(role, Role::Administrator);

        let role: Role = serde_json::from_str("\"receptionist\"").unwrap();
        assert_eq!(role, Role::Receptionist);
    }

    #[test]
    fn test_role_is_staff() {
        assert!(Role::Accountant.is_staff());
        assert!(!Role::Patient.is_staff());
    }
}
