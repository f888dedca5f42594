// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Permission definitions for clinic access control.
//!
//! Permissions are flat capability names with no hierarchy. Each protected
//! view or action of the clinic requires one or more of them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// A named capability that gates a clinic view or action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    // =========================================================================
    // Clinical
    // =========================================================================
    /// Open the dashboard.
    ViewDashboard,
    /// Create, edit and browse patient records.
    ManagePatients,
    /// Schedule and record therapy sessions.
    ManageSessions,
    /// Allocate rooms and beds.
    ManageRooms,

    // =========================================================================
    // Financial
    // =========================================================================
    /// View invoices, payments and balances.
    ViewFinance,
    /// Record and approve expenses.
    ManageExpenses,

    // =========================================================================
    // Administrative
    // =========================================================================
    /// View operational reports.
    ViewReports,
    /// Manage facility resources and maintenance.
    ManageFacility,
    /// Create and deactivate staff accounts.
    ManageUsers,

    // =========================================================================
    // Communication
    // =========================================================================
    /// Use internal chat.
    AccessChat,
}

impl Permission {
    /// Every permission, in declaration order.
    pub const ALL: [Permission; 10] = [
        Permission::ViewDashboard,
        Permission::ManagePatients,
        Permission::ManageSessions,
        Permission::ManageRooms,
        Permission::ViewFinance,
        Permission::ManageExpenses,
        Permission::ViewReports,
        Permission::ManageFacility,
        Permission::ManageUsers,
        Permission::AccessChat,
    ];

    /// Returns the canonical `area:action` name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ViewDashboard => "dashboard:view",
            Permission::ManagePatients => "patients:manage",
            Permission::ManageSessions => "sessions:manage",
            Permission::ManageRooms => "rooms:manage",
            Permission::ViewFinance => "finance:view",
            Permission::ManageExpenses => "expenses:manage",
            Permission::ViewReports => "reports:view",
            Permission::ManageFacility => "facility:manage",
            Permission::ManageUsers => "users:manage",
            Permission::AccessChat => "chat:access",
        }
    }

    /// Parses a permission name.
    ///
    /// Accepts the canonical form (`patients:manage`), the snake case form
    /// (`manage_patients`), the kebab case form (`manage-patients`) and the
    /// variant name (`ManagePatients`).
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        if let Some(p) = Self::ALL.iter().find(|p| p.as_str() == trimmed) {
            return Some(*p);
        }
        let normalized = trimmed.replace('-', "_").to_ascii_lowercase();
        match normalized.as_str() {
            "view_dashboard" | "viewdashboard" => Some(Permission::ViewDashboard),
            "manage_patients" | "managepatients" => Some(Permission::ManagePatients),
            "manage_sessions" | "managesessions" => Some(Permission::ManageSessions),
            "manage_rooms" | "managerooms" => Some(Permission::ManageRooms),
            "view_finance" | "viewfinance" => Some(Permission::ViewFinance),
            "manage_expenses" | "manageexpenses" => Some(Permission::ManageExpenses),
            "view_reports" | "viewreports" => Some(Permission::ViewReports),
            "manage_facility" | "managefacility" => Some(Permission::ManageFacility),
            "manage_users" | "manageusers" => Some(Permission::ManageUsers),
            "access_chat" | "accesschat" => Some(Permission::AccessChat),
            _ => None,
        }
    }

    /// Returns all permissions.
    pub fn all() -> &'static [Permission] {
        &Self::ALL
    }

    /// Returns the area this permission belongs to.
    ///
    /// The area doubles as the key of the per-user legacy permission map.
    pub fn category(&self) -> &'static str {
        match self {
            Permission::ViewDashboard => "dashboard",
            Permission::ManagePatients => "patients",
            Permission::ManageSessions => "sessions",
            Permission::ManageRooms => "rooms",
            Permission::ViewFinance => "finance",
            Permission::ManageExpenses => "expenses",
            Permission::ViewReports => "reports",
            Permission::ManageFacility => "facility",
            Permission::ManageUsers => "users",
            Permission::AccessChat => "chat",
        }
    }

    /// Returns the permission whose area is `category`, if any.
    pub fn from_category(category: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.category() == category)
    }

    /// Returns `true` for permissions that expose financial data.
    pub fn is_financial(&self) -> bool {
        matches!(self, Permission::ViewFinance | Permission::ManageExpenses)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Permission {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ParseError::unknown_permission(s))
    }
}

// =============================================================================
// PermissionSet
// =============================================================================

/// An ordered set of permissions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet {
    permissions: BTreeSet<Permission>,
}

impl PermissionSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set holding every permission.
    pub fn all() -> Self {
        Permission::ALL.into_iter().collect()
    }

    /// Adds a permission.
    pub fn insert(&mut self, permission: Permission) -> bool {
        self.permissions.insert(permission)
    }

    /// Returns `true` if the set contains the permission.
    pub fn contains(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    /// Returns `true` if the set contains every given permission.
    pub fn contains_all(&self, permissions: &[Permission]) -> bool {
        permissions.iter().all(|p| self.permissions.contains(p))
    }

    /// Returns `true` if the set contains at least one given permission.
    pub fn contains_any(&self, permissions: &[Permission]) -> bool {
        permissions.iter().any(|p| self.permissions.contains(p))
    }

    /// Iterates in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.permissions.iter().copied()
    }

    /// Number of permissions in the set.
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    /// Returns `true` if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    /// Canonical names, in declaration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(|p| p.as_str()).collect()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self {
            permissions: iter.into_iter().collect(),
        }
    }
}
