// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The role to permission grant table and the permission check.
//!
//! The table is a closed, exhaustive `match` over every role and every
//! permission. Adding a variant to either enum fails to compile until each
//! role has an explicit decision for it. The table is fixed for the lifetime
//! of the process and cannot be edited at runtime.
//!
//! | Role          | Granted                                                     |
//! |---------------|-------------------------------------------------------------|
//! | administrator | everything                                                  |
//! | supervisor    | dashboard, patients, sessions, rooms, reports, facility, chat |
//! | accountant    | dashboard, finance, expenses, reports, chat                 |
//! | therapist     | dashboard, patients, sessions, chat                         |
//! | receptionist  | dashboard, patients, rooms, chat                            |
//! | patient       | dashboard, chat                                             |

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::permission::{Permission, PermissionSet};
use crate::role::Role;

// =============================================================================
// Grant Table
// =============================================================================

/// Returns `true` if `role` is granted `permission`.
pub const fn grants(role: Role, permission: Permission) -> bool {
    use Permission::*;

    match role {
        Role::Administrator => match permission {
            ViewDashboard | ManagePatients | ManageSessions | ManageRooms | ViewFinance
            | ManageExpenses | ViewReports | ManageFacility | ManageUsers | AccessChat => true,
        },
        Role::Supervisor => match permission {
            ViewDashboard | ManagePatients | ManageSessions | ManageRooms | ViewReports
            | ManageFacility | AccessChat => true,
            ViewFinance | ManageExpenses | ManageUsers => false,
        },
        Role::Accountant => match permission {
            ViewDashboard | ViewFinance | ManageExpenses | ViewReports | AccessChat => true,
            ManagePatients | ManageSessions | ManageRooms | ManageFacility | ManageUsers => false,
        },
        Role::Therapist => match permission {
            ViewDashboard | ManagePatients | ManageSessions | AccessChat => true,
            ManageRooms | ViewFinance | ManageExpenses | ViewReports | ManageFacility
            | ManageUsers => false,
        },
        Role::Receptionist => match permission {
            ViewDashboard | ManagePatients | ManageRooms | AccessChat => true,
            ManageSessions | ViewFinance | ManageExpenses | ViewReports | ManageFacility
            | ManageUsers => false,
        },
        Role::Patient => match permission {
            ViewDashboard | AccessChat => true,
            ManagePatients | ManageSessions | ManageRooms | ViewFinance | ManageExpenses
            | ViewReports | ManageFacility | ManageUsers => false,
        },
    }
}

/// Checks a permission for a possibly unresolved role.
///
/// `None` stands for an unknown or unauthenticated role and is denied every
/// permission.
pub fn has_permission(role: Option<Role>, permission: Permission) -> bool {
    match role {
        Some(role) => grants(role, permission),
        None => false,
    }
}

/// Checks a permission for a raw role value as stored in a profile.
///
/// Values that are not a recognized role are denied every permission.
pub fn has_permission_named(role: &str, permission: Permission) -> bool {
    has_permission(Role::parse(role), permission)
}

/// Permissions granted to `role`.
pub fn permissions_of(role: Role) -> PermissionSet {
    Permission::ALL
        .into_iter()
        .filter(|p| grants(role, *p))
        .collect()
}

// =============================================================================
// RoleRegistry
// =============================================================================

/// Shared, read-only view of the grant table.
///
/// Created once at startup and cloned into every component that checks
/// access. Lookups take no locks.
#[derive(Debug, Clone)]
pub struct RoleRegistry {
    table: Arc<BTreeMap<Role, PermissionSet>>,
}

impl RoleRegistry {
    /// Builds the registry from the static grant table.
    pub fn new() -> Self {
        let table = Role::ALL
            .into_iter()
            .map(|role| (role, permissions_of(role)))
            .collect();
        Self {
            table: Arc::new(table),
        }
    }

    /// Permissions of an optional role. Unknown roles get an empty set.
    pub fn permissions_for(&self, role: Option<Role>) -> PermissionSet {
        role.and_then(|r| self.table.get(&r).cloned())
            .unwrap_or_default()
    }

    /// Returns `true` if the role holds the permission.
    pub fn has_permission(&self, role: Option<Role>, permission: Permission) -> bool {
        role.and_then(|r| self.table.get(&r))
            .is_some_and(|set| set.contains(permission))
    }

    /// Returns `true` if the role holds every listed permission.
    ///
    /// An unknown role is denied even when the list is empty.
    pub fn has_all_permissions(&self, role: Option<Role>, permissions: &[Permission]) -> bool {
        role.and_then(|r| self.table.get(&r))
            .is_some_and(|set| set.contains_all(permissions))
    }

    /// Returns `true` if the role holds at least one listed permission.
    pub fn has_any_permission(&self, role: Option<Role>, permissions: &[Permission]) -> bool {
        role.and_then(|r| self.table.get(&r))
            .is_some_and(|set| set.contains_any(permissions))
    }

    /// Roles holding `permission`, in declaration order.
    pub fn roles_with(&self, permission: Permission) -> Vec<Role> {
        Role::ALL
            .into_iter()
            .filter(|r| self.has_permission(Some(*r), permission))
            .collect()
    }

    /// The per-area boolean map mirrored onto user records at sign-up.
    ///
    /// The map is informational only. Authorization always goes through the
    /// grant table.
    pub fn legacy_permission_map(&self, role: Role) -> BTreeMap<String, bool> {
        Permission::ALL
            .into_iter()
            .map(|p| {
                (
                    p.category().to_string(),
                    self.has_permission(Some(role), p),
                )
            })
            .collect()
    }

    /// Lists permissions where a stored legacy map disagrees with the grant
    /// table for `role`. Missing keys count as `false`; unknown keys are
    /// ignored.
    pub fn legacy_permission_drift(
        &self,
        role: Role,
        legacy: &BTreeMap<String, bool>,
    ) -> Vec<Permission> {
        Permission::ALL
            .into_iter()
            .filter(|p| {
                let stored = legacy.get(p.category()).copied().unwrap_or(false);
                stored != self.has_permission(Some(role), *p)
            })
            .collect()
    }

    /// Grant matrix rows as `(role, permissions)` in declaration order.
    pub fn matrix(&self) -> Vec<(Role, PermissionSet)> {
        self.table
            .iter()
            .map(|(role, set)| (*role, set.clone()))
            .collect()
    }
}

impl Default for RoleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
