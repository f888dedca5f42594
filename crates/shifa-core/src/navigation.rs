// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Role-aware navigation menus.
//!
//! The menu is a static, ordered list of [`NavEntry`] values. Filtering keeps
//! the order and only drops entries the role may not see. Entries built with
//! [`NavEntry::for_permission`] take their role set from the grant table, so
//! the menu never shows a link the route guard would reject.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use crate::identity::SessionIdentity;
use crate::permission::Permission;
use crate::registry::RoleRegistry;
use crate::role::Role;

// =============================================================================
// NavEntry
// =============================================================================

/// One menu link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavEntry {
    /// Route the link points to.
    pub destination: String,
    /// Display label.
    pub label: String,
    /// Icon identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Roles allowed to see the link. Empty means every known role.
    #[serde(default)]
    pub required_roles: Vec<Role>,
}

impl NavEntry {
    /// Creates a link visible to every known role.
    pub fn new(destination: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            label: label.into(),
            icon: None,
            required_roles: Vec::new(),
        }
    }

    /// Creates a link visible to the roles holding `permission`.
    pub fn for_permission(
        destination: impl Into<String>,
        label: impl Into<String>,
        permission: Permission,
        registry: &RoleRegistry,
    ) -> Self {
        Self::new(destination, label).with_roles(registry.roles_with(permission))
    }

    /// Sets the icon.
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Restricts the link to `roles`.
    pub fn with_roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.required_roles = roles.into_iter().collect();
        self
    }

    /// Returns `true` if `role` may see this link.
    pub fn is_visible_to(&self, role: Option<Role>) -> bool {
        match role {
            None => false,
            Some(role) => self.required_roles.is_empty() || self.required_roles.contains(&role),
        }
    }
}

/// Filters `entries` for `role`, keeping their relative order.
pub fn filter_entries(entries: &[NavEntry], role: Option<Role>) -> Vec<NavEntry> {
    entries
        .iter()
        .filter(|e| e.is_visible_to(role))
        .cloned()
        .collect()
}

// =============================================================================
// NavigationFilter
// =============================================================================

/// The clinic's static menu.
#[derive(Debug, Clone)]
pub struct NavigationFilter {
    entries: Arc<[NavEntry]>,
}

impl NavigationFilter {
    /// Wraps a fixed list of entries.
    pub fn new(entries: Vec<NavEntry>) -> Self {
        Self {
            entries: entries.into(),
        }
    }

    /// The standard clinic menu, one entry per protected area.
    pub fn standard(registry: &RoleRegistry) -> Self {
        let entry = |dest: &str, label: &str, icon: &str, permission: Permission| {
            NavEntry::for_permission(dest, label, permission, registry).with_icon(icon)
        };

        Self::new(vec![
            entry("/dashboard", "Dashboard", "layout-dashboard", Permission::ViewDashboard),
            entry("/patients", "Patients", "users", Permission::ManagePatients),
            entry("/sessions", "Sessions", "calendar", Permission::ManageSessions),
            entry("/rooms", "Rooms", "bed", Permission::ManageRooms),
            entry("/finance", "Finance", "wallet", Permission::ViewFinance),
            entry("/expenses", "Expenses", "receipt", Permission::ManageExpenses),
            entry("/reports", "Reports", "bar-chart", Permission::ViewReports),
            entry("/facility", "Facility", "building", Permission::ManageFacility),
            entry("/users", "Users", "user-cog", Permission::ManageUsers),
            entry("/chat", "Chat", "message-circle", Permission::AccessChat),
        ])
    }

    /// All entries, unfiltered.
    pub fn entries(&self) -> &[NavEntry] {
        &self.entries
    }

    /// Entries visible to `role`.
    pub fn visible(&self, role: Option<Role>) -> Vec<NavEntry> {
        filter_entries(&self.entries, role)
    }
}

// =============================================================================
// NavigationMenu
// =============================================================================

/// A menu that follows the session's role.
///
/// The visible list is recomputed whenever the watched identity changes
/// role, and left alone for changes that keep the same role.
#[derive(Debug)]
pub struct NavigationMenu {
    filter: NavigationFilter,
    identity: watch::Receiver<SessionIdentity>,
    role: Option<Role>,
    visible: Vec<NavEntry>,
}

impl NavigationMenu {
    /// Creates a menu following `identity`.
    pub fn new(filter: NavigationFilter, mut identity: watch::Receiver<SessionIdentity>) -> Self {
        let role = identity.borrow_and_update().role();
        let visible = filter.visible(role);
        Self {
            filter,
            identity,
            role,
            visible,
        }
    }

    /// Currently visible entries.
    pub fn visible(&self) -> &[NavEntry] {
        &self.visible
    }

    /// Role the menu was last computed for.
    pub fn role(&self) -> Option<Role> {
        self.role
    }

    /// Waits for the next role change and returns the recomputed entries.
    ///
    /// Returns `None` once the identity source is gone.
    pub async fn changed(&mut self) -> Option<&[NavEntry]> {
        loop {
            if self.identity.changed().await.is_err() {
                return None;
            }
            let role = self.identity.borrow_and_update().role();
            if role != self.role {
                debug!(
                    from = ?self.role,
                    to = ?role,
                    "Role changed, recomputing navigation"
                );
                self.role = role;
                self.visible = self.filter.visible(role);
                return Some(&self.visible);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(entries: &[NavEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.label.as_str()).collect()
    }

    #[test]
    fn test_filter_preserves_order() {
        let entries = vec![
            NavEntry::new("/a", "A").with_roles([Role::Administrator]),
            NavEntry::new("/b", "B"),
            NavEntry::new("/c", "C").with_roles([Role::Accountant]),
        ];

        let visible = filter_entries(&entries, Some(Role::Accountant));
        assert_eq!(labels(&visible), vec!["B", "C"]);

        let visible = filter_entries(&entries, Some(Role::Administrator));
        assert_eq!(labels(&visible), vec!["A", "B"]);
    }

    #[test]
    fn test_filter_unknown_role_sees_nothing() {
        let entries = vec![NavEntry::new("/b", "B")];
        assert!(filter_entries(&entries, None).is_empty());
    }

    #[test]
    fn test_standard_menu_matches_grants() {
        let registry = RoleRegistry::new();
        let filter = NavigationFilter::standard(&registry);

        for role in Role::all() {
            let visible = filter.visible(Some(*role));
            assert_eq!(visible.len(), role.permissions().len(), "{role}");
        }

        let therapist = filter.visible(Some(Role::Therapist));
        assert_eq!(
            labels(&therapist),
            vec!["Dashboard", "Patients", "Sessions", "Chat"]
        );
    }

    #[tokio::test]
    async fn test_menu_recomputes_on_role_change() {
        let filter = NavigationFilter::standard(&RoleRegistry::new());
        let (tx, rx) = watch::channel(SessionIdentity::unknown());
        let mut menu = NavigationMenu::new(filter, rx);
        assert!(menu.visible().is_empty());

        tx.send_replace(SessionIdentity::known("u-1", Role::Patient));
        let visible = menu.changed().await.map(labels).unwrap_or_default();
        assert_eq!(visible, vec!["Dashboard", "Chat"]);

        // Same role again: no recompute until the role really changes.
        tx.send_replace(SessionIdentity::known("u-1", Role::Patient));
        tx.send_replace(SessionIdentity::known("u-1", Role::Accountant));
        menu.changed().await;
        assert_eq!(menu.role(), Some(Role::Accountant));
        assert!(labels(menu.visible()).contains(&"Finance"));

        drop(tx);
        assert!(menu.changed().await.is_none());
    }
}
