// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Route guards for protected views.
//!
//! A guard wraps a protected view with an access [`Requirement`]. When the
//! view is entered the guard resolves the session's role and either renders
//! the view or sends the user to the default route.
//!
//! ```text
//!            mount
//!              │
//!         ┌────▼────┐   role satisfies    ┌────────────┐
//!         │ Loading ├────────────────────►│ Authorized │  children rendered
//!         └────┬────┘                     └────────────┘
//!              │ role missing or lacking
//!         ┌────▼─────────┐
//!         │ Unauthorized │  navigate(default route), children hidden
//!         └──────────────┘
//! ```
//!
//! Both terminal states are final for one mount. Unmounting while still
//! `Loading` abandons the resolution: no state change, no navigation.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::identity::{Session, SessionIdentity};
use crate::permission::Permission;
use crate::registry::RoleRegistry;
use crate::resolver::SessionRoleResolver;
use crate::role::Role;

/// Route users are sent to when access is denied.
pub const DEFAULT_ROUTE: &str = "/";

// =============================================================================
// Requirement
// =============================================================================

/// What a protected view demands of the current role.
///
/// The unknown role satisfies no requirement. Empty `AllOf`, `AnyOf` and
/// `Roles` lists are satisfied by any known role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Requirement {
    /// A single permission.
    Permission(Permission),
    /// Every listed permission.
    AllOf(Vec<Permission>),
    /// At least one listed permission.
    AnyOf(Vec<Permission>),
    /// One of the listed roles.
    Roles(Vec<Role>),
}

impl Requirement {
    /// Requires a single permission.
    pub fn permission(permission: Permission) -> Self {
        Self::Permission(permission)
    }

    /// Requires every permission in `permissions`.
    pub fn all(permissions: impl IntoIterator<Item = Permission>) -> Self {
        Self::AllOf(permissions.into_iter().collect())
    }

    /// Requires at least one permission in `permissions`.
    pub fn any(permissions: impl IntoIterator<Item = Permission>) -> Self {
        Self::AnyOf(permissions.into_iter().collect())
    }

    /// Requires one of `roles`.
    pub fn roles(roles: impl IntoIterator<Item = Role>) -> Self {
        Self::Roles(roles.into_iter().collect())
    }

    /// Evaluates the requirement against a role.
    pub fn is_satisfied_by(&self, registry: &RoleRegistry, role: Option<Role>) -> bool {
        let Some(role) = role else {
            return false;
        };
        match self {
            Requirement::Permission(p) => registry.has_permission(Some(role), *p),
            Requirement::AllOf(ps) => registry.has_all_permissions(Some(role), ps),
            Requirement::AnyOf(ps) => ps.is_empty() || registry.has_any_permission(Some(role), ps),
            Requirement::Roles(rs) => rs.is_empty() || rs.contains(&role),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join<T: fmt::Display>(items: &[T]) -> String {
            items
                .iter()
                .map(|i| i.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        }

        match self {
            Requirement::Permission(p) => write!(f, "{p}"),
            Requirement::AllOf(ps) => write!(f, "all({})", join(ps)),
            Requirement::AnyOf(ps) => write!(f, "any({})", join(ps)),
            Requirement::Roles(rs) => write!(f, "roles({})", join(rs)),
        }
    }
}

impl From<Permission> for Requirement {
    fn from(permission: Permission) -> Self {
        Self::Permission(permission)
    }
}

// =============================================================================
// Guard State
// =============================================================================

/// State of a guarded view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardState {
    /// Role resolution in flight. Children hidden, no redirect yet.
    Loading,
    /// Requirement satisfied. Children rendered.
    Authorized,
    /// Requirement not satisfied. Redirected, children hidden.
    Unauthorized,
}

impl GuardState {
    /// Returns `true` once the state can no longer change.
    pub fn is_settled(&self) -> bool {
        !matches!(self, GuardState::Loading)
    }
}

/// Outcome of a request-scoped guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Render the view for this identity.
    Render(SessionIdentity),
    /// Send the user to `to`.
    Redirect {
        /// Destination route.
        to: String,
        /// The identity that was denied.
        identity: SessionIdentity,
    },
}

impl GuardOutcome {
    /// Returns `true` for [`GuardOutcome::Render`].
    pub fn is_render(&self) -> bool {
        matches!(self, GuardOutcome::Render(_))
    }

    /// The identity the decision was made for.
    pub fn identity(&self) -> &SessionIdentity {
        match self {
            GuardOutcome::Render(identity) => identity,
            GuardOutcome::Redirect { identity, .. } => identity,
        }
    }
}

// =============================================================================
// Navigator
// =============================================================================

/// The routing layer's ability to move the user to another route.
pub trait Navigator: Send + Sync {
    /// Navigates to `destination`.
    fn navigate(&self, destination: &str);
}

// =============================================================================
// RouteGuard
// =============================================================================

/// Access gate in front of one protected view.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    requirement: Requirement,
    registry: RoleRegistry,
    redirect_to: String,
}

impl RouteGuard {
    /// Creates a guard redirecting to [`DEFAULT_ROUTE`] on denial.
    pub fn new(requirement: impl Into<Requirement>) -> Self {
        Self {
            requirement: requirement.into(),
            registry: RoleRegistry::new(),
            redirect_to: DEFAULT_ROUTE.to_string(),
        }
    }

    /// Uses a shared registry.
    pub fn with_registry(mut self, registry: RoleRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Changes the denial destination.
    pub fn with_redirect(mut self, route: impl Into<String>) -> Self {
        self.redirect_to = route.into();
        self
    }

    /// The guarded requirement.
    pub fn requirement(&self) -> &Requirement {
        &self.requirement
    }

    /// Where denied users are sent.
    pub fn redirect_target(&self) -> &str {
        &self.redirect_to
    }

    /// Decides the settled state for a resolved identity.
    pub fn decide(&self, identity: &SessionIdentity) -> GuardState {
        if self
            .requirement
            .is_satisfied_by(&self.registry, identity.role())
        {
            GuardState::Authorized
        } else {
            GuardState::Unauthorized
        }
    }

    /// Resolves the session and decides in one step.
    ///
    /// Dropping the returned future before it completes abandons the check
    /// without side effects.
    pub async fn check(
        &self,
        resolver: &SessionRoleResolver,
        session: Option<&Session>,
    ) -> GuardOutcome {
        let identity = resolver.resolve(session).await;
        match self.decide(&identity) {
            GuardState::Authorized => GuardOutcome::Render(identity),
            _ => {
                info!(
                    requirement = %self.requirement,
                    role = identity.role().map(|r| r.as_str()).unwrap_or("unknown"),
                    redirect = %self.redirect_to,
                    "Access denied"
                );
                GuardOutcome::Redirect {
                    to: self.redirect_to.clone(),
                    identity,
                }
            }
        }
    }

    /// Mounts a guarded view.
    ///
    /// Resolution runs on a spawned task, so this must be called from within
    /// a tokio runtime. The view starts in [`GuardState::Loading`].
    pub fn mount<T>(
        &self,
        resolver: SessionRoleResolver,
        session: Option<Session>,
        navigator: Arc<dyn Navigator>,
        children: T,
    ) -> MountedView<T> {
        let (tx, rx) = watch::channel(GuardSnapshot::loading());
        let lifecycle = Arc::new(Lifecycle {
            mounted: Mutex::new(true),
        });

        let guard = self.clone();
        let task_lifecycle = Arc::clone(&lifecycle);
        let task = tokio::spawn(async move {
            let identity = resolver.resolve(session.as_ref()).await;
            let state = guard.decide(&identity);

            {
                let mounted = task_lifecycle.mounted.lock();
                if !*mounted {
                    debug!(
                        requirement = %guard.requirement,
                        "View unmounted before role resolution settled"
                    );
                    return;
                }
                tx.send_replace(GuardSnapshot {
                    state,
                    identity: Some(identity),
                });
            }

            // The lock is released here: the router may unmount the view
            // from inside `navigate`.
            if state == GuardState::Unauthorized {
                info!(
                    requirement = %guard.requirement,
                    redirect = %guard.redirect_to,
                    "Access denied, redirecting"
                );
                navigator.navigate(&guard.redirect_to);
            }
        });

        MountedView {
            children,
            state: rx,
            lifecycle,
            task: Some(task),
        }
    }
}

// =============================================================================
// MountedView
// =============================================================================

/// Snapshot of a mounted view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardSnapshot {
    /// Current state.
    pub state: GuardState,
    /// Resolved identity, once settled.
    pub identity: Option<SessionIdentity>,
}

impl GuardSnapshot {
    fn loading() -> Self {
        Self {
            state: GuardState::Loading,
            identity: None,
        }
    }
}

struct Lifecycle {
    mounted: Mutex<bool>,
}

/// A protected view mounted behind a [`RouteGuard`].
///
/// Dropping the view unmounts it.
pub struct MountedView<T> {
    children: T,
    state: watch::Receiver<GuardSnapshot>,
    lifecycle: Arc<Lifecycle>,
    task: Option<JoinHandle<()>>,
}

impl<T> MountedView<T> {
    /// Current state.
    pub fn state(&self) -> GuardState {
        self.state.borrow().state
    }

    /// Resolved identity, once settled.
    pub fn identity(&self) -> Option<SessionIdentity> {
        self.state.borrow().identity.clone()
    }

    /// The children, only while mounted and authorized.
    pub fn children(&self) -> Option<&T> {
        (self.is_mounted() && self.state() == GuardState::Authorized).then_some(&self.children)
    }

    /// Returns `true` until the view is unmounted.
    pub fn is_mounted(&self) -> bool {
        *self.lifecycle.mounted.lock()
    }

    /// Waits until the state settles.
    ///
    /// Returns the current state if resolution was abandoned.
    pub async fn settled(&mut self) -> GuardState {
        let settled = self
            .state
            .wait_for(|s| s.state.is_settled())
            .await
            .map(|s| s.state);
        match settled {
            Ok(state) => state,
            Err(_) => self.state.borrow().state,
        }
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<GuardSnapshot> {
        self.state.clone()
    }

    /// Unmounts the view, abandoning any in-flight resolution.
    pub fn unmount(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        *self.lifecycle.mounted.lock() = false;
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl<T> Drop for MountedView<T> {
    fn drop(&mut self) {
        self.detach();
    }
}

impl<T: fmt::Debug> fmt::Debug for MountedView<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountedView")
            .field("state", &self.state())
            .field("mounted", &self.is_mounted())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreResult;
    use crate::identity::UserId;
    use crate::resolver::{ProfileRecord, ProfileStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    #[derive(Default)]
    struct CountingNavigator {
        calls: AtomicUsize,
        last: Mutex<Option<String>>,
    }

    impl Navigator for CountingNavigator {
        fn navigate(&self, destination: &str) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock() = Some(destination.to_string());
        }
    }

    struct FixedStore(&'static str);

    #[async_trait]
    impl ProfileStore for FixedStore {
        async fn fetch_profile(&self, user_id: &UserId) -> StoreResult<Option<ProfileRecord>> {
            Ok(Some(ProfileRecord::new(user_id.clone(), self.0)))
        }
    }

    struct GatedStore {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl ProfileStore for GatedStore {
        async fn fetch_profile(&self, user_id: &UserId) -> StoreResult<Option<ProfileRecord>> {
            self.gate.notified().await;
            Ok(Some(ProfileRecord::new(user_id.clone(), "receptionist")))
        }
    }

    /// Drops the mounted view when asked to navigate, like a router
    /// replacing the current page.
    #[derive(Default)]
    struct UnmountingRouter {
        view: Mutex<Option<MountedView<()>>>,
        calls: AtomicUsize,
        navigated: Notify,
    }

    impl Navigator for UnmountingRouter {
        fn navigate(&self, _destination: &str) {
            let view = self.view.lock().take();
            drop(view);
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.navigated.notify_one();
        }
    }

    fn resolver(role: &'static str) -> SessionRoleResolver {
        SessionRoleResolver::new(Arc::new(FixedStore(role)))
    }

    #[test]
    fn test_requirement_unknown_role_never_satisfied() {
        let registry = RoleRegistry::new();
        for req in [
            Requirement::permission(Permission::ViewDashboard),
            Requirement::all([]),
            Requirement::any([]),
            Requirement::roles([]),
        ] {
            assert!(!req.is_satisfied_by(&registry, None), "{req}");
        }
    }

    #[test]
    fn test_requirement_variants() {
        let registry = RoleRegistry::new();
        let any = Requirement::any([Permission::ViewFinance, Permission::ManageRooms]);
        assert!(any.is_satisfied_by(&registry, Some(Role::Receptionist)));
        assert!(!any.is_satisfied_by(&registry, Some(Role::Therapist)));

        let all = Requirement::all([Permission::ManagePatients, Permission::ManageSessions]);
        assert!(all.is_satisfied_by(&registry, Some(Role::Therapist)));
        assert!(!all.is_satisfied_by(&registry, Some(Role::Receptionist)));

        let roles = Requirement::roles([Role::Supervisor]);
        assert!(roles.is_satisfied_by(&registry, Some(Role::Supervisor)));
        assert!(!roles.is_satisfied_by(&registry, Some(Role::Administrator)));
    }

    #[test]
    fn test_requirement_display() {
        assert_eq!(
            Requirement::permission(Permission::ViewFinance).to_string(),
            "finance:view"
        );
        assert_eq!(
            Requirement::roles([Role::Administrator, Role::Accountant]).to_string(),
            "roles(admin, accountant)"
        );
    }

    #[test]
    fn test_decide_is_deterministic() {
        let guard = RouteGuard::new(Permission::ViewFinance);
        let identity = SessionIdentity::known("u", Role::Accountant);
        assert_eq!(guard.decide(&identity), GuardState::Authorized);
        assert_eq!(guard.decide(&identity), GuardState::Authorized);
        assert_eq!(
            guard.decide(&SessionIdentity::unknown()),
            GuardState::Unauthorized
        );
    }

    #[tokio::test]
    async fn test_check_redirects_to_default_route() {
        let guard = RouteGuard::new(Permission::ViewFinance);
        let session = Session::new("u-1");

        match guard.check(&resolver("receptionist"), Some(&session)).await {
            GuardOutcome::Redirect { to, identity } => {
                assert_eq!(to, "/");
                assert_eq!(identity.role(), Some(Role::Receptionist));
            }
            other => panic!("expected redirect, got {other:?}"),
        }

        let outcome = guard.check(&resolver("accountant"), Some(&session)).await;
        assert!(outcome.is_render());
    }

    #[tokio::test]
    async fn test_mount_unauthorized_redirects_once() {
        let navigator = Arc::new(CountingNavigator::default());
        let guard = RouteGuard::new(Permission::ViewFinance);

        let mut view = guard.mount(
            resolver("receptionist"),
            Some(Session::new("u-1")),
            navigator.clone(),
            "finance",
        );
        assert_eq!(view.settled().await, GuardState::Unauthorized);
        assert!(view.children().is_none());
        assert_eq!(navigator.calls.load(Ordering::SeqCst), 1);
        assert_eq!(navigator.last.lock().as_deref(), Some("/"));
    }

    #[tokio::test]
    async fn test_mount_authorized_renders_children() {
        let navigator = Arc::new(CountingNavigator::default());
        let guard = RouteGuard::new(Permission::ManagePatients);

        let mut view = guard.mount(
            resolver("admin"),
            Some(Session::new("u-1")),
            navigator.clone(),
            "patients",
        );
        assert_eq!(view.settled().await, GuardState::Authorized);
        assert_eq!(view.children(), Some(&"patients"));
        assert_eq!(view.identity().and_then(|i| i.role()), Some(Role::Administrator));
        assert_eq!(navigator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_mount_starts_loading() {
        let gate = Arc::new(Notify::new());
        let navigator = Arc::new(CountingNavigator::default());
        let guard = RouteGuard::new(Permission::ViewDashboard);

        let mut view = guard.mount(
            SessionRoleResolver::new(Arc::new(GatedStore { gate: gate.clone() })),
            Some(Session::new("u-1")),
            navigator.clone(),
            (),
        );
        assert_eq!(view.state(), GuardState::Loading);
        assert!(view.children().is_none());

        gate.notify_one();
        assert_eq!(view.settled().await, GuardState::Authorized);
    }

    #[tokio::test]
    async fn test_unmount_before_resolution_never_navigates() {
        let gate = Arc::new(Notify::new());
        let navigator = Arc::new(CountingNavigator::default());
        let guard = RouteGuard::new(Permission::ViewFinance);

        let view = guard.mount(
            SessionRoleResolver::new(Arc::new(GatedStore { gate: gate.clone() })),
            Some(Session::new("u-1")),
            navigator.clone(),
            (),
        );
        let mut watcher = view.subscribe();
        tokio::task::yield_now().await;
        view.unmount();

        gate.notify_one();
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        assert_eq!(navigator.calls.load(Ordering::SeqCst), 0);
        assert_eq!(watcher.borrow_and_update().state, GuardState::Loading);
    }

    #[tokio::test]
    async fn test_mount_without_session_redirects() {
        let navigator = Arc::new(CountingNavigator::default());
        let guard = RouteGuard::new(Permission::ViewDashboard).with_redirect("/login");

        let mut view = guard.mount(resolver("admin"), None, navigator.clone(), ());
        assert_eq!(view.settled().await, GuardState::Unauthorized);
        assert_eq!(navigator.last.lock().as_deref(), Some("/login"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_navigator_may_unmount_the_view() {
        let gate = Arc::new(Notify::new());
        let router = Arc::new(UnmountingRouter::default());
        let guard = RouteGuard::new(Permission::ViewFinance);

        let view = guard.mount(
            SessionRoleResolver::new(Arc::new(GatedStore { gate: gate.clone() })),
            Some(Session::new("u-1")),
            router.clone(),
            (),
        );
        let mut watcher = view.subscribe();
        *router.view.lock() = Some(view);

        gate.notify_one();
        tokio::time::timeout(std::time::Duration::from_secs(2), router.navigated.notified())
            .await
            .expect("navigation should complete");

        assert_eq!(router.calls.load(Ordering::SeqCst), 1);
        assert!(router.view.lock().is_none());
        assert_eq!(watcher.borrow_and_update().state, GuardState::Unauthorized);
    }
}
