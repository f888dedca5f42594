// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Local fallback authentication store.
//!
//! Keeps user accounts in a JSON file so the service can sign users in
//! when the hosted backend is not configured or not reachable. The file is
//! a plain array of [`FallbackUser`] records, rewritten atomically on every
//! change.
//!
//! Passwords are stored as Argon2 PHC strings. Records written by older
//! deployments may hold the password in plain text; such a record still
//! signs in and is upgraded to a hash on the spot.
//!
//! Every account also carries a per-area `permissions` map. It mirrors the
//! grant table at sign-up time and is never consulted for access decisions.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use shifa_core::{
    Permission, ProfileRecord, ProfileStore, Role, RoleRegistry, Session, StoreError,
    StoreResult, UserId,
};

use crate::error::{AuthError, AuthResult};
use crate::subscription::AuthStateSubscription;

/// Minimum password length when none is configured.
pub const DEFAULT_MIN_PASSWORD_LENGTH: usize = 6;

// =============================================================================
// Records
// =============================================================================

/// A user account as persisted in the fallback file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackUser {
    /// User identifier.
    pub id: UserId,
    /// Lowercased email address.
    pub email: String,
    /// Argon2 PHC string, or plain text in records not yet upgraded.
    pub password: String,
    /// Display name.
    #[serde(default)]
    pub full_name: String,
    /// Raw role value.
    pub role: String,
    /// Legacy per-area permission mirror.
    #[serde(default)]
    pub permissions: BTreeMap<String, bool>,
    /// Deactivated accounts cannot sign in and resolve to no role.
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Creation time.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl FallbackUser {
    /// The recognized role, if any.
    pub fn role(&self) -> Option<Role> {
        Role::parse(&self.role)
    }

    /// The profile view of this account.
    pub fn profile(&self) -> ProfileRecord {
        ProfileRecord::new(self.id.clone(), self.role.clone())
            .with_full_name(self.full_name.clone())
            .with_active(self.is_active)
    }

    /// Returns `true` if the password is stored as a hash.
    pub fn is_hashed(&self) -> bool {
        PasswordHash::new(&self.password).is_ok()
    }
}

/// Sign-up request.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    /// Email address.
    pub email: String,
    /// Plain-text password.
    pub password: String,
    /// Display name.
    #[serde(default)]
    pub full_name: String,
    /// Requested role.
    pub role: Role,
}

impl NewUser {
    /// Creates a sign-up request.
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        full_name: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            full_name: full_name.into(),
            role,
        }
    }
}

/// An account whose legacy permission map disagrees with the grant table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyDrift {
    /// Account email.
    pub email: String,
    /// Account role.
    pub role: Role,
    /// Permissions where the stored map differs.
    pub permissions: Vec<Permission>,
}

// =============================================================================
// LocalFallbackStore
// =============================================================================

/// File-backed account store.
///
/// The store keeps a single current-session slot for single-user front
/// ends such as the CLI. [`sign_up`](Self::sign_up), [`sign_in`](Self::sign_in)
/// and [`sign_out`](Self::sign_out) update it; multi-user callers use
/// [`register`](Self::register) and [`authenticate`](Self::authenticate),
/// which leave it alone.
///
/// All methods are synchronous; password hashing is CPU bound, so async
/// callers should run them on a blocking thread. No lock is held while
/// hashing.
pub struct LocalFallbackStore {
    path: Option<PathBuf>,
    users: RwLock<Vec<FallbackUser>>,
    session: watch::Sender<Option<Session>>,
    registry: RoleRegistry,
    min_password_length: usize,
}

impl LocalFallbackStore {
    /// Creates a store that is never written to disk.
    pub fn in_memory() -> Self {
        Self::with_users(None, Vec::new())
    }

    /// Opens the store at `path`. A missing file yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let users = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str::<Vec<FallbackUser>>(&raw).map_err(|e| {
                    StoreError::decode(format!("{}: {e}", path.display()))
                })?
            }
        } else {
            Vec::new()
        };

        info!(path = %path.display(), users = users.len(), "Opened fallback store");
        Ok(Self::with_users(Some(path), users))
    }

    fn with_users(path: Option<PathBuf>, users: Vec<FallbackUser>) -> Self {
        let (session, _) = watch::channel(None);
        Self {
            path,
            users: RwLock::new(users),
            session,
            registry: RoleRegistry::new(),
            min_password_length: DEFAULT_MIN_PASSWORD_LENGTH,
        }
    }

    /// Sets the minimum password length for sign-up.
    pub fn with_min_password_length(mut self, len: usize) -> Self {
        self.min_password_length = len;
        self
    }

    /// Backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Snapshot of all accounts.
    pub fn users(&self) -> Vec<FallbackUser> {
        self.users.read().clone()
    }

    /// Number of accounts.
    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    /// Returns `true` if there are no accounts.
    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }

    /// Looks up an account by email, ignoring case.
    pub fn find_by_email(&self, email: &str) -> Option<FallbackUser> {
        let email = normalize_email(email);
        self.users.read().iter().find(|u| u.email == email).cloned()
    }

    /// Creates an account without touching the current-session slot.
    pub fn register(&self, request: NewUser) -> AuthResult<FallbackUser> {
        let email = normalize_email(&request.email);
        if !is_valid_email(&email) {
            return Err(AuthError::invalid_email(request.email));
        }
        if request.password.chars().count() < self.min_password_length {
            return Err(AuthError::WeakPassword {
                min_length: self.min_password_length,
            });
        }

        let hash = hash_password(&request.password)?;

        let user = {
            let mut users = self.users.write();
            if users.iter().any(|u| u.email == email) {
                return Err(AuthError::EmailTaken { email });
            }

            let user = FallbackUser {
                id: UserId::generate(),
                email,
                password: hash,
                full_name: request.full_name.trim().to_string(),
                role: request.role.as_str().to_string(),
                permissions: self.registry.legacy_permission_map(request.role),
                is_active: true,
                created_at: Utc::now(),
            };
            users.push(user.clone());
            if let Err(e) = self.persist(&users) {
                users.pop();
                return Err(e.into());
            }
            user
        };

        info!(user_id = %user.id, role = %user.role, "Account created");
        Ok(user)
    }

    /// Verifies credentials without touching the current-session slot.
    ///
    /// Hashing runs with no lock held. A plain-text record is upgraded only
    /// for an active account whose password still matches what was checked.
    pub fn authenticate(&self, email: &str, password: &str) -> AuthResult<FallbackUser> {
        let Some(user) = self.find_by_email(email) else {
            debug!("Sign-in for unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        let plain_text = match PasswordHash::new(&user.password) {
            Ok(parsed) => {
                if Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_err()
                {
                    return Err(AuthError::InvalidCredentials);
                }
                false
            }
            Err(_) if user.password == password => true,
            Err(_) => return Err(AuthError::InvalidCredentials),
        };

        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }
        if plain_text {
            self.upgrade_password(&user, password)?;
        }

        info!(user_id = %user.id, "Credentials verified");
        Ok(user)
    }

    /// Creates an account and signs it in.
    pub fn sign_up(&self, request: NewUser) -> AuthResult<Session> {
        let user = self.register(request)?;
        Ok(self.start_session(&user))
    }

    /// Verifies credentials and signs the account in.
    pub fn sign_in(&self, email: &str, password: &str) -> AuthResult<Session> {
        let user = self.authenticate(email, password)?;
        Ok(self.start_session(&user))
    }

    /// Ends the current session, if any.
    pub fn sign_out(&self) {
        if let Some(previous) = self.session.send_replace(None) {
            info!(user_id = %previous.user_id, "Signed out");
        }
    }

    /// The current session.
    pub fn current_session(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    /// Subscribes to sign-in and sign-out events.
    pub fn subscribe(&self) -> AuthStateSubscription {
        AuthStateSubscription::new(self.session.subscribe())
    }

    /// The recognized role of an active account.
    pub fn role_of(&self, user_id: &UserId) -> Option<Role> {
        self.users
            .read()
            .iter()
            .find(|u| &u.id == user_id && u.is_active)
            .and_then(FallbackUser::role)
    }

    /// Activates or deactivates an account.
    ///
    /// Deactivating the signed-in account also ends its session.
    pub fn set_active(&self, email: &str, active: bool) -> AuthResult<FallbackUser> {
        let email = normalize_email(email);
        let user = {
            let mut users = self.users.write();
            let user = users
                .iter_mut()
                .find(|u| u.email == email)
                .ok_or_else(|| AuthError::UserNotFound {
                    email: email.clone(),
                })?;
            let previous = user.is_active;
            user.is_active = active;
            let updated = user.clone();

            if let Err(e) = self.persist(&users) {
                if let Some(u) = users.iter_mut().find(|u| u.email == email) {
                    u.is_active = previous;
                }
                return Err(e.into());
            }
            updated
        };

        if !active {
            self.session
                .send_if_modified(|s| match s {
                    Some(current) if current.user_id == user.id => {
                        *s = None;
                        true
                    }
                    _ => false,
                });
        }

        info!(user_id = %user.id, active, "Account status changed");
        Ok(user)
    }

    /// Accounts whose legacy permission map disagrees with the grant table.
    pub fn legacy_drift(&self) -> Vec<LegacyDrift> {
        self.users
            .read()
            .iter()
            .filter_map(|u| {
                let role = u.role()?;
                let permissions = self.registry.legacy_permission_drift(role, &u.permissions);
                (!permissions.is_empty()).then(|| LegacyDrift {
                    email: u.email.clone(),
                    role,
                    permissions,
                })
            })
            .collect()
    }

    fn upgrade_password(&self, checked: &FallbackUser, password: &str) -> AuthResult<()> {
        let hash = hash_password(password)?;

        let mut users = self.users.write();
        let Some(index) = users
            .iter()
            .position(|u| u.id == checked.id && u.password == checked.password)
        else {
            debug!(user_id = %checked.id, "Password changed concurrently, upgrade skipped");
            return Ok(());
        };

        warn!(user_id = %checked.id, "Upgrading plain-text password");
        let previous = std::mem::replace(&mut users[index].password, hash);
        if let Err(e) = self.persist(&users) {
            users[index].password = previous;
            return Err(e.into());
        }
        Ok(())
    }

    fn start_session(&self, user: &FallbackUser) -> Session {
        let session = Session::new(user.id.clone()).with_email(user.email.clone());
        self.session.send_replace(Some(session.clone()));
        session
    }

    fn persist(&self, users: &[FallbackUser]) -> StoreResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(users)?;
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        debug!(path = %path.display(), users = users.len(), "Fallback store saved");
        Ok(())
    }
}

impl std::fmt::Debug for LocalFallbackStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalFallbackStore")
            .field("path", &self.path)
            .field("users", &self.users.read().len())
            .field("min_password_length", &self.min_password_length)
            .finish()
    }
}

#[async_trait]
impl ProfileStore for LocalFallbackStore {
    async fn fetch_profile(&self, user_id: &UserId) -> StoreResult<Option<ProfileRecord>> {
        Ok(self
            .users
            .read()
            .iter()
            .find(|u| &u.id == user_id)
            .map(FallbackUser::profile))
    }

    fn name(&self) -> &str {
        "fallback"
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

fn hash_password(password: &str) -> AuthResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::hashing(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn therapist() -> NewUser {
        NewUser::new("Dana@Clinic.org", "secret-pass", "Dana", Role::Therapist)
    }

    #[test]
    fn test_sign_up_hashes_and_mirrors_permissions() {
        let store = LocalFallbackStore::in_memory();
        let session = store.sign_up(therapist()).unwrap();

        let user = store.find_by_email("dana@clinic.org").unwrap();
        assert_eq!(user.email, "dana@clinic.org");
        assert!(user.is_hashed());
        assert_ne!(user.password, "secret-pass");
        assert_eq!(user.permissions.get("sessions"), Some(&true));
        assert_eq!(user.permissions.get("finance"), Some(&false));
        assert_eq!(store.current_session(), Some(session));
    }

    #[test]
    fn test_sign_up_rejects_bad_input() {
        let store = LocalFallbackStore::in_memory();
        assert!(matches!(
            store.sign_up(NewUser::new("nope", "secret-pass", "", Role::Patient)),
            Err(AuthError::InvalidEmail { .. })
        ));
        assert!(matches!(
            store.sign_up(NewUser::new("a@b.io", "123", "", Role::Patient)),
            Err(AuthError::WeakPassword { min_length: 6 })
        ));

        store.sign_up(therapist()).unwrap();
        assert!(matches!(
            store.sign_up(therapist()),
            Err(AuthError::EmailTaken { .. })
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_sign_in_and_out() {
        let store = LocalFallbackStore::in_memory();
        store.sign_up(therapist()).unwrap();
        store.sign_out();
        assert!(store.current_session().is_none());

        assert!(matches!(
            store.sign_in("dana@clinic.org", "wrong-pass"),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            store.sign_in("ghost@clinic.org", "secret-pass"),
            Err(AuthError::InvalidCredentials)
        ));

        let session = store.sign_in(" DANA@clinic.org ", "secret-pass").unwrap();
        assert_eq!(session.email.as_deref(), Some("dana@clinic.org"));
        assert_eq!(store.role_of(&session.user_id), Some(Role::Therapist));
    }

    #[test]
    fn test_deactivated_account_cannot_sign_in() {
        let store = LocalFallbackStore::in_memory();
        let session = store.sign_up(therapist()).unwrap();

        store.set_active("dana@clinic.org", false).unwrap();
        assert!(store.current_session().is_none());
        assert_eq!(store.role_of(&session.user_id), None);
        assert!(matches!(
            store.sign_in("dana@clinic.org", "secret-pass"),
            Err(AuthError::AccountDisabled)
        ));
        assert!(matches!(
            store.set_active("ghost@clinic.org", false),
            Err(AuthError::UserNotFound { .. })
        ));
    }

    #[test]
    fn test_persists_and_reopens() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("users.json");

        let store = LocalFallbackStore::open(&path).unwrap();
        assert!(store.is_empty());
        store.sign_up(therapist()).unwrap();
        assert!(path.exists());

        let reopened = LocalFallbackStore::open(&path).unwrap();
        assert_eq!(reopened.len(), 1);
        assert!(reopened.sign_in("dana@clinic.org", "secret-pass").is_ok());
    }

    #[test]
    fn test_plain_text_password_is_upgraded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");
        let legacy = serde_json::json!([{
            "id": "u-legacy",
            "email": "old@clinic.org",
            "password": "plain-pass",
            "full_name": "Old Timer",
            "role": "receptionist",
            "permissions": {"rooms": true},
            "created_at": "2024-01-01T00:00:00Z"
        }]);
        fs::write(&path, legacy.to_string()).unwrap();

        let store = LocalFallbackStore::open(&path).unwrap();
        assert!(!store.find_by_email("old@clinic.org").unwrap().is_hashed());
        store.sign_in("old@clinic.org", "plain-pass").unwrap();
        assert!(store.find_by_email("old@clinic.org").unwrap().is_hashed());

        let reopened = LocalFallbackStore::open(&path).unwrap();
        assert!(reopened.find_by_email("old@clinic.org").unwrap().is_hashed());
        assert!(reopened.sign_in("old@clinic.org", "plain-pass").is_ok());
    }

    #[test]
    fn test_corrupt_file_is_a_decode_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            LocalFallbackStore::open(&path),
            Err(StoreError::Decode { .. })
        ));
    }

    #[test]
    fn test_legacy_drift_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");
        let users = serde_json::json!([
            {"id": "u-1", "email": "a@clinic.org", "password": "x", "role": "patient",
             "permissions": {"dashboard": true, "chat": true, "finance": true}},
            {"id": "u-2", "email": "b@clinic.org", "password": "x", "role": "janitor"}
        ]);
        fs::write(&path, users.to_string()).unwrap();

        let drift = LocalFallbackStore::open(&path).unwrap().legacy_drift();
        assert_eq!(drift.len(), 1);
        assert_eq!(drift[0].role, Role::Patient);
        assert_eq!(drift[0].permissions, vec![Permission::ViewFinance]);
    }

    #[tokio::test]
    async fn test_profile_store_view() {
        let store = LocalFallbackStore::in_memory();
        let session = store.sign_up(therapist()).unwrap();

        let profile = store.fetch_profile(&session.user_id).await.unwrap().unwrap();
        assert_eq!(profile.role, "therapist");
        assert!(profile.is_active);
        assert!(store.fetch_profile(&UserId::new("nobody")).await.unwrap().is_none());
        assert_eq!(ProfileStore::name(&store), "fallback");
    }

    #[tokio::test]
    async fn test_subscription_sees_sign_in_and_out() {
        let store = LocalFallbackStore::in_memory();
        let mut sub = store.subscribe();

        store.sign_up(therapist()).unwrap();
        assert!(sub.next().await.unwrap().is_some());

        store.sign_out();
        assert_eq!(sub.next().await, Some(None));
    }

    fn write_legacy(path: &Path, active: bool) {
        let legacy = serde_json::json!([{
            "id": "u-legacy",
            "email": "old@clinic.org",
            "password": "plain-pass",
            "role": "receptionist",
            "is_active": active,
            "created_at": "2024-01-01T00:00:00Z"
        }]);
        fs::write(path, legacy.to_string()).unwrap();
    }

    #[test]
    fn test_register_and_authenticate_leave_session_slot_alone() {
        let store = LocalFallbackStore::in_memory();
        let created = store.register(therapist()).unwrap();
        assert!(store.current_session().is_none());

        let verified = store.authenticate("dana@clinic.org", "secret-pass").unwrap();
        assert_eq!(verified.id, created.id);
        assert!(store.current_session().is_none());
    }

    #[test]
    fn test_inactive_plain_text_account_is_not_rewritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");
        write_legacy(&path, false);
        let before = fs::read_to_string(&path).unwrap();

        let store = LocalFallbackStore::open(&path).unwrap();
        assert!(matches!(
            store.authenticate("old@clinic.org", "plain-pass"),
            Err(AuthError::AccountDisabled)
        ));

        assert_eq!(fs::read_to_string(&path).unwrap(), before);
        assert!(!store.find_by_email("old@clinic.org").unwrap().is_hashed());
    }

    #[test]
    fn test_concurrent_sign_ins_upgrade_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");
        write_legacy(&path, true);
        let store = LocalFallbackStore::open(&path).unwrap();

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| store.authenticate("old@clinic.org", "plain-pass")))
                .collect();
            for handle in handles {
                assert!(handle.join().unwrap().is_ok());
            }
        });

        let user = store.find_by_email("old@clinic.org").unwrap();
        assert!(user.is_hashed());
        let reopened = LocalFallbackStore::open(&path).unwrap();
        assert_eq!(reopened.find_by_email("old@clinic.org").unwrap(), user);
        assert!(reopened.authenticate("old@clinic.org", "plain-pass").is_ok());
    }

    #[test]
    fn test_profile_reads_proceed_while_hashing() {
        let store = LocalFallbackStore::in_memory();
        let created = store.register(therapist()).unwrap();

        std::thread::scope(|scope| {
            let signing_in = scope.spawn(|| {
                for _ in 0..3 {
                    store.authenticate("dana@clinic.org", "secret-pass").unwrap();
                }
            });
            while !signing_in.is_finished() {
                // Password checks never hold the account lock.
                let guard = store.users.try_read();
                assert!(guard.is_some(), "account lock held during password check");
                drop(guard);
                std::thread::yield_now();
            }
        });

        assert_eq!(store.role_of(&created.id), Some(Role::Therapist));
    }
}
