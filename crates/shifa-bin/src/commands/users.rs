// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `users` command.

use std::collections::BTreeMap;
use std::io::{self, BufRead};
use std::path::PathBuf;

use shifa_core::{Permission, Role};
use shifa_store::{LocalFallbackStore, NewUser};
use shifa_store::fallback::DEFAULT_MIN_PASSWORD_LENGTH;

use crate::cli::{Cli, OutputFormat, UserAddArgs, UserListArgs, UsersArgs, UsersCommand};
use crate::error::{BinError, BinResult};
use crate::runtime::load_configuration;

/// Manages accounts in the local fallback store file.
pub fn users(cli: &Cli, args: UsersArgs) -> BinResult<()> {
    let store = open_store(cli, args.store)?;

    match args.command {
        UsersCommand::Add(add) => add_user(&store, add),
        UsersCommand::List(list) => list_users(&store, list),
        UsersCommand::Deactivate(target) => {
            let user = store.set_active(&target.email, false)?;
            println!("Deactivated {}", user.email);
            Ok(())
        }
        UsersCommand::Activate(target) => {
            let user = store.set_active(&target.email, true)?;
            println!("Activated {}", user.email);
            Ok(())
        }
    }
}

/// Opens the store at `--store`, or at the configured `fallback.path`.
fn open_store(cli: &Cli, explicit: Option<PathBuf>) -> BinResult<LocalFallbackStore> {
    let (path, min_password_length) = match explicit {
        Some(path) => (path, DEFAULT_MIN_PASSWORD_LENGTH),
        None => {
            let config = load_configuration(&cli.config)?;
            if !config.fallback.enabled {
                tracing::warn!("fallback.enabled is false; accounts here are not used for sign-in");
            }
            (config.fallback.path, config.fallback.min_password_length)
        }
    };

    let store = LocalFallbackStore::open(&path)
        .map_err(|e| BinError::from(e).with_context(format!("Failed to open {}", path.display())))?;
    Ok(store.with_min_password_length(min_password_length))
}

fn add_user(store: &LocalFallbackStore, args: UserAddArgs) -> BinResult<()> {
    let role = Role::parse(&args.role).ok_or_else(|| {
        let known: Vec<&str> = Role::all().iter().map(|r| r.as_str()).collect();
        BinError::invalid_argument(format!(
            "unknown role '{}' (expected one of: {})",
            args.role,
            known.join(", ")
        ))
    })?;

    let password = match args.password {
        Some(password) => password,
        None => read_password(io::stdin().lock())?,
    };

    let user = store.register(NewUser::new(&args.email, password, &args.full_name, role))?;

    println!("Created {} as {} ({})", user.email, role, user.id);
    Ok(())
}

fn read_password(mut input: impl BufRead) -> BinResult<String> {
    let mut line = String::new();
    input
        .read_line(&mut line)
        .map_err(|e| BinError::io(format!("Failed to read password from stdin: {e}")))?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        return Err(BinError::invalid_argument("empty password on stdin"));
    }
    Ok(password)
}

fn list_users(store: &LocalFallbackStore, args: UserListArgs) -> BinResult<()> {
    let drift: BTreeMap<String, Vec<Permission>> = store
        .legacy_drift()
        .into_iter()
        .map(|d| (d.email, d.permissions))
        .collect();
    let users = store.users();

    match args.format {
        OutputFormat::Text => {
            if users.is_empty() {
                println!("No accounts");
                return Ok(());
            }
            println!("{:<32} {:<14} {:<8} {}", "EMAIL", "ROLE", "ACTIVE", "CREATED");
            for user in &users {
                let role = match user.role() {
                    Some(role) => role.as_str().to_string(),
                    None => format!("{}?", user.role),
                };
                println!(
                    "{:<32} {:<14} {:<8} {}{}",
                    user.email,
                    role,
                    if user.is_active { "yes" } else { "no" },
                    user.created_at.format("%Y-%m-%d"),
                    if drift.contains_key(&user.email) { "  (stale permission map)" } else { "" },
                );
            }
        }
        OutputFormat::Json => {
            let rows: Vec<serde_json::Value> = users
                .iter()
                .map(|user| {
                    serde_json::json!({
                        "id": user.id.as_str(),
                        "email": user.email,
                        "full_name": user.full_name,
                        "role": user.role().map(|r| r.as_str()),
                        "stored_role": user.role,
                        "active": user.is_active,
                        "created_at": user.created_at.to_rfc3339(),
                        "password_hashed": user.is_hashed(),
                        "permission_drift": drift
                            .get(&user.email)
                            .map(|ps| ps.iter().map(|p| p.as_str()).collect::<Vec<_>>())
                            .unwrap_or_default(),
                    })
                })
                .collect();
            let text = serde_json::to_string_pretty(&rows)
                .map_err(|e| BinError::runtime(format!("Failed to serialize output: {e}")))?;
            println!("{text}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    use crate::cli::UserEmailArgs;

    fn run(dir: &TempDir, command: UsersCommand) -> BinResult<()> {
        let cli = Cli::parse_from(["shifa"]);
        users(
            &cli,
            UsersArgs {
                store: Some(dir.path().join("users.json")),
                command,
            },
        )
    }

    fn add(email: &str, role: &str) -> UsersCommand {
        UsersCommand::Add(UserAddArgs {
            email: email.into(),
            role: role.into(),
            full_name: "Test User".into(),
            password: Some("correct-horse".into()),
            password_stdin: false,
        })
    }

    #[test]
    fn test_add_then_deactivate() {
        let dir = TempDir::new().unwrap();
        run(&dir, add("Nour@Clinic.example", "therapist")).unwrap();

        let store = LocalFallbackStore::open(dir.path().join("users.json")).unwrap();
        let user = store.find_by_email("nour@clinic.example").unwrap();
        assert_eq!(user.role(), Some(Role::Therapist));
        assert!(user.is_hashed());
        assert!(store.current_session().is_none());

        run(
            &dir,
            UsersCommand::Deactivate(UserEmailArgs {
                email: "nour@clinic.example".into(),
            }),
        )
        .unwrap();
        let store = LocalFallbackStore::open(dir.path().join("users.json")).unwrap();
        assert!(!store.find_by_email("nour@clinic.example").unwrap().is_active);
    }

    #[test]
    fn test_add_rejects_unknown_role() {
        let dir = TempDir::new().unwrap();
        let err = run(&dir, add("x@clinic.example", "janitor")).unwrap_err();
        assert!(matches!(err, BinError::InvalidArgument(_)));
    }

    #[test]
    fn test_add_duplicate_is_auth_error() {
        let dir = TempDir::new().unwrap();
        run(&dir, add("dup@clinic.example", "admin")).unwrap();
        let err = run(&dir, add("dup@clinic.example", "admin")).unwrap_err();
        assert!(matches!(err, BinError::Auth(_)));
    }

    #[test]
    fn test_deactivate_missing_account() {
        let dir = TempDir::new().unwrap();
        let err = run(
            &dir,
            UsersCommand::Deactivate(UserEmailArgs {
                email: "ghost@clinic.example".into(),
            }),
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 7);
    }

    #[test]
    fn test_read_password_strips_newline() {
        let password = read_password(io::Cursor::new("s3cret-pass\n")).unwrap();
        assert_eq!(password, "s3cret-pass");
        assert!(read_password(io::Cursor::new("\n")).is_err());
    }
}
