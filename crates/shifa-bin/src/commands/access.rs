// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `access` command.

use shifa_core::{Permission, Role, RoleRegistry};

use crate::cli::{AccessArgs, Cli, OutputFormat};
use crate::error::{BinError, BinResult};

/// Prints the grant matrix, one role's grants, one permission's holders,
/// or a single decision.
///
/// A single decision that denies access returns [`BinError::AccessDenied`]
/// so the process exits non-zero. Unrecognised role names are treated as
/// the unknown role and are denied everything.
pub fn access(_cli: &Cli, args: AccessArgs) -> BinResult<()> {
    let registry = RoleRegistry::new();
    let permission = args
        .permission
        .as_deref()
        .map(parse_permission)
        .transpose()?;

    match (args.role.as_deref(), permission) {
        (Some(role_name), Some(permission)) => {
            check(&registry, role_name, permission, args.format)
        }
        (Some(role_name), None) => {
            let role = Role::parse(role_name);
            let granted = registry.permissions_for(role).names();
            match args.format {
                OutputFormat::Text => {
                    println!("{}:", role_label(role_name, role));
                    if granted.is_empty() {
                        println!("  (no permissions)");
                    }
                    for name in &granted {
                        println!("  {name}");
                    }
                }
                OutputFormat::Json => print_json(&serde_json::json!({
                    "role": role.map(|r| r.as_str()),
                    "permissions": granted,
                }))?,
            }
            Ok(())
        }
        (None, Some(permission)) => {
            let roles: Vec<&str> = registry
                .roles_with(permission)
                .iter()
                .map(|r| r.as_str())
                .collect();
            match args.format {
                OutputFormat::Text => {
                    println!("{permission}:");
                    for role in &roles {
                        println!("  {role}");
                    }
                }
                OutputFormat::Json => print_json(&serde_json::json!({
                    "permission": permission.as_str(),
                    "roles": roles,
                }))?,
            }
            Ok(())
        }
        (None, None) => {
            match args.format {
                OutputFormat::Text => print!("{}", render_matrix(&registry)),
                OutputFormat::Json => {
                    let rows: serde_json::Map<String, serde_json::Value> = registry
                        .matrix()
                        .into_iter()
                        .map(|(role, set)| (role.as_str().to_string(), serde_json::json!(set.names())))
                        .collect();
                    print_json(&serde_json::Value::Object(rows))?;
                }
            }
            Ok(())
        }
    }
}

fn check(
    registry: &RoleRegistry,
    role_name: &str,
    permission: Permission,
    format: OutputFormat,
) -> BinResult<()> {
    let role = Role::parse(role_name);
    let granted = registry.has_permission(role, permission);

    match format {
        OutputFormat::Text => println!(
            "{} {} {}",
            role_label(role_name, role),
            if granted { "has" } else { "lacks" },
            permission
        ),
        OutputFormat::Json => print_json(&serde_json::json!({
            "role": role.map(|r| r.as_str()),
            "permission": permission.as_str(),
            "granted": granted,
        }))?,
    }

    if granted {
        Ok(())
    } else {
        Err(BinError::AccessDenied {
            role: role.map_or("unknown", |r| r.as_str()).to_string(),
            permission: permission.as_str().to_string(),
        })
    }
}

fn parse_permission(name: &str) -> BinResult<Permission> {
    Permission::parse(name).ok_or_else(|| {
        let known: Vec<&str> = Permission::all().iter().map(|p| p.as_str()).collect();
        BinError::invalid_argument(format!(
            "unknown permission '{name}' (expected one of: {})",
            known.join(", ")
        ))
    })
}

fn role_label(name: &str, role: Option<Role>) -> String {
    match role {
        Some(role) => role.as_str().to_string(),
        None => format!("{name} (unknown role)"),
    }
}

/// Renders the grant table with one row per role and one column per
/// permission.
pub(crate) fn render_matrix(registry: &RoleRegistry) -> String {
    let width = Role::all()
        .iter()
        .map(|r| r.as_str().len())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    out.push_str(&format!("{:width$}", ""));
    for permission in Permission::all() {
        out.push_str(&format!("  {}", permission.as_str()));
    }
    out.push('\n');

    for (role, set) in registry.matrix() {
        out.push_str(&format!("{:width$}", role.as_str()));
        for permission in Permission::all() {
            let mark = if set.contains(*permission) { "✓" } else { "·" };
            out.push_str(&format!("  {:^w$}", mark, w = permission.as_str().len()));
        }
        out.push('\n');
    }
    out
}

fn print_json(value: &serde_json::Value) -> BinResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| BinError::runtime(format!("Failed to serialize output: {e}")))?;
    println!("{text}");
    Ok(())
}
