// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use shifa_api::GUARDED_VIEWS;
use shifa_config::schema::AuditSink;
use shifa_config::{SecretValue, ShifaConfig};

use crate::cli::{Cli, OutputFormat, ValidateArgs};
use crate::error::{BinError, BinResult};
use crate::runtime::load_configuration;

const REDACTED: &str = "********";

/// Loads and validates the configuration, then reports a summary.
pub fn validate(cli: &Cli, args: ValidateArgs) -> BinResult<()> {
    let config_path = &cli.config;

    if !config_path.exists() {
        return Err(BinError::config(format!(
            "Configuration file not found: {}",
            config_path.display()
        )));
    }

    let config = load_configuration(config_path)?;
    let warnings = collect_warnings(&config);

    match args.format {
        OutputFormat::Text => {
            println!("✓ Configuration is valid: {}", config_path.display());
            println!();
            println!("Summary:");
            println!("  Listen: {}", config.server.socket_addr());
            println!("  Default route: {}", config.security.default_route);
            println!(
                "  Hosted store: {}",
                match (config.backend.enabled, config.backend.url.as_deref()) {
                    (true, Some(url)) => url,
                    _ => "disabled",
                }
            );
            println!(
                "  Fallback store: {}",
                if config.fallback.enabled {
                    config.fallback.path.display().to_string()
                } else {
                    "disabled".to_string()
                }
            );
            println!("  Audit: {}", audit_label(&config));
            println!(
                "  Chat: {}",
                if config.chat.sealing_key.is_some() { "enabled" } else { "disabled" }
            );

            if !warnings.is_empty() {
                println!();
                println!("Warnings:");
                for warning in &warnings {
                    println!("  ⚠ {}", warning);
                }
            }

            if args.show_config {
                println!();
                println!("Parsed configuration (secrets redacted):");
                println!("{}", to_json(&redacted(&config))?);
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "valid": true,
                "config_path": config_path.display().to_string(),
                "summary": {
                    "listen": config.server.socket_addr().to_string(),
                    "default_route": config.security.default_route,
                    "backend_enabled": config.backend.enabled,
                    "fallback_enabled": config.fallback.enabled,
                    "audit": audit_label(&config),
                    "chat_enabled": config.chat.sealing_key.is_some(),
                },
                "warnings": warnings,
                "config": if args.show_config { Some(redacted(&config)) } else { None },
            });
            println!("{}", to_json(&output)?);
        }
    }

    if args.strict && !warnings.is_empty() {
        return Err(BinError::config(format!(
            "Strict mode: {} warning(s) found",
            warnings.len()
        )));
    }

    Ok(())
}

/// Settings that load fine but likely need attention.
pub(crate) fn collect_warnings(config: &ShifaConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.security.jwt.secret.is_none() {
        warnings.push(
            "No security.jwt.secret configured; a random secret is used and sessions end on restart"
                .to_string(),
        );
    }

    let route = config.security.default_route.as_str();
    if let Some((_, permission)) = GUARDED_VIEWS.iter().find(|(path, _)| *path == route) {
        warnings.push(format!(
            "security.default_route {route} is itself guarded by {permission}; denied users without it will loop"
        ));
    }

    if config.backend.enabled && config.backend.api_key.is_none() {
        warnings.push("backend.api_key is not set; the hosted store may reject requests".to_string());
    }

    if !config.fallback.enabled {
        warnings.push("Fallback store disabled; sign-up and sign-in are unavailable".to_string());
    } else if let Some(parent) = config.fallback.path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            warnings.push(format!(
                "Fallback store directory does not exist and will be created: {}",
                parent.display()
            ));
        }
    }

    if config.resolver.timeout.is_none() {
        warnings.push("resolver.timeout is unset; a stalled profile read blocks guarded views".to_string());
    }

    if config.audit.enabled && config.audit.sink == AuditSink::Memory {
        warnings.push("Audit sink is memory; entries are lost on restart".to_string());
    }

    warnings
}

fn audit_label(config: &ShifaConfig) -> &'static str {
    match (config.audit.enabled, config.audit.sink) {
        (false, _) => "disabled",
        (true, AuditSink::Tracing) => "tracing",
        (true, AuditSink::Memory) => "memory",
    }
}

fn redacted(config: &ShifaConfig) -> ShifaConfig {
    let mut copy = config.clone();
    for (_, secret) in copy.secrets_mut() {
        *secret = SecretValue::new(REDACTED);
    }
    copy
}

fn to_json<T: serde::Serialize>(value: &T) -> BinResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| BinError::runtime(format!("Failed to serialize output: {e}")))
}
