// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Logging and tracing initialization.

use tracing::Level;
use tracing_subscriber::{
    EnvFilter, filter::Directive, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::cli::LogFormat;
use crate::error::{BinError, BinResult};

/// Noisy dependencies clamped regardless of the requested level.
const QUIET_TARGETS: &[&str] = &["hyper=warn", "tower=warn", "reqwest=warn", "h2=warn"];

// =============================================================================
// Logging Initialization
// =============================================================================

/// Initializes the global subscriber.
///
/// `RUST_LOG` takes precedence over `level` when set. Audit events are
/// emitted on the `audit` target and follow the same filter.
pub fn init_logging(level: &str, format: LogFormat) -> BinResult<()> {
    let filter = build_filter(level)?;

    let result = match format {
        LogFormat::Text => {
            let is_terminal = std::io::IsTerminal::is_terminal(&std::io::stdout());
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(true).with_ansi(is_terminal))
                .try_init()
        }
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init(),
        LogFormat::Compact => {
            let is_terminal = std::io::IsTerminal::is_terminal(&std::io::stdout());
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .compact()
                        .with_target(false)
                        .with_ansi(is_terminal),
                )
                .try_init()
        }
    };

    result.map_err(|e| BinError::init(format!("Failed to initialize logging: {e}")))
}

fn build_filter(level: &str) -> BinResult<EnvFilter> {
    let base = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(parse_level(level).to_string().to_lowercase()))
        .map_err(|e| BinError::init(format!("Invalid log filter: {e}")))?;

    QUIET_TARGETS.iter().try_fold(base, |filter, target| {
        let directive: Directive = target
            .parse()
            .map_err(|e| BinError::init(format!("Invalid log directive {target}: {e}")))?;
        Ok(filter.add_directive(directive))
    })
}

// =============================================================================
// Log Level Parsing
// =============================================================================

/// Parses a log level string into a `Level`, defaulting to `INFO`.
pub fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}
