// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! `shifa` binary entry point.

use shifa_bin::cli::{Cli, Commands, LogFormat};
use shifa_bin::error::report_error_and_exit;
use shifa_bin::{commands, init_logging, runtime};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    // Logging settings in the file apply unless overridden on the command
    // line. A config that fails to load is reported by the command itself.
    let file_logging = match cli.effective_command() {
        Commands::Run(_) | Commands::Validate(_) => runtime::load_configuration(&cli.config)
            .ok()
            .map(|config| config.logging),
        _ => None,
    };
    let (level, format) = match &file_logging {
        Some(logging) => (logging.level.as_str(), LogFormat::from(logging.format)),
        None => ("info", LogFormat::Text),
    };

    if let Err(e) = init_logging(
        cli.effective_log_level(level),
        cli.log_format.unwrap_or(format),
    ) {
        report_error_and_exit(e);
    }

    if let Err(e) = commands::execute(cli).await {
        report_error_and_exit(e);
    }
}
