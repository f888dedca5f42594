// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing and command definitions.
//!
//! - `run`: Start the HTTP service (default)
//! - `validate`: Validate the configuration file
//! - `version`: Show version information
//! - `access`: Inspect the grant table
//! - `users`: Manage local fallback accounts
//! - `gen-key`: Generate an encryption key
//! - `encrypt`: Encrypt a secret value

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

// =============================================================================
// Main CLI Structure
// =============================================================================

/// Shifa Care access service
///
/// Role-based access control for the clinic management system: session
/// tokens, role resolution against the profile store, guarded views and
/// per-role navigation.
#[derive(Parser, Debug)]
#[command(
    name = "shifa",
    author = "Sylvex <contact@sylvex.io>",
    version = shifa_core::VERSION,
    about = "Shifa Care access service",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "shifa.yaml",
        env = "SHIFA_CONFIG",
        global = true
    )]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error). Defaults to the
    /// configuration file's `logging.level`.
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Log format (text, json, compact). Defaults to the configuration
    /// file's `logging.format`.
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Enable quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

// =============================================================================
// Subcommands
// =============================================================================

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the HTTP service
    ///
    /// This is the default command when no subcommand is specified.
    Run(RunArgs),

    /// Validate the configuration file
    ///
    /// Parses and validates the configuration without starting the service.
    Validate(ValidateArgs),

    /// Show version information
    Version,

    /// Inspect the grant table
    ///
    /// Without arguments, prints the full role/permission matrix. With
    /// `--role` and `--permission`, prints the decision and exits non-zero
    /// when access is denied.
    Access(AccessArgs),

    /// Manage local fallback accounts
    Users(UsersArgs),

    /// Generate a new encryption key
    ///
    /// Generates a 256-bit key usable as the master key for `ENC:` secrets
    /// or as the chat sealing key.
    #[command(name = "gen-key")]
    GenKey(GenKeyArgs),

    /// Encrypt a secret value
    ///
    /// The output can be used in configuration files with the ENC: prefix.
    Encrypt(EncryptArgs),
}

// =============================================================================
// Command Arguments
// =============================================================================

/// Arguments for the `run` command.
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Override the configured bind address
    #[arg(long)]
    pub host: Option<IpAddr>,

    /// Override the configured port
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Arguments for the `validate` command.
#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Show parsed configuration after validation
    #[arg(short, long)]
    pub show_config: bool,

    /// Output format for validation results
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Strict mode: treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for the `access` command.
#[derive(Args, Debug, Clone, Default)]
pub struct AccessArgs {
    /// Role to check (admin, supervisor, accountant, therapist, receptionist, patient)
    #[arg(short, long)]
    pub role: Option<String>,

    /// Permission to check, e.g. `finance:view` or `view_finance`
    #[arg(short, long)]
    pub permission: Option<String>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the `users` command.
#[derive(Args, Debug, Clone)]
pub struct UsersArgs {
    /// Account store file. Defaults to the configured `fallback.path`.
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Account operation
    #[command(subcommand)]
    pub command: UsersCommand,
}

/// Account operations.
#[derive(Subcommand, Debug, Clone)]
pub enum UsersCommand {
    /// Create an account
    Add(UserAddArgs),

    /// List accounts
    List(UserListArgs),

    /// Deactivate an account so it can no longer sign in
    Deactivate(UserEmailArgs),

    /// Reactivate a deactivated account
    Activate(UserEmailArgs),
}

/// Arguments for `users add`.
#[derive(Args, Debug, Clone)]
pub struct UserAddArgs {
    /// Email address
    pub email: String,

    /// Role (admin, supervisor, accountant, therapist, receptionist, patient)
    #[arg(short, long)]
    pub role: String,

    /// Display name
    #[arg(short = 'n', long, default_value = "")]
    pub full_name: String,

    /// Password
    #[arg(long, env = "SHIFA_USER_PASSWORD", required_unless_present = "password_stdin")]
    pub password: Option<String>,

    /// Read the password from stdin
    #[arg(long, conflicts_with = "password")]
    pub password_stdin: bool,
}

/// Arguments for `users list`.
#[derive(Args, Debug, Clone, Default)]
pub struct UserListArgs {
    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// An account selected by email.
#[derive(Args, Debug, Clone)]
pub struct UserEmailArgs {
    /// Email address
    pub email: String,
}

/// Arguments for the `gen-key` command.
#[derive(Args, Debug, Clone)]
pub struct GenKeyArgs {
    /// Output format for the key
    #[arg(short, long, default_value = "base64")]
    pub format: KeyFormat,

    /// Output file path (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the `encrypt` command.
#[derive(Args, Debug, Clone)]
pub struct EncryptArgs {
    /// Value to encrypt
    #[arg(required_unless_present = "stdin")]
    pub value: Option<String>,

    /// Read value from stdin
    #[arg(long)]
    pub stdin: bool,

    /// Encryption key (base64 encoded)
    #[arg(short, long, env = "SHIFA_MASTER_KEY")]
    pub key: Option<String>,

    /// Key file path
    #[arg(long, conflicts_with = "key")]
    pub key_file: Option<PathBuf>,
}

// =============================================================================
// Enums
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for structured logging
    Json,
    /// Compact format for minimal output
    Compact,
}

impl From<shifa_config::schema::LogFormat> for LogFormat {
    fn from(format: shifa_config::schema::LogFormat) -> Self {
        match format {
            shifa_config::schema::LogFormat::Text => LogFormat::Text,
            shifa_config::schema::LogFormat::Json => LogFormat::Json,
            shifa_config::schema::LogFormat::Compact => LogFormat::Compact,
        }
    }
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for programmatic parsing
    Json,
}

/// Encryption key output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum KeyFormat {
    /// Base64 encoded
    #[default]
    Base64,
    /// Hexadecimal encoded
    Hex,
}

// =============================================================================
// Helper Methods
// =============================================================================

impl Cli {
    /// Parse CLI arguments from the command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective command, defaulting to `Run` if none specified.
    pub fn effective_command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Run(RunArgs::default()))
    }

    /// Check if verbose logging is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose && !self.quiet
    }

    /// Get the effective log level based on flags, then `--log-level`, then
    /// `configured`.
    pub fn effective_log_level<'a>(&'a self, configured: &'a str) -> &'a str {
        if self.quiet {
            "warn"
        } else if self.verbose {
            "debug"
        } else {
            self.log_level.as_deref().unwrap_or(configured)
        }
    }
}

impl Default for ValidateArgs {
    fn default() -> Self {
        Self {
            show_config: false,
            format: OutputFormat::Text,
            strict: false,
        }
    }
}

impl Default for GenKeyArgs {
    fn default() -> Self {
        Self {
            format: KeyFormat::Base64,
            output: None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
