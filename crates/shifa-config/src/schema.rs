// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema.
//!
//! ```text
//! ShifaConfig
//! ├── server: ServerConfig        HTTP listener
//! ├── security: SecurityConfig    session tokens, default route
//! ├── backend: BackendConfig      hosted profile store
//! ├── fallback: FallbackConfig    local fallback auth store
//! ├── resolver: ResolverConfig    role resolution limits
//! ├── audit: AuditConfig          audit trail sink
//! ├── chat: ChatConfig            message sealing key
//! └── logging: LoggingConfig      level and format
//! ```

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::encryption::ENCRYPTED_PREFIX;
use crate::error::{ConfigError, ConfigResult};

// =============================================================================
// Constants
// =============================================================================

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default session token lifetime in seconds (8 hours, one clinic shift).
pub const DEFAULT_JWT_EXPIRATION_SECS: u64 = 28_800;

/// Minimum length of a plain-text JWT secret.
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Default minimum password length for fallback accounts.
pub const DEFAULT_MIN_PASSWORD_LENGTH: usize = 6;

// =============================================================================
// Top-Level Configuration
// =============================================================================

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShifaConfig {
    /// HTTP listener.
    #[serde(default)]
    pub server: ServerConfig,

    /// Session tokens and routing.
    #[serde(default)]
    pub security: SecurityConfig,

    /// Hosted profile store.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Local fallback auth store.
    #[serde(default)]
    pub fallback: FallbackConfig,

    /// Role resolution.
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Audit trail.
    #[serde(default)]
    pub audit: AuditConfig,

    /// Chat message sealing.
    #[serde(default)]
    pub chat: ChatConfig,

    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ShifaConfig {
    /// Validates every section.
    pub fn validate(&self) -> ConfigResult<()> {
        self.server.validate()?;
        self.security.validate()?;
        self.backend.validate()?;
        self.fallback.validate()?;
        self.resolver.validate()?;

        if !self.backend.enabled && !self.fallback.enabled {
            return Err(ConfigError::validation(
                "backend.enabled",
                "at least one of backend or fallback must be enabled",
            ));
        }
        Ok(())
    }

    /// Every secret in the configuration, with its dotted path.
    pub fn secrets_mut(&mut self) -> Vec<(&'static str, &mut SecretValue)> {
        let mut secrets = Vec::new();
        if let Some(s) = self.security.jwt.secret.as_mut() {
            secrets.push(("security.jwt.secret", s));
        }
        if let Some(s) = self.backend.api_key.as_mut() {
            secrets.push(("backend.api_key", s));
        }
        if let Some(s) = self.chat.sealing_key.as_mut() {
            secrets.push(("chat.sealing_key", s));
        }
        secrets
    }
}

// =============================================================================
// Server
// =============================================================================

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-request timeout.
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Allowed CORS origins. Empty allows none; `*` allows any.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout: default_request_timeout(),
            cors_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// The socket address to bind.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.port == 0 {
            return Err(ConfigError::validation("server.port", "must not be 0"));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::validation(
                "server.request_timeout",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Security
// =============================================================================

/// Session and routing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecurityConfig {
    /// Session token settings.
    #[serde(default)]
    pub jwt: JwtSettings,

    /// Route denied users are sent to.
    #[serde(default = "default_route")]
    pub default_route: String,
}

fn default_route() -> String {
    "/".to_string()
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            jwt: JwtSettings::default(),
            default_route: default_route(),
        }
    }
}

impl SecurityConfig {
    fn validate(&self) -> ConfigResult<()> {
        if !self.default_route.starts_with('/') {
            return Err(ConfigError::validation(
                "security.default_route",
                "must be an absolute route starting with '/'",
            ));
        }
        self.jwt.validate()
    }
}

/// Session token settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JwtSettings {
    /// HMAC secret. A random secret is generated at startup when absent.
    #[serde(default)]
    pub secret: Option<SecretValue>,

    /// Token issuer.
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// Token lifetime in seconds.
    #[serde(default = "default_jwt_expiration")]
    pub expiration_secs: u64,
}

fn default_issuer() -> String {
    "shifa".to_string()
}

fn default_jwt_expiration() -> u64 {
    DEFAULT_JWT_EXPIRATION_SECS
}

impl Default for JwtSettings {
    fn default() -> Self {
        Self {
            secret: None,
            issuer: default_issuer(),
            expiration_secs: default_jwt_expiration(),
        }
    }
}

impl JwtSettings {
    fn validate(&self) -> ConfigResult<()> {
        if self.expiration_secs == 0 {
            return Err(ConfigError::validation(
                "security.jwt.expiration_secs",
                "must be greater than zero",
            ));
        }
        if let Some(secret) = &self.secret {
            if !secret.is_encrypted() && secret.expose().len() < MIN_JWT_SECRET_LENGTH {
                return Err(ConfigError::validation(
                    "security.jwt.secret",
                    format!("must be at least {MIN_JWT_SECRET_LENGTH} characters"),
                ));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Profile Stores
// =============================================================================

/// Hosted profile store (PostgREST-compatible HTTP API).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Query the hosted store.
    #[serde(default)]
    pub enabled: bool,

    /// Base URL, e.g. `https://project.example.co`.
    #[serde(default)]
    pub url: Option<String>,

    /// API key sent as `apikey` and bearer token.
    #[serde(default)]
    pub api_key: Option<SecretValue>,

    /// Table holding user profiles.
    #[serde(default = "default_profiles_table")]
    pub profiles_table: String,

    /// Request timeout.
    #[serde(default = "default_backend_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

fn default_profiles_table() -> String {
    "profiles".to_string()
}

fn default_backend_timeout() -> Duration {
    Duration::from_secs(5)
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: None,
            api_key: None,
            profiles_table: default_profiles_table(),
            timeout: default_backend_timeout(),
        }
    }
}

impl BackendConfig {
    fn validate(&self) -> ConfigResult<()> {
        if !self.enabled {
            return Ok(());
        }
        match self.url.as_deref() {
            None | Some("") => {
                return Err(ConfigError::validation(
                    "backend.url",
                    "is required when the backend is enabled",
                ));
            }
            Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => {
                return Err(ConfigError::validation(
                    "backend.url",
                    "must start with 'http://' or 'https://'",
                ));
            }
            Some(_) => {}
        }
        if self.profiles_table.trim().is_empty() {
            return Err(ConfigError::validation(
                "backend.profiles_table",
                "cannot be empty",
            ));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::validation(
                "backend.timeout",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Local fallback auth store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FallbackConfig {
    /// Use the local store.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// JSON file holding the user records.
    #[serde(default = "default_fallback_path")]
    pub path: PathBuf,

    /// Minimum password length at sign-up.
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,
}

fn default_true() -> bool {
    true
}

fn default_fallback_path() -> PathBuf {
    PathBuf::from("data/users.json")
}

fn default_min_password_length() -> usize {
    DEFAULT_MIN_PASSWORD_LENGTH
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_fallback_path(),
            min_password_length: default_min_password_length(),
        }
    }
}

impl FallbackConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.enabled && self.path.as_os_str().is_empty() {
            return Err(ConfigError::validation("fallback.path", "cannot be empty"));
        }
        if self.min_password_length == 0 {
            return Err(ConfigError::validation(
                "fallback.min_password_length",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Role resolution limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolverConfig {
    /// Upper bound on one profile read. `None` waits indefinitely.
    #[serde(default = "default_resolver_timeout", with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

fn default_resolver_timeout() -> Option<Duration> {
    Some(Duration::from_secs(5))
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout: default_resolver_timeout(),
        }
    }
}

impl ResolverConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::validation(
                "resolver.timeout",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Audit, Chat, Logging
// =============================================================================

/// Audit trail settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Record audit entries.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Where entries go.
    #[serde(default)]
    pub sink: AuditSink,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sink: AuditSink::default(),
        }
    }
}

/// Audit entry destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSink {
    /// Structured log events on the `audit` target.
    #[default]
    Tracing,
    /// Process memory.
    Memory,
}

/// Chat settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatConfig {
    /// Base64 256-bit key used to seal chat messages.
    #[serde(default)]
    pub sealing_key: Option<SecretValue>,
}

/// Logging settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Minimum level.
    #[serde(default)]
    pub level: LogLevel,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace.
    Trace,
    /// Debug.
    Debug,
    /// Info.
    #[default]
    Info,
    /// Warn.
    Warn,
    /// Error.
    Error,
}

impl LogLevel {
    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Parses a level name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
    /// Single-line compact.
    Compact,
}

impl LogFormat {
    /// Parses a format name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Some(LogFormat::Text),
            "json" => Some(LogFormat::Json),
            "compact" => Some(LogFormat::Compact),
            _ => None,
        }
    }
}

// =============================================================================
// Secret Value
// =============================================================================

/// A secret that may be stored encrypted with the `ENC:` prefix.
///
/// `Debug` and `Display` never reveal the value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretValue(String);

impl SecretValue {
    /// Wraps a value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns `true` if the value is still encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.0.starts_with(ENCRYPTED_PREFIX)
    }

    /// The raw value, encrypted or not.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// The ciphertext without the prefix, if encrypted.
    pub fn encrypted_payload(&self) -> Option<&str> {
        self.0.strip_prefix(ENCRYPTED_PREFIX)
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretValue({self})")
    }
}

impl fmt::Display for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_encrypted() {
            f.write_str("ENC:***")
        } else {
            f.write_str("***")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ShifaConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.fallback.enabled);
        assert!(!config.backend.enabled);
        assert_eq!(config.security.default_route, "/");
        assert_eq!(config.server.socket_addr().port(), DEFAULT_PORT);
    }

    #[test]
    fn test_backend_requires_url() {
        let mut config = ShifaConfig::default();
        config.backend.enabled = true;
        let err = config.validate().unwrap_err();
        assert_eq!(err.field(), Some("backend.url"));

        config.backend.url = Some("ftp://example".into());
        assert_eq!(config.validate().unwrap_err().field(), Some("backend.url"));

        config.backend.url = Some("https://project.example.co".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_some_store_required() {
        let mut config = ShifaConfig::default();
        config.fallback.enabled = false;
        assert_eq!(
            config.validate().unwrap_err().field(),
            Some("backend.enabled")
        );
    }

    #[test]
    fn test_short_jwt_secret_rejected() {
        let mut config = ShifaConfig::default();
        config.security.jwt.secret = Some(SecretValue::new("short"));
        assert_eq!(
            config.validate().unwrap_err().field(),
            Some("security.jwt.secret")
        );

        config.security.jwt.secret = Some(SecretValue::new("ENC:opaque"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_route_must_be_absolute() {
        let mut config = ShifaConfig::default();
        config.security.default_route = "home".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_secret_value_is_redacted() {
        let secret = SecretValue::new("hunter2");
        assert_eq!(secret.to_string(), "***");
        assert!(!format!("{secret:?}").contains("hunter2"));
        assert_eq!(
            SecretValue::new("ENC:abc").encrypted_payload(),
            Some("abc")
        );
    }

    #[test]
    fn test_secrets_mut_lists_present_secrets() {
        let mut config = ShifaConfig::default();
        config.backend.api_key = Some(SecretValue::new("k"));
        config.chat.sealing_key = Some(SecretValue::new("c"));
        let names: Vec<_> = config.secrets_mut().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["backend.api_key", "chat.sealing_key"]);
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("loud"), None);
        assert_eq!(LogFormat::parse("json"), Some(LogFormat::Json));
    }
}
