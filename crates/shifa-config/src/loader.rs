// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration loading.
//!
//! # Loading Pipeline
//!
//! 1. Read the file and pick the format from its extension
//! 2. Resolve `${VAR}` and `${VAR:default}` placeholders
//! 3. Parse YAML, TOML or JSON
//! 4. Apply `SHIFA_*` environment overrides
//! 5. Resolve relative paths against the file's directory
//! 6. Decrypt `ENC:` secrets (when a master key is set)
//! 7. Validate
//!
//! # Environment Overrides
//!
//! ```text
//! SHIFA_SERVER_HOST=127.0.0.1
//! SHIFA_SERVER_PORT=9090
//! SHIFA_JWT_SECRET=...
//! SHIFA_BACKEND_ENABLED=true
//! SHIFA_BACKEND_URL=https://project.example.co
//! SHIFA_BACKEND_API_KEY=...
//! SHIFA_FALLBACK_ENABLED=false
//! SHIFA_FALLBACK_PATH=/var/lib/shifa/users.json
//! SHIFA_CHAT_KEY=...
//! SHIFA_LOG_LEVEL=debug
//! SHIFA_LOG_FORMAT=json
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::encryption::{Encryptor, KEY_LENGTH};
use crate::error::{ConfigError, ConfigResult};
use crate::schema::{LogFormat, LogLevel, SecretValue, ShifaConfig};

// =============================================================================
// ConfigLoader
// =============================================================================

/// Loads [`ShifaConfig`] from files or strings.
///
/// # Examples
///
/// ```no_run
/// use shifa_config::loader::ConfigLoader;
///
/// let config = ConfigLoader::new().load("shifa.yaml").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    base_path: Option<PathBuf>,
    env_prefix: String,
    resolve_env_vars: bool,
    resolve_paths: bool,
    env_override: Option<HashMap<String, String>>,
    encryption_key: Option<[u8; KEY_LENGTH]>,
}

impl ConfigLoader {
    /// Creates a loader reading the process environment with prefix `SHIFA`.
    pub fn new() -> Self {
        Self {
            base_path: None,
            env_prefix: "SHIFA".to_string(),
            resolve_env_vars: true,
            resolve_paths: true,
            env_override: None,
            encryption_key: None,
        }
    }

    /// Sets the base path for relative paths.
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Sets the environment variable prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Enables or disables placeholders and overrides.
    pub fn with_env_vars(mut self, enabled: bool) -> Self {
        self.resolve_env_vars = enabled;
        self
    }

    /// Enables or disables relative path resolution.
    pub fn with_path_resolution(mut self, enabled: bool) -> Self {
        self.resolve_paths = enabled;
        self
    }

    /// Reads variables from `vars` instead of the process environment.
    pub fn with_environment<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env_override = Some(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Sets the master key for `ENC:` secrets.
    pub fn with_encryption_key(mut self, key: [u8; KEY_LENGTH]) -> Self {
        self.encryption_key = Some(key);
        self
    }

    /// Loads configuration from a file.
    pub fn load(&self, path: impl AsRef<Path>) -> ConfigResult<ShifaConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let base_path = self.base_path.clone().unwrap_or_else(|| {
            path.parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
        });

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }
        let content = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let format = ConfigFormat::from_path(path)?;

        let content = if self.resolve_env_vars {
            self.resolve_env_placeholders(&content)
        } else {
            content
        };

        let mut config: ShifaConfig = parse_str(&content, format).map_err(|e| match e {
            ConfigError::Serialization { message } => ConfigError::parse(path, message),
            other => other,
        })?;

        if self.resolve_paths && config.fallback.path.is_relative() {
            config.fallback.path = base_path.join(&config.fallback.path);
        }

        self.finish(config)
    }

    /// Loads configuration from a string.
    pub fn load_from_str(&self, content: &str, format: ConfigFormat) -> ConfigResult<ShifaConfig> {
        let content = if self.resolve_env_vars {
            self.resolve_env_placeholders(content)
        } else {
            content.to_string()
        };
        let config = parse_str(&content, format)?;
        self.finish(config)
    }

    fn finish(&self, mut config: ShifaConfig) -> ConfigResult<ShifaConfig> {
        if self.resolve_env_vars {
            self.apply_env_overrides(&mut config)?;
        }
        self.decrypt_secrets(&mut config)?;
        config.validate()?;

        debug!(
            backend = config.backend.enabled,
            fallback = config.fallback.enabled,
            port = config.server.port,
            "Configuration loaded"
        );
        Ok(config)
    }

    fn var(&self, name: &str) -> Option<String> {
        match &self.env_override {
            Some(vars) => vars.get(name).cloned(),
            None => std::env::var(name).ok(),
        }
    }

    /// Resolves `${VAR}` and `${VAR:default}` placeholders.
    ///
    /// Unknown variables without a default are left in place.
    pub fn resolve_env_placeholders(&self, content: &str) -> String {
        let mut result = String::with_capacity(content.len());
        let mut rest = content;

        while let Some(start) = rest.find("${") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                result.push_str(&rest[start..]);
                return result;
            };

            let inner = &after[..end];
            let (name, default) = match inner.split_once(':') {
                Some((name, default)) => (name, Some(default)),
                None => (inner, None),
            };

            match (self.var(name), default) {
                (Some(value), _) => result.push_str(&value),
                (None, Some(default)) => result.push_str(default),
                (None, None) => {
                    warn!("Environment variable '{}' not found", name);
                    result.push_str(&rest[start..start + 2 + end + 1]);
                }
            }
            rest = &after[end + 1..];
        }

        result.push_str(rest);
        result
    }

    /// Applies `PREFIX_*` overrides.
    pub fn apply_env_overrides(&self, config: &mut ShifaConfig) -> ConfigResult<()> {
        let key = |suffix: &str| format!("{}_{}", self.env_prefix, suffix);

        if let Some(value) = self.var(&key("SERVER_HOST")) {
            config.server.host = value
                .parse()
                .map_err(|_| ConfigError::invalid_env_var(key("SERVER_HOST"), "expected IP address"))?;
        }
        if let Some(value) = self.var(&key("SERVER_PORT")) {
            config.server.port = value
                .parse()
                .map_err(|_| ConfigError::invalid_env_var(key("SERVER_PORT"), "expected valid port number"))?;
        }
        if let Some(value) = self.var(&key("JWT_SECRET")) {
            config.security.jwt.secret = Some(SecretValue::new(value));
        }
        if let Some(value) = self.var(&key("BACKEND_ENABLED")) {
            config.backend.enabled = parse_bool(&value);
        }
        if let Some(value) = self.var(&key("BACKEND_URL")) {
            config.backend.url = Some(value);
        }
        if let Some(value) = self.var(&key("BACKEND_API_KEY")) {
            config.backend.api_key = Some(SecretValue::new(value));
        }
        if let Some(value) = self.var(&key("FALLBACK_ENABLED")) {
            config.fallback.enabled = parse_bool(&value);
        }
        if let Some(value) = self.var(&key("FALLBACK_PATH")) {
            config.fallback.path = PathBuf::from(value);
        }
        if let Some(value) = self.var(&key("CHAT_KEY")) {
            config.chat.sealing_key = Some(SecretValue::new(value));
        }
        if let Some(value) = self.var(&key("LOG_LEVEL")) {
            config.logging.level = LogLevel::parse(&value)
                .ok_or_else(|| ConfigError::invalid_env_var(key("LOG_LEVEL"), "unknown level"))?;
        }
        if let Some(value) = self.var(&key("LOG_FORMAT")) {
            config.logging.format = LogFormat::parse(&value)
                .ok_or_else(|| ConfigError::invalid_env_var(key("LOG_FORMAT"), "unknown format"))?;
        }
        Ok(())
    }

    fn decrypt_secrets(&self, config: &mut ShifaConfig) -> ConfigResult<()> {
        let encryptor = self.encryption_key.map(Encryptor::new);

        for (field, secret) in config.secrets_mut() {
            if !secret.is_encrypted() {
                continue;
            }
            match &encryptor {
                Some(encryptor) => encryptor.decrypt_secret(secret)?,
                None => {
                    return Err(ConfigError::MissingEncryptionKey {
                        field: field.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ConfigFormat
// =============================================================================

/// Supported configuration formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML.
    Yaml,
    /// TOML.
    Toml,
    /// JSON.
    Json,
}

impl ConfigFormat {
    /// Picks the format from a file extension.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match ext.as_deref() {
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("json") => Ok(ConfigFormat::Json),
            Some(other) => Err(ConfigError::unsupported_format(other)),
            None => Err(ConfigError::unsupported_format("(no extension)")),
        }
    }

    /// File extension.
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Toml => "toml",
            ConfigFormat::Json => "json",
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn parse_str<T: DeserializeOwned>(content: &str, format: ConfigFormat) -> ConfigResult<T> {
    match format {
        ConfigFormat::Yaml => parse_yaml(content),
        ConfigFormat::Toml => {
            toml::from_str(content).map_err(|e| ConfigError::serialization(e.to_string()))
        }
        ConfigFormat::Json => {
            serde_json::from_str(content).map_err(|e| ConfigError::serialization(e.to_string()))
        }
    }
}

fn parse_yaml<T: DeserializeOwned>(content: &str) -> ConfigResult<T> {
    config::Config::builder()
        .add_source(config::File::from_str(content, config::FileFormat::Yaml))
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| ConfigError::serialization(e.to_string()))
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "on" | "enabled"
    )
}

/// Loads a file with default settings.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<ShifaConfig> {
    ConfigLoader::new().load(path)
}

/// Loads a string with default settings.
pub fn load_config_str(content: &str, format: ConfigFormat) -> ConfigResult<ShifaConfig> {
    ConfigLoader::new().load_from_str(content, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encryption::{generate_key, generate_key_base64};
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    const YAML: &str = r#"
server:
  port: 9000
  request_timeout: 10s
security:
  default_route: /home
backend:
  enabled: true
  url: https://project.example.co
  timeout: 2s
fallback:
  path: users.json
resolver:
  timeout: 1500ms
logging:
  level: debug
  format: json
"#;

    fn isolated() -> ConfigLoader {
        ConfigLoader::new().with_environment(Vec::<(String, String)>::new())
    }

    #[test]
    fn test_load_yaml_file() {
        let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
        file.write_all(YAML.as_bytes()).unwrap();

        let config = isolated().load(file.path()).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.request_timeout, Duration::from_secs(10));
        assert_eq!(config.security.default_route, "/home");
        assert!(config.backend.enabled);
        assert_eq!(config.resolver.timeout, Some(Duration::from_millis(1500)));
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Json);

        let parent = file.path().parent().unwrap();
        assert_eq!(config.fallback.path, parent.join("users.json"));
    }

    #[test]
    fn test_load_toml_and_json() {
        let toml = "[server]\nport = 7000\n\n[fallback]\nmin_password_length = 10\n";
        let config = isolated().load_from_str(toml, ConfigFormat::Toml).unwrap();
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.fallback.min_password_length, 10);

        let json = r#"{"audit":{"sink":"memory"}}"#;
        let config = isolated().load_from_str(json, ConfigFormat::Json).unwrap();
        assert_eq!(config.audit.sink, crate::schema::AuditSink::Memory);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = isolated()
            .load_from_str(r#"{"server":{"prot":1}}"#, ConfigFormat::Json)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Serialization { .. }));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = isolated()
            .load_from_str(r#"{"backend":{"enabled":true}}"#, ConfigFormat::Json)
            .unwrap_err();
        assert_eq!(err.field(), Some("backend.url"));
    }

    #[test]
    fn test_placeholders() {
        let loader = isolated().with_environment([("CLINIC_PORT", "8181")]);
        assert_eq!(
            loader.resolve_env_placeholders("port: ${CLINIC_PORT}"),
            "port: 8181"
        );
        assert_eq!(
            loader.resolve_env_placeholders("table: ${TABLE:profiles}!"),
            "table: profiles!"
        );
        assert_eq!(
            loader.resolve_env_placeholders("x: ${MISSING} y: ${OPEN"),
            "x: ${MISSING} y: ${OPEN"
        );
    }

    #[test]
    fn test_env_overrides() {
        let loader = ConfigLoader::new().with_environment([
            ("SHIFA_SERVER_PORT", "9443"),
            ("SHIFA_BACKEND_ENABLED", "yes"),
            ("SHIFA_BACKEND_URL", "http://localhost:54321"),
            ("SHIFA_LOG_LEVEL", "warn"),
        ]);
        let config = loader.load_from_str("{}", ConfigFormat::Json).unwrap();
        assert_eq!(config.server.port, 9443);
        assert!(config.backend.enabled);
        assert_eq!(config.backend.url.as_deref(), Some("http://localhost:54321"));
        assert_eq!(config.logging.level, LogLevel::Warn);
    }

    #[test]
    fn test_invalid_env_override() {
        let loader = ConfigLoader::new().with_environment([("SHIFA_SERVER_PORT", "eighty")]);
        let err = loader.load_from_str("{}", ConfigFormat::Json).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar { .. }));
    }

    #[test]
    fn test_encrypted_secrets() {
        let key = generate_key();
        let encryptor = Encryptor::new(key);
        let sealing_key = generate_key_base64();
        let json = format!(
            r#"{{"chat":{{"sealing_key":"{}"}}}}"#,
            encryptor.encrypt_with_prefix(&sealing_key).unwrap()
        );

        let err = isolated().load_from_str(&json, ConfigFormat::Json).unwrap_err();
        assert_eq!(err.field(), Some("chat.sealing_key"));

        let config = isolated()
            .with_encryption_key(key)
            .load_from_str(&json, ConfigFormat::Json)
            .unwrap();
        assert_eq!(
            config.chat.sealing_key.as_ref().map(|s| s.expose()),
            Some(sealing_key.as_str())
        );
    }

    #[test]
    fn test_missing_file() {
        let err = isolated().load("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn test_config_format_from_path() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("a.yml")).unwrap(),
            ConfigFormat::Yaml
        );
        assert!(ConfigFormat::from_path(Path::new("a.ini")).is_err());
        assert!(ConfigFormat::from_path(Path::new("noext")).is_err());
    }
}
