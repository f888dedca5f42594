// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Configuration Integration Tests
//!
//! ## Test Categories
//!
//! - `test_parse_*`: File formats and defaults
//! - `test_env_*`: Placeholders and `SHIFA_*` overrides
//! - `test_secret_*`: Encrypted secrets
//! - `test_validation_*`: Rejected configurations

use std::net::IpAddr;
use std::time::Duration;

use shifa_config::encryption::encode_base64;
use shifa_config::schema::{AuditSink, LogFormat};
use shifa_config::{
    ConfigError, ConfigFormat, ConfigLoader, Encryptor, MessageSealer, SecretValue, generate_key,
    load_config_str,
};
use shifa_tests::prelude::*;

/// A loader that never reads the process environment.
fn isolated() -> ConfigLoader {
    ConfigLoader::new().with_environment(Vec::<(String, String)>::new())
}

// =============================================================================
// Parsing Tests
// =============================================================================

#[test]
fn test_parse_yaml_file_resolves_fallback_path() {
    init_test_logging();
    let dir = temp_test_dir("shifa-config-");
    let path = ConfigFixtures::write(dir.path(), "shifa.yaml", ConfigFixtures::local_only_yaml());

    let config = isolated().load(&path).unwrap();

    assert_eq!(config.server.host, "127.0.0.1".parse::<IpAddr>().unwrap());
    assert_eq!(config.server.port, 8089);
    assert_eq!(config.fallback.path, dir.path().join("data/users.json"));
    assert_eq!(config.fallback.min_password_length, 8);
    assert_eq!(config.resolver.timeout, Some(Duration::from_secs(2)));
    assert_eq!(config.audit.sink, AuditSink::Memory);
    assert_eq!(config.logging.format, LogFormat::Json);
    assert!(!config.backend.enabled);
}

#[test]
fn test_parse_toml_and_json() {
    let toml = r#"
[server]
port = 9001

[security]
default_route = "/dashboard"
"#;
    let config = isolated().load_from_str(toml, ConfigFormat::Toml).unwrap();
    assert_eq!(config.server.port, 9001);
    assert_eq!(config.security.default_route, "/dashboard");

    let json = r#"{"server": {"port": 9002}, "fallback": {"path": "u.json"}}"#;
    let config = isolated().load_from_str(json, ConfigFormat::Json).unwrap();
    assert_eq!(config.server.port, 9002);
    assert!(config.fallback.enabled);
}

#[test]
fn test_parse_empty_document_uses_defaults() {
    let config = load_config_str("{}", ConfigFormat::Json).unwrap();
    assert_eq!(config.security.default_route, DEFAULT_ROUTE);
    assert!(config.fallback.enabled);
    assert!(config.security.jwt.secret.is_none());
}

#[test]
fn test_parse_unknown_extension_is_rejected() {
    let dir = temp_test_dir("shifa-config-");
    let path = ConfigFixtures::write(dir.path(), "shifa.ini", "port=1");
    let err = isolated().load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedFormat { .. }), "{err}");
}

// =============================================================================
// Environment Tests
// =============================================================================

#[test]
fn test_env_placeholders_and_defaults() {
    let content = ConfigFixtures::hosted_yaml("https://project.example.co");
    let config = ConfigLoader::new()
        .with_environment([("SHIFA_TEST_API_KEY", "anon-key")])
        .load_from_str(&content, ConfigFormat::Yaml)
        .unwrap();

    assert!(config.backend.enabled);
    assert_eq!(config.backend.url.as_deref(), Some("https://project.example.co"));
    assert_eq!(
        config.backend.api_key.as_ref().map(SecretValue::expose),
        Some("anon-key")
    );
    assert_eq!(
        config.security.jwt.secret.as_ref().map(SecretValue::expose),
        Some(TEST_JWT_SECRET)
    );
    assert_eq!(config.backend.timeout, Duration::from_secs(3));
}

#[test]
fn test_env_overrides_win_over_file() {
    let config = ConfigLoader::new()
        .with_environment([
            ("SHIFA_SERVER_PORT", "7000"),
            ("SHIFA_FALLBACK_ENABLED", "false"),
            ("SHIFA_BACKEND_ENABLED", "true"),
            ("SHIFA_BACKEND_URL", "http://127.0.0.1:54321"),
            ("SHIFA_LOG_LEVEL", "warn"),
        ])
        .load_from_str(ConfigFixtures::local_only_yaml(), ConfigFormat::Yaml)
        .unwrap();

    assert_eq!(config.server.port, 7000);
    assert!(!config.fallback.enabled);
    assert!(config.backend.enabled);
    assert_eq!(config.logging.level.as_str(), "warn");
}

#[test]
fn test_env_invalid_override_is_reported() {
    let err = ConfigLoader::new()
        .with_environment([("SHIFA_SERVER_PORT", "not-a-port")])
        .load_from_str("{}", ConfigFormat::Json)
        .unwrap_err();
    assert!(err.to_string().contains("SHIFA_SERVER_PORT"), "{err}");
}

// =============================================================================
// Secret Tests
// =============================================================================

#[test]
fn test_secret_encrypted_values_are_decrypted() {
    let key = generate_key();
    let encryptor = Encryptor::new(key);
    let jwt = encryptor.encrypt_with_prefix(TEST_JWT_SECRET).unwrap();
    let chat_key = encode_base64(&generate_key());
    let sealed_chat_key = encryptor.encrypt_with_prefix(&chat_key).unwrap();

    let content = format!(
        "security:\n  jwt:\n    secret: \"{jwt}\"\nchat:\n  sealing_key: \"{sealed_chat_key}\"\n"
    );
    let config = isolated()
        .with_encryption_key(key)
        .load_from_str(&content, ConfigFormat::Yaml)
        .unwrap();

    assert_eq!(
        config.security.jwt.secret.as_ref().map(SecretValue::expose),
        Some(TEST_JWT_SECRET)
    );
    let sealing_key = config.chat.sealing_key.as_ref().unwrap();
    assert_eq!(sealing_key.expose(), chat_key);

    let sealer = MessageSealer::from_secret(sealing_key).unwrap();
    let sealed = sealer.seal("room 4 is free at noon").unwrap();
    assert!(MessageSealer::is_sealed(&sealed));
    assert_eq!(sealer.open(&sealed).unwrap(), "room 4 is free at noon");
}

#[test]
fn test_secret_without_key_is_an_error() {
    let sealed = Encryptor::new(generate_key())
        .encrypt_with_prefix("whatever-the-secret-is-it-is-long-enough")
        .unwrap();
    let content = format!("security:\n  jwt:\n    secret: \"{sealed}\"\n");

    let err = isolated()
        .load_from_str(&content, ConfigFormat::Yaml)
        .unwrap_err();
    assert!(
        matches!(err, ConfigError::MissingEncryptionKey { ref field } if field == "security.jwt.secret"),
        "{err}"
    );
}

#[test]
fn test_secret_wrong_key_fails_to_decrypt() {
    let sealed = Encryptor::new(generate_key())
        .encrypt_with_prefix("whatever-the-secret-is-it-is-long-enough")
        .unwrap();
    let content = format!("security:\n  jwt:\n    secret: \"{sealed}\"\n");

    let result = isolated()
        .with_encryption_key(generate_key())
        .load_from_str(&content, ConfigFormat::Yaml);
    assert!(result.is_err());
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_validation_requires_a_profile_store() {
    let err = isolated()
        .load_from_str("fallback:\n  enabled: false\n", ConfigFormat::Yaml)
        .unwrap_err();
    assert!(matches!(err, ConfigError::Validation { .. }), "{err}");
}

#[test]
fn test_validation_backend_needs_url() {
    let err = isolated()
        .load_from_str("backend:\n  enabled: true\n", ConfigFormat::Yaml)
        .unwrap_err();
    match err {
        ConfigError::Validation { field, .. } => assert_eq!(field, "backend.url"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_validation_default_route_must_be_absolute() {
    let err = isolated()
        .load_from_str("security:\n  default_route: home\n", ConfigFormat::Yaml)
        .unwrap_err();
    assert!(err.to_string().contains("security.default_route"), "{err}");
}

#[test]
fn test_validation_short_jwt_secret() {
    let err = isolated()
        .load_from_str("security:\n  jwt:\n    secret: short\n", ConfigFormat::Yaml)
        .unwrap_err();
    assert!(err.to_string().contains("security.jwt.secret"), "{err}");
}
