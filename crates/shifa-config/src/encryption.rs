// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! AES-256-GCM encryption for configuration secrets and chat messages.
//!
//! Encrypted values share one format:
//!
//! ```text
//! ENC:<base64(nonce[12] || ciphertext || tag[16])>
//! ```
//!
//! [`Encryptor`] decrypts `ENC:` secrets in configuration files.
//! [`MessageSealer`] seals chat message bodies with a key kept outside the
//! message store; a sealed body cannot be read or altered without it.
//!
//! # Examples
//!
//! ```
//! use shifa_config::encryption::{MessageSealer, generate_key};
//!
//! let sealer = MessageSealer::new(generate_key());
//! let sealed = sealer.seal("Session moved to 14:00").unwrap();
//! assert!(sealed.starts_with("ENC:"));
//! assert_eq!(sealer.open(&sealed).unwrap(), "Session moved to 14:00");
//! ```

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng, rand_core::RngCore},
};
use base64::{Engine, engine::general_purpose::STANDARD};

use crate::error::{ConfigError, ConfigResult};
use crate::schema::SecretValue;

// =============================================================================
// Constants
// =============================================================================

/// Prefix marking an encrypted value.
pub const ENCRYPTED_PREFIX: &str = "ENC:";

/// Key length in bytes (256 bits).
pub const KEY_LENGTH: usize = 32;

/// Nonce length in bytes (96 bits).
pub const NONCE_LENGTH: usize = 12;

/// Authentication tag length in bytes (128 bits).
pub const TAG_LENGTH: usize = 16;

/// Environment variable holding the configuration master key.
pub const MASTER_KEY_ENV: &str = "SHIFA_MASTER_KEY";

// =============================================================================
// Encryptor
// =============================================================================

/// AES-256-GCM cipher over a fixed key.
#[derive(Clone)]
pub struct Encryptor {
    cipher: Aes256Gcm,
}

impl Encryptor {
    /// Creates an encryptor from a raw key.
    pub fn new(key: [u8; KEY_LENGTH]) -> Self {
        let key = Key::<Aes256Gcm>::from_slice(&key);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    /// Creates an encryptor from a base64 key.
    pub fn from_base64(key_base64: &str) -> ConfigResult<Self> {
        Ok(Self::new(decode_key(key_base64)?))
    }

    /// Creates an encryptor from the base64 key in `env_var`.
    pub fn from_env(env_var: &str) -> ConfigResult<Self> {
        let key = std::env::var(env_var).map_err(|_| ConfigError::env_var_not_found(env_var))?;
        Self::from_base64(&key)
    }

    /// Encrypts `plaintext` into base64 without the prefix.
    pub fn encrypt(&self, plaintext: &str) -> ConfigResult<String> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| ConfigError::encryption_failed(e.to_string()))?;

        let mut combined = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        combined.extend_from_slice(&nonce);
        combined.extend_from_slice(&ciphertext);
        Ok(encode_base64(&combined))
    }

    /// Decrypts base64 ciphertext without the prefix.
    pub fn decrypt(&self, ciphertext_base64: &str) -> ConfigResult<String> {
        let combined = decode_base64(ciphertext_base64)
            .map_err(|e| ConfigError::decryption_failed(format!("invalid base64: {e}")))?;

        if combined.len() < NONCE_LENGTH + TAG_LENGTH {
            return Err(ConfigError::decryption_failed("ciphertext too short"));
        }

        let (nonce, ciphertext) = combined.split_at(NONCE_LENGTH);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| ConfigError::decryption_failed("authentication failed"))?;

        String::from_utf8(plaintext)
            .map_err(|e| ConfigError::decryption_failed(format!("invalid UTF-8: {e}")))
    }

    /// Encrypts and adds the `ENC:` prefix.
    pub fn encrypt_with_prefix(&self, plaintext: &str) -> ConfigResult<String> {
        Ok(format!("{ENCRYPTED_PREFIX}{}", self.encrypt(plaintext)?))
    }

    /// Decrypts `ENC:` values and passes anything else through.
    pub fn decrypt_if_encrypted(&self, value: &str) -> ConfigResult<String> {
        match value.strip_prefix(ENCRYPTED_PREFIX) {
            Some(payload) => self.decrypt(payload),
            None => Ok(value.to_string()),
        }
    }

    /// Decrypts a secret in place if it is encrypted.
    pub fn decrypt_secret(&self, secret: &mut SecretValue) -> ConfigResult<()> {
        if let Some(payload) = secret.encrypted_payload() {
            *secret = SecretValue::new(self.decrypt(payload)?);
        }
        Ok(())
    }
}

impl std::fmt::Debug for Encryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encryptor")
            .field("cipher", &"[REDACTED]")
            .finish()
    }
}

// =============================================================================
// MessageSealer
// =============================================================================

/// Seals chat message bodies.
///
/// Every seal uses a fresh random nonce, so sealing the same text twice
/// gives different output.
#[derive(Debug, Clone)]
pub struct MessageSealer {
    encryptor: Encryptor,
}

impl MessageSealer {
    /// Creates a sealer over a raw key.
    pub fn new(key: [u8; KEY_LENGTH]) -> Self {
        Self {
            encryptor: Encryptor::new(key),
        }
    }

    /// Creates a sealer from a base64 key.
    pub fn from_base64(key_base64: &str) -> ConfigResult<Self> {
        Ok(Self::new(decode_key(key_base64)?))
    }

    /// Creates a sealer from a configured secret. The secret must already be
    /// decrypted.
    pub fn from_secret(secret: &SecretValue) -> ConfigResult<Self> {
        if secret.is_encrypted() {
            return Err(ConfigError::MissingEncryptionKey {
                field: "chat.sealing_key".to_string(),
            });
        }
        Self::from_base64(secret.expose())
    }

    /// Seals a message body.
    pub fn seal(&self, body: &str) -> ConfigResult<String> {
        self.encryptor.encrypt_with_prefix(body)
    }

    /// Opens a sealed body. Unsealed or tampered input is rejected.
    pub fn open(&self, sealed: &str) -> ConfigResult<String> {
        let payload = sealed
            .strip_prefix(ENCRYPTED_PREFIX)
            .ok_or_else(|| ConfigError::decryption_failed("message is not sealed"))?;
        self.encryptor.decrypt(payload)
    }

    /// Returns `true` if `value` carries the sealed prefix.
    pub fn is_sealed(value: &str) -> bool {
        value.starts_with(ENCRYPTED_PREFIX)
    }
}

// =============================================================================
// Keys and Base64
// =============================================================================

/// Generates a random 256-bit key.
pub fn generate_key() -> [u8; KEY_LENGTH] {
    let mut key = [0u8; KEY_LENGTH];
    OsRng.fill_bytes(&mut key);
    key
}

/// Generates a random key encoded as base64.
pub fn generate_key_base64() -> String {
    encode_base64(&generate_key())
}

/// Decodes and length-checks a base64 key.
pub fn decode_key(key_base64: &str) -> ConfigResult<[u8; KEY_LENGTH]> {
    let bytes = decode_base64(key_base64)
        .map_err(|e| ConfigError::invalid_encryption_key(format!("invalid base64: {e}")))?;

    <[u8; KEY_LENGTH]>::try_from(bytes.as_slice()).map_err(|_| {
        ConfigError::invalid_encryption_key(format!(
            "expected {KEY_LENGTH} bytes, got {}",
            bytes.len()
        ))
    })
}

/// Encodes bytes as standard base64.
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes standard base64, ignoring surrounding whitespace.
pub fn decode_base64(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(input.trim())
}
