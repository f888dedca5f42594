// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `gen-key` and `encrypt` commands.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use shifa_config::encryption::{KEY_LENGTH, MASTER_KEY_ENV, decode_key, encode_base64};
use shifa_config::{Encryptor, generate_key};

use crate::cli::{Cli, EncryptArgs, GenKeyArgs, KeyFormat};
use crate::error::{BinError, BinResult};

/// Generates a random 256-bit key.
pub fn gen_key(_cli: &Cli, args: GenKeyArgs) -> BinResult<()> {
    let key = generate_key();
    let output = match args.format {
        KeyFormat::Base64 => encode_base64(&key),
        KeyFormat::Hex => hex::encode(key),
    };

    match &args.output {
        Some(path) => {
            fs::write(path, &output)
                .map_err(|e| BinError::io(format!("Failed to write key file: {e}")))?;
            eprintln!("Key written to: {}", path.display());
        }
        None => println!("{output}"),
    }

    eprintln!();
    eprintln!("Store this key securely. Use it to:");
    eprintln!("  - Encrypt secrets: shifa encrypt <value> -k <key>");
    eprintln!("  - Decrypt them at startup: export {MASTER_KEY_ENV}=<key>");
    eprintln!("  - Seal chat messages: chat.sealing_key: <key>");

    Ok(())
}

/// Encrypts a value into `ENC:` form for the configuration file.
pub fn encrypt(_cli: &Cli, args: EncryptArgs) -> BinResult<()> {
    let value = if args.stdin {
        let mut input = String::new();
        io::stdin()
            .read_to_string(&mut input)
            .map_err(|e| BinError::io(format!("Failed to read from stdin: {e}")))?;
        input.trim().to_string()
    } else {
        args.value.clone().ok_or_else(|| {
            BinError::invalid_argument("No value provided. Use --stdin or provide a value")
        })?
    };

    let key = load_key(args.key.as_deref(), args.key_file.as_ref())?;
    let encrypted = Encryptor::new(key).encrypt_with_prefix(&value)?;

    println!("{encrypted}");
    eprintln!();
    eprintln!("Use this value in your configuration file:");
    eprintln!("  secret: \"{encrypted}\"");

    Ok(())
}

fn load_key(key: Option<&str>, key_file: Option<&PathBuf>) -> BinResult<[u8; KEY_LENGTH]> {
    let encoded = match (key, key_file) {
        (Some(key), _) => key.to_string(),
        (None, Some(path)) => fs::read_to_string(path)
            .map_err(|e| BinError::io(format!("Failed to read key file: {e}")))?,
        (None, None) => {
            return Err(BinError::invalid_argument(format!(
                "No encryption key provided. Use -k or --key-file, or set {MASTER_KEY_ENV}"
            )));
        }
    };
    Ok(decode_key(encoded.trim())?)
}
