// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential envelopes to and from key/value maps.
//!
//! Two storage shapes exist. Per-tenant credentials sit in a JSON column as
//! `{"encrypted": "<base64 envelope>"}`; platform credentials are the raw
//! envelope bytes. Both decrypt to a JSON object.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Map, Value};

use crate::credentials::Credentials;
use crate::crypto;
use crate::error::VaultError;
use crate::key::VaultKey;

/// Name of the wrapper field holding the base64 envelope.
pub const WRAPPER_FIELD: &str = "encrypted";

/// Opens and seals credential envelopes with the process key.
#[derive(Debug)]
pub struct CredentialVault {
    key: VaultKey,
}

impl CredentialVault {
    pub fn new(key: VaultKey) -> Self {
        Self { key }
    }

    /// Decrypts a raw envelope into a credential map.
    pub fn decrypt(&self, envelope: &[u8]) -> Result<Credentials, VaultError> {
        let plaintext = zeroize::Zeroizing::new(crypto::open(self.key.bytes(), envelope)?);
        let value: Value = serde_json::from_slice(&plaintext)
            .map_err(|e| VaultError::MalformedPayload(format!("invalid JSON at column {}", e.column())))?;
        match value {
            Value::Object(map) => Ok(Credentials::new(map)),
            other => Err(VaultError::MalformedPayload(format!(
                "expected object, found {}",
                json_kind(&other)
            ))),
        }
    }

    /// Strips the `{"encrypted": ...}` wrapper and decrypts.
    pub fn decrypt_wrapped(&self, wrapper: &Value) -> Result<Credentials, VaultError> {
        let encoded = wrapper
            .get(WRAPPER_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                VaultError::MalformedWrapper(format!("missing string field `{WRAPPER_FIELD}`"))
            })?;
        let envelope = BASE64
            .decode(encoded)
            .map_err(|e| VaultError::MalformedWrapper(format!("invalid base64: {e}")))?;
        self.decrypt(&envelope)
    }

    /// Encrypts a credential map into a raw envelope.
    pub fn encrypt(&self, credentials: &Map<String, Value>) -> Result<Vec<u8>, VaultError> {
        let plaintext = zeroize::Zeroizing::new(
            serde_json::to_vec(credentials).map_err(|_| VaultError::EncryptFailed)?,
        );
        crypto::seal(self.key.bytes(), &plaintext)
    }

    /// Encrypts a credential map into the per-tenant wrapper.
    pub fn encrypt_wrapped(&self, credentials: &Map<String, Value>) -> Result<Value, VaultError> {
        let envelope = self.encrypt(credentials)?;
        let mut wrapper = Map::new();
        wrapper.insert(WRAPPER_FIELD.to_string(), Value::String(BASE64.encode(envelope)));
        Ok(Value::Object(wrapper))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
