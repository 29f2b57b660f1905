// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use conecta_core::ConectaError;
use thiserror::Error;

/// Failures opening or sealing a credential envelope.
///
/// Messages never include key material or plaintext.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VaultError {
    #[error("ciphertext is {len} bytes, shorter than the {min}-byte nonce")]
    ShortCiphertext { len: usize, min: usize },

    #[error("decryption failed: wrong key or tampered ciphertext")]
    DecryptFailed,

    #[error("decrypted credentials are not a key/value object: {0}")]
    MalformedPayload(String),

    #[error("credential wrapper is malformed: {0}")]
    MalformedWrapper(String),

    #[error("encryption failed")]
    EncryptFailed,
}

impl From<VaultError> for ConectaError {
    fn from(err: VaultError) -> Self {
        ConectaError::Credentials(err.to_string())
    }
}
