// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AES-256-GCM envelope: `nonce (12 bytes) || ciphertext || tag (16 bytes)`.

use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};

use crate::error::VaultError;

/// Bytes of nonce prefixed to every envelope.
pub const NONCE_SIZE: usize = NONCE_LEN;

/// Bytes of authentication tag appended to every envelope.
pub const TAG_SIZE: usize = 16;

fn aead_key(key: &[u8; 32]) -> Result<LessSafeKey, VaultError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key).map_err(|_| VaultError::EncryptFailed)?;
    Ok(LessSafeKey::new(unbound))
}

/// Encrypts under a fresh random nonce.
pub fn seal(key: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>, VaultError> {
    let mut nonce = [0u8; NONCE_SIZE];
    SystemRandom::new()
        .fill(&mut nonce)
        .map_err(|_| VaultError::EncryptFailed)?;
    seal_with_nonce(key, nonce, plaintext)
}

/// Encrypts under a caller-chosen nonce. A nonce must never be reused
/// with the same key.
pub fn seal_with_nonce(
    key: &[u8; 32],
    nonce: [u8; NONCE_SIZE],
    plaintext: &[u8],
) -> Result<Vec<u8>, VaultError> {
    let key = aead_key(key)?;
    let mut in_out = plaintext.to_vec();
    key.seal_in_place_append_tag(Nonce::assume_unique_for_key(nonce), Aad::empty(), &mut in_out)
        .map_err(|_| VaultError::EncryptFailed)?;

    let mut envelope = Vec::with_capacity(NONCE_SIZE + in_out.len());
    envelope.extend_from_slice(&nonce);
    envelope.extend_from_slice(&in_out);
    Ok(envelope)
}

/// Splits off the nonce and authenticates then decrypts the rest.
pub fn open(key: &[u8; 32], envelope: &[u8]) -> Result<Vec<u8>, VaultError> {
    if envelope.len() < NONCE_SIZE {
        return Err(VaultError::ShortCiphertext {
            len: envelope.len(),
            min: NONCE_SIZE,
        });
    }
    let (nonce_bytes, ciphertext) = envelope.split_at(NONCE_SIZE);
    let mut nonce = [0u8; NONCE_SIZE];
    nonce.copy_from_slice(nonce_bytes);

    let key = aead_key(key).map_err(|_| VaultError::DecryptFailed)?;
    let mut in_out = ciphertext.to_vec();
    let plaintext = key
        .open_in_place(Nonce::assume_unique_for_key(nonce), Aad::empty(), &mut in_out)
        .map_err(|_| VaultError::DecryptFailed)?;
    Ok(plaintext.to_vec())
}
