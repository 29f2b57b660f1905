// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The process-wide encryption key.

use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

/// A 32-byte AES key, wiped on drop.
pub struct VaultKey(Zeroizing<[u8; 32]>);

impl VaultKey {
    /// Derives the key from configured material: shorter input is
    /// right-padded with zero bytes, longer input is truncated.
    pub fn from_material(material: &[u8]) -> Self {
        let mut key = Zeroizing::new([0u8; 32]);
        let len = material.len().min(32);
        key[..len].copy_from_slice(&material[..len]);
        Self(key)
    }

    pub fn from_secret(secret: &SecretString) -> Self {
        Self::from_material(secret.expose_secret().as_bytes())
    }

    pub(crate) fn bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("VaultKey([REDACTED])")
    }
}
