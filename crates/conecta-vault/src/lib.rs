// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential vault for provider integrations.
//!
//! Provider credentials are stored as AES-256-GCM envelopes keyed by a
//! single process key. This crate opens them on demand and resolves which
//! envelope applies to a business: its own integration first, the
//! platform-wide catalog entry otherwise.

pub mod credentials;
pub mod crypto;
pub mod error;
pub mod key;
pub mod source;
pub mod vault;

pub use credentials::Credentials;
pub use error::VaultError;
pub use key::VaultKey;
pub use source::{
    BusinessCredentialSource, CredentialSource, LayeredCredentialSource, PlatformCredentialSource,
};
pub use vault::CredentialVault;
