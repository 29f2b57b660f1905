// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Where provider credentials come from.
//!
//! Adapters ask a [`CredentialSource`] for the credentials of a provider
//! code on behalf of a business and never see how they are stored.

use std::sync::Arc;

use async_trait::async_trait;
use conecta_core::{ConectaError, IntegrationRepository};
use tracing::debug;

use crate::credentials::Credentials;
use crate::vault::CredentialVault;

#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Credentials for `type_code`, or `None` when this source has none.
    async fn credentials(
        &self,
        business_id: i64,
        type_code: &str,
    ) -> Result<Option<Credentials>, ConectaError>;

    /// Like [`credentials`](Self::credentials) but absence is an error.
    async fn require(&self, business_id: i64, type_code: &str) -> Result<Credentials, ConectaError> {
        self.credentials(business_id, type_code)
            .await?
            .ok_or_else(|| ConectaError::NotConfigured {
                business_id,
                what: format!("{type_code} credentials"),
            })
    }
}

/// Reads the wrapped envelope from the business's active integration.
pub struct BusinessCredentialSource {
    integrations: Arc<dyn IntegrationRepository>,
    vault: Arc<CredentialVault>,
}

impl BusinessCredentialSource {
    pub fn new(integrations: Arc<dyn IntegrationRepository>, vault: Arc<CredentialVault>) -> Self {
        Self {
            integrations,
            vault,
        }
    }
}

#[async_trait]
impl CredentialSource for BusinessCredentialSource {
    async fn credentials(
        &self,
        business_id: i64,
        type_code: &str,
    ) -> Result<Option<Credentials>, ConectaError> {
        let Some((integration, _)) = self
            .integrations
            .active_integration_by_code(business_id, type_code)
            .await?
        else {
            return Ok(None);
        };
        match &integration.credentials {
            Some(wrapper) if !wrapper.is_null() => {
                let creds = self.vault.decrypt_wrapped(wrapper)?;
                debug!(business_id, type_code, integration_id = integration.id, "opened business credentials");
                Ok(Some(creds))
            }
            _ => Ok(None),
        }
    }
}

/// Reads the raw envelope stored on the provider catalog entry.
pub struct PlatformCredentialSource {
    integrations: Arc<dyn IntegrationRepository>,
    vault: Arc<CredentialVault>,
}

impl PlatformCredentialSource {
    pub fn new(integrations: Arc<dyn IntegrationRepository>, vault: Arc<CredentialVault>) -> Self {
        Self {
            integrations,
            vault,
        }
    }
}

#[async_trait]
impl CredentialSource for PlatformCredentialSource {
    async fn credentials(
        &self,
        _business_id: i64,
        type_code: &str,
    ) -> Result<Option<Credentials>, ConectaError> {
        let Some(ty) = self.integrations.get_integration_type_by_code(type_code).await? else {
            return Ok(None);
        };
        match ty.platform_credentials.as_deref() {
            Some(envelope) if !envelope.is_empty() => {
                let creds = self.vault.decrypt(envelope)?;
                debug!(type_code, "opened platform credentials");
                Ok(Some(creds))
            }
            _ => Ok(None),
        }
    }
}

/// Tries each source in order and returns the first hit.
pub struct LayeredCredentialSource {
    sources: Vec<Arc<dyn CredentialSource>>,
}

impl LayeredCredentialSource {
    pub fn new(sources: Vec<Arc<dyn CredentialSource>>) -> Self {
        Self { sources }
    }

    /// Per-business credentials first, platform credentials as fallback.
    pub fn standard(
        integrations: Arc<dyn IntegrationRepository>,
        vault: Arc<CredentialVault>,
    ) -> Self {
        Self::new(vec![
            Arc::new(BusinessCredentialSource::new(integrations.clone(), vault.clone())),
            Arc::new(PlatformCredentialSource::new(integrations, vault)),
        ])
    }
}

#[async_trait]
impl CredentialSource for LayeredCredentialSource {
    async fn credentials(
        &self,
        business_id: i64,
        type_code: &str,
    ) -> Result<Option<Credentials>, ConectaError> {
        for source in &self.sources {
            if let Some(creds) = source.credentials(business_id, type_code).await? {
                return Ok(Some(creds));
            }
        }
        Ok(None)
    }
}
