// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Which carrier a business ships with.

use std::sync::Arc;

use conecta_core::{ConectaError, IntegrationCategory, Storage};
use serde::Serialize;
use tracing::debug;

/// The active shipping integration of a business.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarrierInfo {
    pub integration_id: i64,
    pub integration_type_id: i64,
    pub provider_code: String,
    /// Effective URL: the sandbox one when the integration is in testing.
    pub base_url: String,
    pub is_testing: bool,
    pub base_url_test: Option<String>,
}

#[derive(Clone)]
pub struct CarrierResolver {
    storage: Arc<dyn Storage>,
}

impl CarrierResolver {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Resolves the carrier of `business_id`.
    ///
    /// With several active shipping integrations of different types the
    /// most recently updated one wins.
    pub async fn resolve(&self, business_id: i64) -> Result<CarrierInfo, ConectaError> {
        let active = self
            .storage
            .active_integrations_by_category(business_id, IntegrationCategory::Shipping)
            .await?;
        let Some((integration, ty)) = active.into_iter().next() else {
            let business = match self.storage.get_business(business_id).await? {
                Some(b) => b.name,
                None => business_id.to_string(),
            };
            return Err(ConectaError::NoActiveCarrier { business });
        };

        let sandbox = ty.base_url_test.as_deref().filter(|url| !url.is_empty());
        let base_url = match (integration.is_testing, sandbox) {
            (true, Some(url)) => url.to_string(),
            _ => ty.base_url.clone(),
        };
        debug!(
            business_id,
            provider = %ty.code,
            integration_id = integration.id,
            is_testing = integration.is_testing,
            "resolved carrier"
        );
        Ok(CarrierInfo {
            integration_id: integration.id,
            integration_type_id: ty.id,
            provider_code: ty.code,
            base_url,
            is_testing: integration.is_testing,
            base_url_test: ty.base_url_test,
        })
    }
}
