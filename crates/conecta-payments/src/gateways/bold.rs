// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bold payment links.

use std::time::Duration;

use async_trait::async_trait;
use conecta_vault::Credentials;
use serde_json::json;

use crate::error::GatewayError;
use crate::gateway::{Endpoints, PaymentGateway, build_client, credential, send, string_at};
use crate::types::{GatewayOutcome, PaymentRequest, PaymentStatus};

const API_ROOT: &str = "https://integrations.api.bold.co";

pub struct BoldGateway {
    client: reqwest::Client,
    endpoints: Endpoints,
}

impl BoldGateway {
    pub fn new(timeout: Duration) -> Result<Self, GatewayError> {
        // Bold serves both environments from one host; the key decides.
        Ok(Self {
            client: build_client(timeout)?,
            endpoints: Endpoints::single(API_ROOT),
        })
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }
}

#[async_trait]
impl PaymentGateway for BoldGateway {
    fn code(&self) -> &str {
        "bold"
    }

    fn provider_code(&self) -> &str {
        "bold_pay"
    }

    async fn create_payment(
        &self,
        credentials: &Credentials,
        request: &PaymentRequest,
    ) -> Result<GatewayOutcome, GatewayError> {
        let api_key = credential(credentials, "api_key")?;
        let url = format!("{}/online/link/v1", self.endpoints.base_for(credentials));
        let body = json!({
            "amount_type": "CLOSE",
            "amount": {
                "currency": request.currency,
                "total_amount": request.amount,
                "tip_amount": 0,
            },
            "reference": request.reference,
            "description": request.description,
        });

        let raw = send(
            "bold",
            self.client
                .post(&url)
                .header("Authorization", format!("x-api-key {api_key}"))
                .json(&body),
        )
        .await?;

        if let Some(errors) = raw.get("errors").and_then(|e| e.as_array()).filter(|e| !e.is_empty()) {
            return Err(GatewayError::api(format!(
                "bold rejected the link: {}",
                serde_json::Value::Array(errors.clone())
            )));
        }
        let external_id = string_at(&raw, "/payload/payment_link");
        let payment_url = string_at(&raw, "/payload/url");
        if external_id.is_none() {
            return Err(GatewayError::api("bold answered without a payment link"));
        }
        Ok(GatewayOutcome {
            status: PaymentStatus::Pending,
            external_id,
            payment_url,
            raw,
        })
    }
}
