// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stripe payment intents.

use std::time::Duration;

use async_trait::async_trait;
use conecta_vault::Credentials;
use serde_json::Value;

use crate::error::GatewayError;
use crate::gateway::{Endpoints, PaymentGateway, build_client, credential, send, string_at};
use crate::types::{GatewayOutcome, PaymentRequest, PaymentStatus, to_minor_units};

const API_ROOT: &str = "https://api.stripe.com";

pub struct StripeGateway {
    client: reqwest::Client,
    endpoints: Endpoints,
}

impl StripeGateway {
    pub fn new(timeout: Duration) -> Result<Self, GatewayError> {
        // Test and live mode share a host; the secret key selects the mode.
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

/// Stripe takes `application/x-www-form-urlencoded` bodies.
fn intent_form(request: &PaymentRequest) -> String {
    let mut pairs: Vec<(String, String)> = vec![
        ("amount".into(), to_minor_units(request.amount).to_string()),
        ("currency".into(), request.currency.to_lowercase()),
        ("description".into(), request.description.clone()),
        ("automatic_payment_methods[enabled]".into(), "true".into()),
        ("metadata[reference]".into(), request.reference.clone()),
        (
            "metadata[payment_transaction_id]".into(),
            request.payment_transaction_id.to_string(),
        ),
        ("metadata[business_id]".into(), request.business_id.to_string()),
    ];
    for (key, value) in &request.metadata {
        let value = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        pairs.push((format!("metadata[{key}]"), value));
    }
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn status_of(raw: &Value) -> PaymentStatus {
    match raw.get("status").and_then(Value::as_str) {
        Some("succeeded") => PaymentStatus::Approved,
        Some("canceled") => PaymentStatus::Failed,
        _ => PaymentStatus::Pending,
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    fn code(&self) -> &str {
        "stripe"
    }

    fn provider_code(&self) -> &str {
        "stripe_pay"
    }

    async fn create_payment(
        &self,
        credentials: &Credentials,
        request: &PaymentRequest,
    ) -> Result<GatewayOutcome, GatewayError> {
        let secret = credential(credentials, "secret_key")?;
        let url = format!("{}/v1/payment_intents", self.endpoints.base_for(credentials));

        let raw = send(
            "stripe",
            self.client
                .post(&url)
                .bearer_auth(secret)
                .header("Idempotency-Key", &request.correlation_id)
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(intent_form(request)),
        )
        .await?;

        let external_id = string_at(&raw, "/id")
            .ok_or_else(|| GatewayError::api("stripe answered without an intent id"))?;
        Ok(GatewayOutcome {
            status: status_of(&raw),
            external_id: Some(external_id),
            payment_url: None,
            raw,
        })
    }
}
