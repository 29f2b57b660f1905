// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! EnvioClick REST client.

use std::time::Duration;

use async_trait::async_trait;
use conecta_core::ConectaError;
use serde_json::{Map, Value, json};
use tracing::debug;

use super::{CarrierClient, CarrierContext};

pub const PROVIDER_CODE: &str = "envioclick";

#[derive(Debug, Clone)]
pub struct EnvioClickClient {
    client: reqwest::Client,
}

impl EnvioClickClient {
    pub fn new(timeout: Duration) -> Result<Self, ConectaError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConectaError::ProviderUnavailable {
                provider: PROVIDER_CODE.into(),
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self { client })
    }

    async fn post(&self, ctx: &CarrierContext, path: &str, body: &Value) -> Result<Value, ConectaError> {
        let api_key = ctx.credentials.require("api_key")?;
        let url = format!("{}/{}", ctx.base_url.trim_end_matches('/'), path);
        debug!(business_id = ctx.business_id, is_test = ctx.is_test, path, "calling EnvioClick");

        let response = self
            .client
            .post(&url)
            .header("Authorization", api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| ConectaError::ProviderUnavailable {
                provider: PROVIDER_CODE.into(),
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if status.is_server_error() {
            return Err(ConectaError::ProviderUnavailable {
                provider: PROVIDER_CODE.into(),
                message: format!("API returned {status}: {text}"),
                source: None,
            });
        }
        let parsed: Value = serde_json::from_str(&text).unwrap_or(Value::String(text.clone()));
        if !status.is_success() {
            return Err(ConectaError::ProviderRejected {
                provider: PROVIDER_CODE.into(),
                message: api_error_message(&parsed).unwrap_or_else(|| format!("API returned {status}")),
                code: Some(status.as_u16().to_string()),
            });
        }
        if parsed.get("status").and_then(Value::as_str) == Some("ERROR") {
            return Err(ConectaError::ProviderRejected {
                provider: PROVIDER_CODE.into(),
                message: api_error_message(&parsed).unwrap_or_else(|| "request rejected".into()),
                code: None,
            });
        }
        Ok(parsed)
    }
}

fn api_error_message(body: &Value) -> Option<String> {
    ["status_messages", "message", "error"]
        .iter()
        .find_map(|key| match body.get(*key)? {
            Value::String(s) => Some(s.clone()),
            other if !other.is_null() => Some(other.to_string()),
            _ => None,
        })
}

fn tracking_number(payload: &Map<String, Value>) -> Result<&str, ConectaError> {
    payload
        .get("tracking_number")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ConectaError::invalid("tracking_number", "is required"))
}

#[async_trait]
impl CarrierClient for EnvioClickClient {
    fn code(&self) -> &str {
        PROVIDER_CODE
    }

    async fn quote(&self, ctx: &CarrierContext, payload: &Map<String, Value>) -> Result<Value, ConectaError> {
        self.post(ctx, "api/v2/quotation", &Value::Object(payload.clone())).await
    }

    async fn generate(
        &self,
        ctx: &CarrierContext,
        payload: &Map<String, Value>,
    ) -> Result<Value, ConectaError> {
        self.post(ctx, "api/v2/shipment/request", &Value::Object(payload.clone())).await
    }

    async fn track(&self, ctx: &CarrierContext, payload: &Map<String, Value>) -> Result<Value, ConectaError> {
        let tracker = tracking_number(payload)?;
        self.post(ctx, "api/v2/track", &json!({"trackingCode": tracker})).await
    }

    async fn cancel(
        &self,
        ctx: &CarrierContext,
        payload: &Map<String, Value>,
    ) -> Result<Value, ConectaError> {
        let tracker = tracking_number(payload)?;
        self.post(ctx, "api/v2/cancellation", &json!({"trackingCode": tracker})).await
    }
}
