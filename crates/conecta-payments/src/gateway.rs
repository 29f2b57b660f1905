// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The gateway seam and the HTTP plumbing its clients share.

use std::time::Duration;

use async_trait::async_trait;
use conecta_vault::Credentials;
use reqwest::{RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::error::GatewayError;
use crate::types::{GatewayOutcome, PaymentRequest};

/// Production and sandbox roots of a gateway API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub production: String,
    pub sandbox: String,
}

impl Endpoints {
    pub fn new(production: impl Into<String>, sandbox: impl Into<String>) -> Self {
        Self {
            production: production.into(),
            sandbox: sandbox.into(),
        }
    }

    /// Both environments at one root, for local mocks.
    pub fn single(root: impl Into<String>) -> Self {
        let root = root.into();
        Self {
            production: root.clone(),
            sandbox: root,
        }
    }

    /// Picks the root for the credential's environment, without a trailing slash.
    pub fn base_for(&self, credentials: &Credentials) -> &str {
        let root = if credentials.is_sandbox() {
            &self.sandbox
        } else {
            &self.production
        };
        root.trim_end_matches('/')
    }
}

/// One external payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Short code naming the request queue, e.g. `bold`.
    fn code(&self) -> &str;

    /// Integration-type code the credentials are stored under, e.g. `bold_pay`.
    fn provider_code(&self) -> &str;

    /// Creates the link, preference or intent the customer pays through.
    async fn create_payment(
        &self,
        credentials: &Credentials,
        request: &PaymentRequest,
    ) -> Result<GatewayOutcome, GatewayError>;
}

pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, GatewayError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| GatewayError::Config(format!("failed to build HTTP client: {e}")))
}

/// Reads a credential, reporting absence as `invalid_credentials`.
pub(crate) fn credential<'a>(credentials: &'a Credentials, key: &str) -> Result<&'a str, GatewayError> {
    credentials
        .get(key)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| GatewayError::InvalidCredentials(format!("missing credential '{key}'")))
}

/// Sends the request and returns the parsed JSON body of a 2xx answer.
pub(crate) async fn send(gateway: &str, request: RequestBuilder) -> Result<Value, GatewayError> {
    let response = request.send().await.map_err(|e| {
        GatewayError::api(format!("{gateway} request failed: {e}"))
    })?;
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    debug!(gateway, status = status.as_u16(), "gateway answered");
    let body: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(GatewayError::InvalidCredentials(format!(
            "{gateway} refused the credentials ({status})"
        )));
    }
    if !status.is_success() {
        return Err(GatewayError::Api {
            message: format!(
                "{gateway} returned {status}: {}",
                error_message(&body).unwrap_or_else(|| "no details".into())
            ),
            status: Some(status.as_u16()),
        });
    }
    Ok(body)
}

/// Best-effort error text from the usual gateway error shapes.
pub(crate) fn error_message(body: &Value) -> Option<String> {
    if let Value::String(s) = body {
        return (!s.is_empty()).then(|| s.clone());
    }
    for key in ["message", "error_description", "error", "errors", "reason"] {
        match body.get(key) {
            Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(Value::Object(obj)) => {
                if let Some(Value::String(s)) = obj.get("message").or_else(|| obj.get("reason")) {
                    return Some(s.clone());
                }
                return Some(Value::Object(obj.clone()).to_string());
            }
            Some(Value::Array(items)) if !items.is_empty() => {
                return Some(Value::Array(items.clone()).to_string());
            }
            _ => {}
        }
    }
    None
}

pub(crate) fn string_at(value: &Value, pointer: &str) -> Option<String> {
    match value.pointer(pointer)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn creds(v: Value) -> Credentials {
        Credentials::new(v.as_object().unwrap().clone())
    }

    #[test]
    fn sandbox_credentials_select_sandbox_root() {
        let endpoints = Endpoints::new("https://prod/", "https://sandbox/");
        assert_eq!(endpoints.base_for(&creds(json!({"environment": "sandbox"}))), "https://sandbox");
        assert_eq!(endpoints.base_for(&creds(json!({}))), "https://prod");
    }

    #[test]
    fn error_messages_from_common_shapes() {
        assert_eq!(error_message(&json!({"message": "bad"})).as_deref(), Some("bad"));
        assert_eq!(
            error_message(&json!({"error": {"message": "nope", "type": "card_error"}})).as_deref(),
            Some("nope")
        );
        assert_eq!(error_message(&json!({"errors": ["a"]})).as_deref(), Some("[\"a\"]"));
        assert_eq!(error_message(&json!({})), None);
    }

    #[test]
    fn missing_credential_is_invalid_credentials() {
        let err = credential(&creds(json!({"api_key": ""})), "api_key").unwrap_err();
        assert_eq!(err.code(), "invalid_credentials");
    }
}
