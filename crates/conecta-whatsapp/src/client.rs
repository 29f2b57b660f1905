// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Cloud API client.

use std::time::Duration;

use async_trait::async_trait;
use conecta_config::model::WhatsAppConfig;
use conecta_core::ConectaError;
use conecta_vault::Credentials;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::WhatsAppError;
use crate::templates::TemplateMessage;

/// Sender identity of a business on the Cloud API.
#[derive(Clone)]
pub struct SenderCredentials {
    pub phone_number_id: String,
    pub access_token: String,
}

impl SenderCredentials {
    /// Reads `phone_number_id` and `access_token` from a vault entry.
    pub fn from_credentials(credentials: &Credentials) -> Result<Self, ConectaError> {
        Ok(Self {
            phone_number_id: credentials.require("phone_number_id")?.to_string(),
            access_token: credentials.require("access_token")?.to_string(),
        })
    }
}

impl std::fmt::Debug for SenderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SenderCredentials")
            .field("phone_number_id", &self.phone_number_id)
            .field("access_token", &"[redacted]")
            .finish()
    }
}

#[async_trait]
pub trait WhatsAppApi: Send + Sync {
    /// Sends a template message and returns the provider message id.
    async fn send_template(
        &self,
        sender: &SenderCredentials,
        to: &str,
        message: &TemplateMessage,
    ) -> Result<String, WhatsAppError>;
}

/// Builds the `messages` payload. Only body parameters are included.
pub fn template_payload(to: &str, message: &TemplateMessage) -> Value {
    let mut template = json!({
        "name": message.name,
        "language": {"code": message.language},
    });
    if !message.body_params.is_empty() {
        let parameters: Vec<Value> = message
            .body_params
            .iter()
            .map(|text| json!({"type": "text", "text": text}))
            .collect();
        template["components"] = json!([{"type": "body", "parameters": parameters}]);
    }
    json!({
        "messaging_product": "whatsapp",
        "recipient_type": "individual",
        "to": to,
        "type": "template",
        "template": template,
    })
}

pub struct CloudApiClient {
    client: reqwest::Client,
    base_url: String,
    api_version: String,
}

impl CloudApiClient {
    pub fn new(base_url: &str, api_version: &str, timeout: Duration) -> Result<Self, ConectaError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConectaError::ProviderUnavailable {
                provider: "whatsapp".into(),
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version: api_version.trim_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &WhatsAppConfig, timeout: Duration) -> Result<Self, ConectaError> {
        Self::new(&config.api_base_url, &config.api_version, timeout)
    }
}

#[async_trait]
impl WhatsAppApi for CloudApiClient {
    async fn send_template(
        &self,
        sender: &SenderCredentials,
        to: &str,
        message: &TemplateMessage,
    ) -> Result<String, WhatsAppError> {
        let url = format!(
            "{}/{}/{}/messages",
            self.base_url, self.api_version, sender.phone_number_id
        );
        debug!(template = %message.name, "sending WhatsApp template");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&sender.access_token)
            .json(&template_payload(to, message))
            .send()
            .await
            .map_err(|e| WhatsAppError::Unavailable(e.to_string()))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let body: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
        if !status.is_success() {
            let message = body
                .pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or(text);
            if status.is_server_error() {
                return Err(WhatsAppError::Unavailable(format!("{status}: {message}")));
            }
            return Err(WhatsAppError::Api {
                status: status.as_u16(),
                message,
            });
        }
        body.pointer("/messages/0/id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| WhatsAppError::Api {
                status: status.as_u16(),
                message: "response carried no message id".into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn sender() -> SenderCredentials {
        SenderCredentials {
            phone_number_id: "1099".into(),
            access_token: "EAAG".into(),
        }
    }

    fn message(params: &[&str]) -> TemplateMessage {
        TemplateMessage {
            name: "pedido_cancelado".into(),
            language: "es".into(),
            body_params: params.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn payload_has_positional_body_params_only() {
        let payload = template_payload("573001234567", &message(&["1001", "Ana"]));
        let components = payload["template"]["components"].as_array().unwrap();
        assert_eq!(components.len(), 1);
        assert_eq!(components[0]["type"], "body");
        assert_eq!(components[0]["parameters"][0]["text"], "1001");
        assert_eq!(components[0]["parameters"][1]["text"], "Ana");

        let bare = template_payload("573001234567", &message(&[]));
        assert!(bare["template"].get("components").is_none());
    }

    #[test]
    fn debug_redacts_token() {
        let out = format!("{:?}", sender());
        assert!(!out.contains("EAAG"));
    }

    #[tokio::test]
    async fn send_returns_wamid() {
        let server = MockServer::start().await;
        let expected = template_payload("573001234567", &message(&["1001"]));
        Mock::given(method("POST"))
            .and(path("/v21.0/1099/messages"))
            .and(header("Authorization", "Bearer EAAG"))
            .and(body_json(&expected))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "messaging_product": "whatsapp",
                "messages": [{"id": "wamid.HBg"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = CloudApiClient::new(&server.uri(), "v21.0", Duration::from_secs(5)).unwrap();
        let id = client
            .send_template(&sender(), "573001234567", &message(&["1001"]))
            .await
            .unwrap();
        assert_eq!(id, "wamid.HBg");
    }

    #[tokio::test]
    async fn api_errors_carry_provider_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"message": "Template name does not exist", "code": 132001}
            })))
            .mount(&server)
            .await;
        let client = CloudApiClient::new(&server.uri(), "v21.0", Duration::from_secs(5)).unwrap();
        let err = client
            .send_template(&sender(), "573001234567", &message(&[]))
            .await
            .unwrap_err();
        assert!(matches!(err, WhatsAppError::Api { status: 400, ref message } if message.contains("does not exist")));
    }
}
