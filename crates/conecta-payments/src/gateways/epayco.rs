// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! ePayco collection links.
//!
//! Apify needs a short-lived session token obtained with the merchant's
//! public/private key pair before a link can be created.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use conecta_vault::Credentials;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::GatewayError;
use crate::gateway::{Endpoints, PaymentGateway, build_client, credential, send, string_at};
use crate::types::{GatewayOutcome, PaymentRequest, PaymentStatus};

const API_ROOT: &str = "https://apify.epayco.co";

pub struct EpaycoGateway {
    client: reqwest::Client,
    endpoints: Endpoints,
}

impl EpaycoGateway {
    pub fn new(timeout: Duration) -> Result<Self, GatewayError> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoints: Endpoints::single(API_ROOT),
        })
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    async fn login(&self, base: &str, credentials: &Credentials) -> Result<String, GatewayError> {
        let public_key = credential(credentials, "public_key")?;
        let private_key = credential(credentials, "private_key")?;
        let basic = STANDARD.encode(format!("{public_key}:{private_key}"));

        let raw = send(
            "epayco",
            self.client
                .post(format!("{base}/login"))
                .header("Authorization", format!("Basic {basic}"))
                .json(&json!({})),
        )
        .await?;
        debug!("epayco session opened");
        string_at(&raw, "/token")
            .ok_or_else(|| GatewayError::InvalidCredentials("epayco login returned no token".into()))
    }
}

fn link_body(request: &PaymentRequest, sandbox: bool) -> Value {
    json!({
        "quantity": 1,
        "onePayment": true,
        "amount": request.amount,
        "currency": request.currency,
        "id": 0,
        "base": 0,
        "tax": 0,
        "title": request.reference,
        "description": request.description,
        "typeSell": "1",
        "reference": request.reference,
        "test": sandbox,
    })
}

#[async_trait]
impl PaymentGateway for EpaycoGateway {
    fn code(&self) -> &str {
        "epayco"
    }

    fn provider_code(&self) -> &str {
        "epayco_pay"
    }

    async fn create_payment(
        &self,
        credentials: &Credentials,
        request: &PaymentRequest,
    ) -> Result<GatewayOutcome, GatewayError> {
        let base = self.endpoints.base_for(credentials);
        let token = self.login(base, credentials).await?;

        let raw = send(
            "epayco",
            self.client
                .post(format!("{base}/collection/link/create"))
                .bearer_auth(token)
                .json(&link_body(request, credentials.is_sandbox())),
        )
        .await?;

        if raw.get("success").and_then(Value::as_bool) == Some(false) {
            let reason = string_at(&raw, "/textResponse")
                .or_else(|| string_at(&raw, "/titleResponse"))
                .unwrap_or_else(|| "link creation failed".into());
            return Err(GatewayError::api(format!("epayco: {reason}")));
        }
        let external_id = string_at(&raw, "/data/id")
            .ok_or_else(|| GatewayError::api("epayco answered without a link id"))?;
        Ok(GatewayOutcome {
            status: PaymentStatus::Pending,
            external_id: Some(external_id),
            payment_url: string_at(&raw, "/data/routeLink"),
            raw,
        })
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::test_support::{creds, request};

    fn keys() -> Credentials {
        creds(json!({"public_key": "pub", "private_key": "priv", "environment": "sandbox"}))
    }

    #[tokio::test]
    async fn logs_in_then_creates_link() {
        let server = MockServer::start().await;
        let basic = STANDARD.encode("pub:priv");
        Mock::given(method("POST"))
            .and(path("/login"))
            .and(header("Authorization", format!("Basic {basic}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "JWT"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/collection/link/create"))
            .and(header("Authorization", "Bearer JWT"))
            .and(body_partial_json(json!({"test": true, "amount": 85000.0})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": {"id": 4455, "routeLink": "https://payco.link/4455"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let gw = EpaycoGateway::new(Duration::from_secs(5))
            .unwrap()
            .with_endpoints(Endpoints::single(server.uri()));
        let out = gw.create_payment(&keys(), &request("epayco")).await.unwrap();
        assert_eq!(out.external_id.as_deref(), Some("4455"));
        assert_eq!(out.payment_url.as_deref(), Some("https://payco.link/4455"));
    }

    #[tokio::test]
    async fn unsuccessful_body_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "JWT"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/collection/link/create"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "textResponse": "amount below minimum"
            })))
            .mount(&server)
            .await;

        let gw = EpaycoGateway::new(Duration::from_secs(5))
            .unwrap()
            .with_endpoints(Endpoints::single(server.uri()));
        let err = gw.create_payment(&keys(), &request("epayco")).await.unwrap_err();
        assert_eq!(err.code(), "api_error");
        assert!(err.to_string().contains("amount below minimum"));
    }

    #[tokio::test]
    async fn rejected_login_is_invalid_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        let gw = EpaycoGateway::new(Duration::from_secs(5))
            .unwrap()
            .with_endpoints(Endpoints::single(server.uri()));
        let err = gw.create_payment(&keys(), &request("epayco")).await.unwrap_err();
        assert_eq!(err.code(), "invalid_credentials");
    }
}
