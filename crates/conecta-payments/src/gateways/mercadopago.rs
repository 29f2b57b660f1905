// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! MercadoPago Checkout Pro preferences.

use std::time::Duration;

use async_trait::async_trait;
use conecta_vault::Credentials;
use serde_json::{Value, json};

use crate::error::GatewayError;
use crate::gateway::{Endpoints, PaymentGateway, build_client, credential, send, string_at};
use crate::types::{GatewayOutcome, PaymentRequest, PaymentStatus};

const API_ROOT: &str = "https://api.mercadopago.com";

pub struct MercadoPagoGateway {
    client: reqwest::Client,
    endpoints: Endpoints,
}

impl MercadoPagoGateway {
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
}

fn preference_body(request: &PaymentRequest) -> Value {
    let title = if request.description.is_empty() {
        request.reference.clone()
    } else {
        request.description.clone()
    };
    let mut body = json!({
        "items": [{
            "id": request.reference,
            "title": title,
            "quantity": 1,
            "currency_id": request.currency,
            "unit_price": request.amount,
        }],
        "external_reference": request.reference,
        "metadata": {
            "payment_transaction_id": request.payment_transaction_id,
            "business_id": request.business_id,
        },
    });
    if let Some(url) = request.metadata.get("notification_url") {
        body["notification_url"] = url.clone();
    }
    if let Some(urls) = request.metadata.get("back_urls") {
        body["back_urls"] = urls.clone();
        body["auto_return"] = json!("approved");
    }
    body
}

#[async_trait]
impl PaymentGateway for MercadoPagoGateway {
    fn code(&self) -> &str {
        "mercadopago"
    }

    fn provider_code(&self) -> &str {
        "mercadopago_pay"
    }

    async fn create_payment(
        &self,
        credentials: &Credentials,
        request: &PaymentRequest,
    ) -> Result<GatewayOutcome, GatewayError> {
        let token = credential(credentials, "access_token")?;
        let url = format!("{}/checkout/preferences", self.endpoints.base_for(credentials));

        let raw = send(
            "mercadopago",
            self.client
                .post(&url)
                .bearer_auth(token)
                .header("X-Idempotency-Key", &request.correlation_id)
                .json(&preference_body(request)),
        )
        .await?;

        let external_id = string_at(&raw, "/id")
            .ok_or_else(|| GatewayError::api("mercadopago answered without a preference id"))?;
        let link_field = if credentials.is_sandbox() {
            "/sandbox_init_point"
        } else {
            "/init_point"
        };
        Ok(GatewayOutcome {
            status: PaymentStatus::Pending,
            external_id: Some(external_id),
            payment_url: string_at(&raw, link_field).or_else(|| string_at(&raw, "/init_point")),
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

    async fn server_with_preference() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/checkout/preferences"))
            .and(header("Authorization", "Bearer MP-TOKEN"))
            .and(body_partial_json(json!({"external_reference": "ORD-1001"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "123-pref",
                "init_point": "https://mp/checkout?pref=123",
                "sandbox_init_point": "https://sandbox.mp/checkout?pref=123"
            })))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn creates_preference() {
        let server = server_with_preference().await;
        let gw = MercadoPagoGateway::new(Duration::from_secs(5))
            .unwrap()
            .with_endpoints(Endpoints::single(server.uri()));
        let out = gw
            .create_payment(&creds(json!({"access_token": "MP-TOKEN"})), &request("mercadopago"))
            .await
            .unwrap();
        assert_eq!(out.external_id.as_deref(), Some("123-pref"));
        assert_eq!(out.payment_url.as_deref(), Some("https://mp/checkout?pref=123"));
    }

    #[tokio::test]
    async fn sandbox_uses_sandbox_init_point() {
        let server = server_with_preference().await;
        let gw = MercadoPagoGateway::new(Duration::from_secs(5))
            .unwrap()
            .with_endpoints(Endpoints::single(server.uri()));
        let out = gw
            .create_payment(
                &creds(json!({"access_token": "MP-TOKEN", "environment": "sandbox"})),
                &request("mercadopago"),
            )
            .await
            .unwrap();
        assert_eq!(out.payment_url.as_deref(), Some("https://sandbox.mp/checkout?pref=123"));
    }

    #[tokio::test]
    async fn unauthorized_is_invalid_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "invalid token"})))
            .mount(&server)
            .await;
        let gw = MercadoPagoGateway::new(Duration::from_secs(5))
            .unwrap()
            .with_endpoints(Endpoints::single(server.uri()));
        let err = gw
            .create_payment(&creds(json!({"access_token": "bad"})), &request("mercadopago"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_credentials");
    }

    #[test]
    fn title_falls_back_to_reference() {
        let mut req = request("mercadopago");
        req.description.clear();
        assert_eq!(preference_body(&req)["items"][0]["title"], "ORD-1001");
    }
}
