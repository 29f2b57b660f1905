// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wompi payment links and Nequi push payments.
//!
//! Both products live on the same Wompi API. Links return a checkout URL;
//! Nequi transactions push an approval request to the customer's phone and
//! need the merchant's presigned acceptance token first.

use std::time::Duration;

use async_trait::async_trait;
use conecta_vault::Credentials;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use crate::error::GatewayError;
use crate::gateway::{Endpoints, PaymentGateway, build_client, credential, send, string_at};
use crate::types::{GatewayOutcome, PaymentRequest, PaymentStatus, to_minor_units};

const PRODUCTION_ROOT: &str = "https://production.wompi.co/v1";
const SANDBOX_ROOT: &str = "https://sandbox.wompi.co/v1";
const CHECKOUT_ROOT: &str = "https://checkout.wompi.co/l";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Product {
    PaymentLink,
    Nequi,
}

pub struct WompiGateway {
    client: reqwest::Client,
    endpoints: Endpoints,
    product: Product,
}

impl WompiGateway {
    pub fn new(timeout: Duration) -> Result<Self, GatewayError> {
        Self::build(timeout, Product::PaymentLink)
    }

    /// Nequi wallet payments through Wompi.
    pub fn nequi(timeout: Duration) -> Result<Self, GatewayError> {
        Self::build(timeout, Product::Nequi)
    }

    fn build(timeout: Duration, product: Product) -> Result<Self, GatewayError> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoints: Endpoints::new(PRODUCTION_ROOT, SANDBOX_ROOT),
            product,
        })
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    async fn create_link(
        &self,
        base: &str,
        credentials: &Credentials,
        request: &PaymentRequest,
    ) -> Result<GatewayOutcome, GatewayError> {
        let private_key = credential(credentials, "private_key")?;
        let description = if request.description.is_empty() {
            &request.reference
        } else {
            &request.description
        };
        let body = json!({
            "name": request.reference,
            "description": description,
            "single_use": true,
            "collect_shipping": false,
            "currency": request.currency,
            "amount_in_cents": to_minor_units(request.amount),
            "sku": request.reference,
        });
        let raw = send(
            "wompi",
            self.client
                .post(format!("{base}/payment_links"))
                .bearer_auth(private_key)
                .json(&body),
        )
        .await?;
        let id = string_at(&raw, "/data/id")
            .ok_or_else(|| GatewayError::api("wompi answered without a link id"))?;
        Ok(GatewayOutcome {
            status: PaymentStatus::Pending,
            payment_url: Some(format!("{CHECKOUT_ROOT}/{id}")),
            external_id: Some(id),
            raw,
        })
    }

    async fn acceptance_token(&self, base: &str, public_key: &str) -> Result<String, GatewayError> {
        let raw = send(
            "wompi",
            self.client
                .get(format!("{base}/merchants/{}", urlencoding::encode(public_key))),
        )
        .await?;
        string_at(&raw, "/data/presigned_acceptance/acceptance_token").ok_or_else(|| {
            GatewayError::InvalidCredentials("wompi merchant has no acceptance token".into())
        })
    }

    async fn create_nequi(
        &self,
        base: &str,
        credentials: &Credentials,
        request: &PaymentRequest,
    ) -> Result<GatewayOutcome, GatewayError> {
        let public_key = credential(credentials, "public_key")?;
        let private_key = credential(credentials, "private_key")?;
        let phone = metadata_str(request, &["phone_number", "customer_phone"])
            .ok_or_else(|| GatewayError::Config("nequi payments need metadata.phone_number".into()))?;
        let email = metadata_str(request, &["customer_email", "email"])
            .ok_or_else(|| GatewayError::Config("nequi payments need metadata.customer_email".into()))?;

        let acceptance = self.acceptance_token(base, public_key).await?;
        let amount_in_cents = to_minor_units(request.amount);
        let mut body = json!({
            "acceptance_token": acceptance,
            "amount_in_cents": amount_in_cents,
            "currency": request.currency,
            "customer_email": email,
            "reference": request.reference,
            "payment_method": {"type": "NEQUI", "phone_number": phone},
        });
        if let Some(secret) = credentials.get("integrity_secret").filter(|s| !s.is_empty()) {
            body["signature"] = json!(integrity_signature(
                &request.reference,
                amount_in_cents,
                &request.currency,
                secret
            ));
        }

        let raw = send(
            "nequi",
            self.client
                .post(format!("{base}/transactions"))
                .bearer_auth(private_key)
                .json(&body),
        )
        .await?;
        let id = string_at(&raw, "/data/id")
            .ok_or_else(|| GatewayError::api("wompi answered without a transaction id"))?;
        let status = match raw.pointer("/data/status").and_then(Value::as_str) {
            Some("APPROVED") => PaymentStatus::Approved,
            Some("DECLINED" | "ERROR" | "VOIDED") => PaymentStatus::Failed,
            _ => PaymentStatus::Pending,
        };
        Ok(GatewayOutcome {
            status,
            external_id: Some(id),
            payment_url: None,
            raw,
        })
    }
}

fn metadata_str<'a>(request: &'a PaymentRequest, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| request.metadata.get(*k).and_then(Value::as_str))
        .filter(|s| !s.is_empty())
}

/// SHA-256 of `reference || amount_in_cents || currency || secret`, hex encoded.
fn integrity_signature(reference: &str, amount_in_cents: i64, currency: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{reference}{amount_in_cents}{currency}{secret}"));
    hex::encode(hasher.finalize())
}

#[async_trait]
impl PaymentGateway for WompiGateway {
    fn code(&self) -> &str {
        match self.product {
            Product::PaymentLink => "wompi",
            Product::Nequi => "nequi",
        }
    }

    fn provider_code(&self) -> &str {
        match self.product {
            Product::PaymentLink => "wompi_pay",
            Product::Nequi => "nequi_pay",
        }
    }

    async fn create_payment(
        &self,
        credentials: &Credentials,
        request: &PaymentRequest,
    ) -> Result<GatewayOutcome, GatewayError> {
        let base = self.endpoints.base_for(credentials);
        match self.product {
            Product::PaymentLink => self.create_link(base, credentials, request).await,
            Product::Nequi => self.create_nequi(base, credentials, request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::test_support::{creds, request};

    #[test]
    fn sandbox_credentials_pick_sandbox_host() {
        let gw = WompiGateway::new(Duration::from_secs(5)).unwrap();
        let sandbox = creds(json!({"environment": "sandbox"}));
        assert_eq!(gw.endpoints.base_for(&sandbox), SANDBOX_ROOT);
        assert_eq!(gw.endpoints.base_for(&creds(json!({}))), PRODUCTION_ROOT);
    }

    #[test]
    fn signature_is_hex_sha256() {
        let sig = integrity_signature("ORD-1", 100, "COP", "secret");
        assert_eq!(sig.len(), 64);
        assert_eq!(sig, integrity_signature("ORD-1", 100, "COP", "secret"));
        assert_ne!(sig, integrity_signature("ORD-1", 101, "COP", "secret"));
    }

    #[tokio::test]
    async fn payment_link_in_cents() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/payment_links"))
            .and(header("Authorization", "Bearer prv_test"))
            .and(body_partial_json(json!({"amount_in_cents": 8500000, "single_use": true})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"data": {"id": "AbC123"}})))
            .expect(1)
            .mount(&server)
            .await;

        let gw = WompiGateway::new(Duration::from_secs(5))
            .unwrap()
            .with_endpoints(Endpoints::single(server.uri()));
        let out = gw
            .create_payment(&creds(json!({"private_key": "prv_test"})), &request("wompi"))
            .await
            .unwrap();
        assert_eq!(out.external_id.as_deref(), Some("AbC123"));
        assert_eq!(out.payment_url.as_deref(), Some("https://checkout.wompi.co/l/AbC123"));
    }

    #[tokio::test]
    async fn nequi_fetches_acceptance_then_pushes_transaction() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/merchants/pub_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"presigned_acceptance": {"acceptance_token": "ACC"}}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/transactions"))
            .and(body_partial_json(json!({
                "acceptance_token": "ACC",
                "payment_method": {"type": "NEQUI", "phone_number": "3001234567"}
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "data": {"id": "tx-1", "status": "PENDING"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let gw = WompiGateway::nequi(Duration::from_secs(5))
            .unwrap()
            .with_endpoints(Endpoints::single(server.uri()));
        let mut req = request("nequi");
        req.metadata.insert("phone_number".into(), json!("3001234567"));
        req.metadata.insert("customer_email".into(), json!("ana@example.com"));
        let out = gw
            .create_payment(
                &creds(json!({"public_key": "pub_test", "private_key": "prv_test"})),
                &req,
            )
            .await
            .unwrap();
        assert_eq!(out.external_id.as_deref(), Some("tx-1"));
        assert_eq!(out.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn nequi_without_phone_is_config_error() {
        let gw = WompiGateway::nequi(Duration::from_secs(5))
            .unwrap()
            .with_endpoints(Endpoints::single("http://127.0.0.1:9"));
        let err = gw
            .create_payment(
                &creds(json!({"public_key": "p", "private_key": "k"})),
                &request("nequi"),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "config_error");
    }
}
