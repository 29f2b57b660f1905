// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use conecta_bus::queues::{PAY_RESPONSES, payment_requests};
use conecta_bus::{Broker, MessageHandler, publish_json};
use conecta_core::ConectaError;
use conecta_vault::CredentialSource;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::GatewayError;
use crate::gateway::PaymentGateway;
use crate::types::{GatewayOutcome, PaymentRequest, PaymentResponse, PaymentStatus};

/// Consumes `pay.<gateway>.requests` for one gateway and answers on `pay.responses`.
///
/// Gateway failures become error responses; only a failed publish asks
/// the broker for redelivery.
pub struct PaymentAdapter {
    gateway: Arc<dyn PaymentGateway>,
    credentials: Arc<dyn CredentialSource>,
    broker: Arc<dyn Broker>,
}

impl PaymentAdapter {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        credentials: Arc<dyn CredentialSource>,
        broker: Arc<dyn Broker>,
    ) -> Self {
        Self {
            gateway,
            credentials,
            broker,
        }
    }

    /// The queue this adapter consumes.
    pub fn queue(&self) -> String {
        payment_requests(self.gateway.code())
    }

    pub fn gateway_code(&self) -> &str {
        self.gateway.code()
    }

    /// Runs one request and builds the response envelope.
    pub async fn process(&self, request: &PaymentRequest) -> PaymentResponse {
        let started = Instant::now();
        let result = self.create(request).await;
        let processing_time_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(outcome) => {
                info!(
                    correlation_id = %request.correlation_id,
                    business_id = request.business_id,
                    gateway = self.gateway.code(),
                    status = %outcome.status,
                    processing_time_ms,
                    "payment created"
                );
                success(request, self.gateway.code(), outcome, processing_time_ms)
            }
            Err(e) => {
                warn!(
                    correlation_id = %request.correlation_id,
                    business_id = request.business_id,
                    gateway = self.gateway.code(),
                    error_code = e.code(),
                    error = %e,
                    "payment gateway call failed"
                );
                failure(request, self.gateway.code(), &e, processing_time_ms)
            }
        }
    }

    async fn create(&self, request: &PaymentRequest) -> Result<GatewayOutcome, GatewayError> {
        let provider = self.gateway.provider_code();
        let credentials = self
            .credentials
            .credentials(request.business_id, provider)
            .await
            .map_err(|e| GatewayError::Config(e.to_string()))?
            .ok_or_else(|| {
                GatewayError::Config(format!(
                    "business {} has no {provider} credentials",
                    request.business_id
                ))
            })?;
        self.gateway.create_payment(&credentials, request).await
    }
}

fn success(
    request: &PaymentRequest,
    gateway: &str,
    outcome: GatewayOutcome,
    processing_time_ms: u64,
) -> PaymentResponse {
    PaymentResponse {
        payment_transaction_id: request.payment_transaction_id,
        gateway_code: gateway.to_string(),
        status: outcome.status,
        external_id: outcome.external_id,
        payment_url: outcome.payment_url,
        gateway_response: outcome.raw,
        error: None,
        error_code: None,
        correlation_id: request.correlation_id.clone(),
        processing_time_ms,
    }
}

fn failure(
    request: &PaymentRequest,
    gateway: &str,
    err: &GatewayError,
    processing_time_ms: u64,
) -> PaymentResponse {
    PaymentResponse {
        payment_transaction_id: request.payment_transaction_id,
        gateway_code: gateway.to_string(),
        status: PaymentStatus::Failed,
        external_id: None,
        payment_url: None,
        gateway_response: Value::Object(Default::default()),
        error: Some(err.to_string()),
        error_code: Some(err.code().to_string()),
        correlation_id: request.correlation_id.clone(),
        processing_time_ms,
    }
}

#[async_trait]
impl MessageHandler for PaymentAdapter {
    async fn handle(&self, payload: &[u8]) -> Result<(), ConectaError> {
        let request: PaymentRequest = match serde_json::from_slice(payload) {
            Ok(r) => r,
            Err(e) => {
                warn!(gateway = self.gateway.code(), error = %e, "dropping malformed payment request");
                return Ok(());
            }
        };
        debug!(
            correlation_id = %request.correlation_id,
            payment_transaction_id = request.payment_transaction_id,
            gateway = self.gateway.code(),
            "payment request received"
        );
        let response = self.process(&request).await;
        publish_json(self.broker.as_ref(), PAY_RESPONSES, &response).await?;
        Ok(())
    }
}
