// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use conecta_bus::queues::TRANSPORT_RESPONSES;
use conecta_bus::{Broker, MessageHandler, publish_json};
use conecta_core::ConectaError;
use conecta_vault::CredentialSource;
use tracing::{debug, error, info, warn};

use super::{CarrierClient, CarrierContext};
use crate::envelope::{TransportOperation, TransportRequest, TransportResponse};

/// Routes transport requests to carrier clients by provider code.
pub struct TransportAdapterRouter {
    clients: HashMap<String, Arc<dyn CarrierClient>>,
    credentials: Arc<dyn CredentialSource>,
    broker: Arc<dyn Broker>,
}

impl TransportAdapterRouter {
    pub fn new(credentials: Arc<dyn CredentialSource>, broker: Arc<dyn Broker>) -> Self {
        Self {
            clients: HashMap::new(),
            credentials,
            broker,
        }
    }

    pub fn with_client(mut self, client: Arc<dyn CarrierClient>) -> Self {
        self.clients.insert(client.code().to_string(), client);
        self
    }

    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.clients.keys().map(String::as_str)
    }

    /// Runs the request and converts every outcome into a response.
    pub async fn execute(&self, request: &TransportRequest) -> TransportResponse {
        match self.dispatch(request).await {
            Ok(data) => TransportResponse::success(request, data),
            Err(e) => {
                warn!(
                    correlation_id = %request.correlation_id,
                    provider = %request.provider,
                    operation = %request.operation,
                    error = %e,
                    "carrier operation failed"
                );
                TransportResponse::failure(request, e.to_string())
            }
        }
    }

    async fn dispatch(&self, request: &TransportRequest) -> Result<serde_json::Value, ConectaError> {
        let client = self.clients.get(&request.provider).ok_or_else(|| {
            ConectaError::invalid("provider", format!("no adapter for provider '{}'", request.provider))
        })?;
        let credentials = self
            .credentials
            .require(request.business_id, &request.provider)
            .await?;
        let ctx = CarrierContext {
            business_id: request.business_id,
            base_url: request.base_url.clone(),
            is_test: request.is_test,
            credentials,
        };
        let payload = &request.payload;
        match request.operation {
            TransportOperation::Quote => client.quote(&ctx, payload).await,
            TransportOperation::Generate => client.generate(&ctx, payload).await,
            TransportOperation::Track => client.track(&ctx, payload).await,
            TransportOperation::Cancel => client.cancel(&ctx, payload).await,
            TransportOperation::Unknown => Err(ConectaError::invalid(
                "operation",
                "unsupported transport operation",
            )),
        }
    }
}

#[async_trait]
impl MessageHandler for TransportAdapterRouter {
    async fn handle(&self, payload: &[u8]) -> Result<(), ConectaError> {
        let request: TransportRequest = match serde_json::from_slice(payload) {
            Ok(request) => request,
            Err(e) => {
                error!(error = %e, "dropping malformed transport request");
                return Ok(());
            }
        };
        debug!(
            correlation_id = %request.correlation_id,
            provider = %request.provider,
            operation = %request.operation,
            "handling transport request"
        );

        let response = self.execute(&request).await;
        publish_json(self.broker.as_ref(), TRANSPORT_RESPONSES, &response).await?;
        info!(
            correlation_id = %response.correlation_id,
            operation = %response.operation,
            status = %response.status,
            "transport response published"
        );
        Ok(())
    }
}
