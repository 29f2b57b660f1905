// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use chrono::Utc;
use conecta_bus::queues::payment_requests;
use conecta_bus::{Broker, publish_json};
use conecta_core::ConectaError;
use tracing::debug;

use crate::types::PaymentRequest;

/// Producer side of the payment queues.
#[derive(Clone)]
pub struct PaymentRequestPublisher {
    broker: Arc<dyn Broker>,
}

impl PaymentRequestPublisher {
    pub fn new(broker: Arc<dyn Broker>) -> Self {
        Self { broker }
    }

    /// Validates, stamps and publishes to `pay.<gateway_code>.requests`.
    ///
    /// Returns the correlation id, generated when the caller left it empty.
    pub async fn publish(&self, mut request: PaymentRequest) -> Result<String, ConectaError> {
        if request.gateway_code.trim().is_empty() {
            return Err(ConectaError::invalid("gateway_code", "is required"));
        }
        if !(request.amount.is_finite() && request.amount > 0.0) {
            return Err(ConectaError::invalid("amount", "must be greater than zero"));
        }
        if request.currency.trim().is_empty() {
            return Err(ConectaError::invalid("currency", "is required"));
        }
        if request.correlation_id.is_empty() {
            request.correlation_id = uuid::Uuid::new_v4().to_string();
        }
        if request.timestamp.is_none() {
            request.timestamp = Some(Utc::now());
        }

        let queue = payment_requests(&request.gateway_code);
        publish_json(self.broker.as_ref(), &queue, &request).await?;
        debug!(
            correlation_id = %request.correlation_id,
            business_id = request.business_id,
            queue = %queue,
            "published payment request"
        );
        Ok(request.correlation_id)
    }
}
