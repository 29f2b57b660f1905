// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use chrono::Utc;
use conecta_bus::queues::TRANSPORT_REQUESTS;
use conecta_bus::{Broker, BusError, publish_json};
use tracing::{debug, error};

use crate::envelope::TransportRequest;

/// Publishes carrier requests onto `transport.requests`.
///
/// Delivery is at-least-once; the response consumer applies results idempotently.
#[derive(Clone)]
pub struct TransportPublisher {
    broker: Arc<dyn Broker>,
}

impl TransportPublisher {
    pub fn new(broker: Arc<dyn Broker>) -> Self {
        Self { broker }
    }

    pub async fn publish(&self, mut request: TransportRequest) -> Result<(), BusError> {
        if request.timestamp.is_none() {
            request.timestamp = Some(Utc::now());
        }
        match publish_json(self.broker.as_ref(), TRANSPORT_REQUESTS, &request).await {
            Ok(()) => {
                debug!(
                    correlation_id = %request.correlation_id,
                    business_id = request.business_id,
                    operation = %request.operation,
                    provider = %request.provider,
                    "published transport request"
                );
                Ok(())
            }
            Err(e) => {
                error!(
                    correlation_id = %request.correlation_id,
                    operation = %request.operation,
                    error = %e,
                    "failed to publish transport request"
                );
                Err(e)
            }
        }
    }
}
