// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Applies carrier results to shipments and orders.
//!
//! Every outcome, including persistence failures, ends up as an SSE event
//! and the delivery is acknowledged. Events for a correlation id are only
//! emitted once the writes they describe have returned.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use conecta_bus::{EventPublisher, MessageHandler, ResultCache};
use conecta_core::{ConectaError, Shipment, ShipmentStatus, Storage};
use tracing::{debug, error, info, warn};

use crate::envelope::{
    TransportOperation, TransportResponse, extract_quotes, extract_tracker_and_url,
    quote_result_key,
};

pub struct ResponseConsumer {
    storage: Arc<dyn Storage>,
    cache: Arc<dyn ResultCache>,
    events: Arc<dyn EventPublisher>,
    result_ttl: Duration,
}

impl ResponseConsumer {
    pub fn new(
        storage: Arc<dyn Storage>,
        cache: Arc<dyn ResultCache>,
        events: Arc<dyn EventPublisher>,
        result_ttl: Duration,
    ) -> Self {
        Self {
            storage,
            cache,
            events,
            result_ttl,
        }
    }

    /// Applies one response. Never fails; problems are logged and reported
    /// through the failure event of the operation.
    pub async fn process(&self, response: &TransportResponse) {
        debug!(
            correlation_id = %response.correlation_id,
            business_id = response.business_id,
            operation = %response.operation,
            status = %response.status,
            "processing transport response"
        );
        match response.operation {
            TransportOperation::Quote => self.on_quote(response).await,
            TransportOperation::Generate => self.on_generate(response).await,
            TransportOperation::Track => self.on_track(response),
            TransportOperation::Cancel => self.on_cancel(response).await,
            TransportOperation::Unknown => {
                warn!(
                    correlation_id = %response.correlation_id,
                    provider = %response.provider,
                    "dropping response for unknown operation"
                );
            }
        }
    }

    async fn on_quote(&self, response: &TransportResponse) {
        let cid = &response.correlation_id;
        match serde_json::to_string(response) {
            Ok(raw) => {
                if let Err(e) = self.cache.set(&quote_result_key(cid), raw, self.result_ttl).await {
                    error!(correlation_id = %cid, error = %e, "failed to cache quote result");
                }
            }
            Err(e) => error!(correlation_id = %cid, error = %e, "failed to serialize quote result"),
        }

        if response.is_success() {
            let quotes = response
                .data
                .as_ref()
                .map(extract_quotes)
                .unwrap_or(serde_json::Value::Null);
            self.events.quote_received(response.business_id, cid, quotes);
        } else {
            self.events
                .quote_failed(response.business_id, cid, response.error_message());
        }
    }

    async fn on_generate(&self, response: &TransportResponse) {
        let cid = &response.correlation_id;
        let business_id = response.business_id;

        if !response.is_success() {
            let reason = response.error_message();
            if let Some(id) = response.shipment_id {
                if let Err(e) = self.mark_failed(id).await {
                    error!(correlation_id = %cid, shipment_id = id, error = %e, "failed to mark shipment failed");
                }
            }
            warn!(correlation_id = %cid, business_id, error = %reason, "guide generation failed");
            self.events
                .guide_failed(business_id, cid, response.shipment_id, reason);
            return;
        }

        let data = response.data.clone().unwrap_or(serde_json::Value::Null);
        let (tracker, url) = extract_tracker_and_url(&data);
        let (Some(tracker), Some(url)) = (tracker, url) else {
            let reason = "carrier response is missing tracker or label url";
            if let Some(id) = response.shipment_id {
                if let Err(e) = self.mark_failed(id).await {
                    error!(correlation_id = %cid, shipment_id = id, error = %e, "failed to mark shipment failed");
                }
            }
            warn!(correlation_id = %cid, business_id, "{reason}");
            self.events
                .guide_failed(business_id, cid, response.shipment_id, reason);
            return;
        };

        let Some(shipment_id) = response.shipment_id else {
            info!(correlation_id = %cid, business_id, tracker = %tracker, "guide generated without a shipment record");
            self.events
                .guide_generated(business_id, cid, None, &tracker, &url);
            return;
        };

        match self.apply_guide(shipment_id, &tracker, &url, response.is_test).await {
            Ok(shipment) => {
                let tracking = shipment.tracking_number.as_deref().unwrap_or(&tracker);
                info!(correlation_id = %cid, business_id, shipment_id, tracking_number = %tracking, "guide generated");
                self.events
                    .guide_generated(business_id, cid, Some(shipment_id), tracking, &url);
            }
            Err(e) => {
                error!(correlation_id = %cid, business_id, shipment_id, error = %e, "failed to persist guide");
                self.events
                    .guide_failed(business_id, cid, Some(shipment_id), &e.to_string());
            }
        }
    }

    /// Writes the label onto the shipment and mirrors it onto the order.
    ///
    /// Re-applying the same result yields the same rows.
    async fn apply_guide(
        &self,
        shipment_id: i64,
        tracker: &str,
        url: &str,
        is_test: bool,
    ) -> Result<Shipment, ConectaError> {
        let mut shipment = self.load(shipment_id).await?;
        if !shipment.status.can_transition_to(ShipmentStatus::Pending) {
            return Err(ConectaError::PersistenceConflict(format!(
                "shipment {shipment_id} is {}",
                shipment.status
            )));
        }
        if !shipment.assign_tracking_number(tracker) {
            warn!(
                shipment_id,
                existing = ?shipment.tracking_number,
                received = %tracker,
                "shipment already has a different tracking number, keeping it"
            );
        }
        shipment.guide_url = Some(url.to_string());
        shipment.is_test = is_test;
        shipment.status = ShipmentStatus::Pending;
        self.storage.apply_guide(&shipment).await?;
        Ok(shipment)
    }

    fn on_track(&self, response: &TransportResponse) {
        let cid = &response.correlation_id;
        if response.is_success() {
            let tracking = response.data.clone().unwrap_or(serde_json::Value::Null);
            self.events
                .tracking_updated(response.business_id, cid, tracking);
        } else {
            self.events
                .tracking_failed(response.business_id, cid, response.error_message());
        }
    }

    async fn on_cancel(&self, response: &TransportResponse) {
        let cid = &response.correlation_id;
        let business_id = response.business_id;
        if !response.is_success() {
            self.events.cancel_failed(
                business_id,
                cid,
                response.shipment_id,
                response.error_message(),
            );
            return;
        }

        if let Some(id) = response.shipment_id {
            let result = async {
                let mut shipment = self.load(id).await?;
                shipment.status = ShipmentStatus::Cancelled;
                self.storage.update_shipment(&shipment).await
            }
            .await;
            if let Err(e) = result {
                error!(correlation_id = %cid, business_id, shipment_id = id, error = %e, "failed to persist cancellation");
                self.events
                    .cancel_failed(business_id, cid, Some(id), &e.to_string());
                return;
            }
        }
        info!(correlation_id = %cid, business_id, shipment_id = ?response.shipment_id, "shipment cancelled");
        self.events.cancelled(business_id, cid, response.shipment_id);
    }

    async fn mark_failed(&self, shipment_id: i64) -> Result<(), ConectaError> {
        let mut shipment = self.load(shipment_id).await?;
        if !shipment.status.can_transition_to(ShipmentStatus::Failed) {
            debug!(shipment_id, status = %shipment.status, "not marking shipment failed");
            return Ok(());
        }
        shipment.status = ShipmentStatus::Failed;
        self.storage.update_shipment(&shipment).await
    }

    async fn load(&self, shipment_id: i64) -> Result<Shipment, ConectaError> {
        self.storage
            .get_shipment(shipment_id)
            .await?
            .ok_or_else(|| ConectaError::not_found("shipment", shipment_id))
    }
}

#[async_trait]
impl MessageHandler for ResponseConsumer {
    async fn handle(&self, payload: &[u8]) -> Result<(), ConectaError> {
        match serde_json::from_slice::<TransportResponse>(payload) {
            Ok(response) => self.process(&response).await,
            Err(e) => error!(error = %e, "dropping malformed transport response"),
        }
        Ok(())
    }
}
