// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shipment events for the browser SSE stream.
//!
//! Publishing never blocks the caller: events go onto an unbounded queue
//! drained by one background task that writes them to the pub/sub
//! channel. When no pub/sub backend exists a [`NoopPublisher`] stands in.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::pubsub::PubSub;
use crate::queues::SHIPMENT_EVENTS;

/// The shipment outcomes the UI listens for.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
pub enum ShipmentEventType {
    #[serde(rename = "shipment.quote_received")]
    #[strum(serialize = "shipment.quote_received")]
    QuoteReceived,
    #[serde(rename = "shipment.quote_failed")]
    #[strum(serialize = "shipment.quote_failed")]
    QuoteFailed,
    #[serde(rename = "shipment.guide_generated")]
    #[strum(serialize = "shipment.guide_generated")]
    GuideGenerated,
    #[serde(rename = "shipment.guide_failed")]
    #[strum(serialize = "shipment.guide_failed")]
    GuideFailed,
    #[serde(rename = "shipment.tracking_updated")]
    #[strum(serialize = "shipment.tracking_updated")]
    TrackingUpdated,
    #[serde(rename = "shipment.tracking_failed")]
    #[strum(serialize = "shipment.tracking_failed")]
    TrackingFailed,
    #[serde(rename = "shipment.cancelled")]
    #[strum(serialize = "shipment.cancelled")]
    Cancelled,
    #[serde(rename = "shipment.cancel_failed")]
    #[strum(serialize = "shipment.cancel_failed")]
    CancelFailed,
}

/// Wire form of an SSE event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SseEvent {
    pub id: String,
    pub event_type: ShipmentEventType,
    pub business_id: i64,
    pub timestamp: DateTime<Utc>,
    pub data: Value,
}

/// Publishes tenant-scoped shipment events.
///
/// Implementors only provide [`emit`](Self::emit); the named helpers
/// shape the `data` payload for each outcome.
pub trait EventPublisher: Send + Sync {
    fn emit(&self, event_type: ShipmentEventType, business_id: i64, data: Value);

    fn quote_received(&self, business_id: i64, correlation_id: &str, quotes: Value) {
        self.emit(
            ShipmentEventType::QuoteReceived,
            business_id,
            json!({"correlation_id": correlation_id, "quotes": quotes}),
        );
    }

    fn quote_failed(&self, business_id: i64, correlation_id: &str, error: &str) {
        self.emit(
            ShipmentEventType::QuoteFailed,
            business_id,
            json!({"correlation_id": correlation_id, "error": error}),
        );
    }

    fn guide_generated(
        &self,
        business_id: i64,
        correlation_id: &str,
        shipment_id: Option<i64>,
        tracking_number: &str,
        guide_url: &str,
    ) {
        self.emit(
            ShipmentEventType::GuideGenerated,
            business_id,
            json!({
                "correlation_id": correlation_id,
                "shipment_id": shipment_id,
                "tracking_number": tracking_number,
                "guide_url": guide_url,
            }),
        );
    }

    fn guide_failed(
        &self,
        business_id: i64,
        correlation_id: &str,
        shipment_id: Option<i64>,
        error: &str,
    ) {
        self.emit(
            ShipmentEventType::GuideFailed,
            business_id,
            json!({"correlation_id": correlation_id, "shipment_id": shipment_id, "error": error}),
        );
    }

    fn tracking_updated(&self, business_id: i64, correlation_id: &str, tracking: Value) {
        self.emit(
            ShipmentEventType::TrackingUpdated,
            business_id,
            json!({"correlation_id": correlation_id, "tracking": tracking}),
        );
    }

    fn tracking_failed(&self, business_id: i64, correlation_id: &str, error: &str) {
        self.emit(
            ShipmentEventType::TrackingFailed,
            business_id,
            json!({"correlation_id": correlation_id, "error": error}),
        );
    }

    fn cancelled(&self, business_id: i64, correlation_id: &str, shipment_id: Option<i64>) {
        self.emit(
            ShipmentEventType::Cancelled,
            business_id,
            json!({"correlation_id": correlation_id, "shipment_id": shipment_id}),
        );
    }

    fn cancel_failed(
        &self,
        business_id: i64,
        correlation_id: &str,
        shipment_id: Option<i64>,
        error: &str,
    ) {
        self.emit(
            ShipmentEventType::CancelFailed,
            business_id,
            json!({"correlation_id": correlation_id, "shipment_id": shipment_id, "error": error}),
        );
    }
}

/// Strictly increasing timestamps within the process.
#[derive(Default)]
struct MonotonicClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl MonotonicClock {
    fn now(&self) -> DateTime<Utc> {
        let mut now = Utc::now();
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(previous) = *last {
            if now <= previous {
                now = previous + Duration::microseconds(1);
            }
        }
        *last = Some(now);
        now
    }
}

/// Writes events to a pub/sub channel from a background task.
pub struct SsePublisher {
    sender: mpsc::UnboundedSender<SseEvent>,
    clock: MonotonicClock,
}

impl SsePublisher {
    /// Spawns the forwarding task; must be called inside a tokio runtime.
    pub fn new(pubsub: Arc<dyn PubSub>) -> Self {
        Self::with_channel(pubsub, SHIPMENT_EVENTS)
    }

    pub fn with_channel(pubsub: Arc<dyn PubSub>, channel: &str) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<SseEvent>();
        let channel = channel.to_string();
        tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                let payload = match serde_json::to_string(&event) {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(error = %e, "failed to serialize SSE event");
                        continue;
                    }
                };
                if let Err(e) = pubsub.publish(&channel, payload).await {
                    warn!(
                        event_type = %event.event_type,
                        business_id = event.business_id,
                        error = %e,
                        "failed to publish SSE event"
                    );
                }
            }
        });
        Self {
            sender,
            clock: MonotonicClock::default(),
        }
    }
}

impl EventPublisher for SsePublisher {
    fn emit(&self, event_type: ShipmentEventType, business_id: i64, data: Value) {
        let event = SseEvent {
            id: uuid::Uuid::new_v4().to_string(),
            event_type,
            business_id,
            timestamp: self.clock.now(),
            data,
        };
        debug!(event_type = %event_type, business_id, event_id = %event.id, "queueing SSE event");
        if self.sender.send(event).is_err() {
            warn!(event_type = %event_type, business_id, "SSE forwarder stopped, event dropped");
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn emit(&self, event_type: ShipmentEventType, business_id: i64, _data: Value) {
        debug!(event_type = %event_type, business_id, "no pub/sub configured, SSE event dropped");
    }
}

/// The SSE publisher when pub/sub is available, the no-op one otherwise.
pub fn publisher_for(pubsub: Option<Arc<dyn PubSub>>) -> Arc<dyn EventPublisher> {
    match pubsub {
        Some(pubsub) => Arc::new(SsePublisher::new(pubsub)),
        None => Arc::new(NoopPublisher),
    }
}
