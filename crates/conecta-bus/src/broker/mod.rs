// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable work queues.
//!
//! A [`Broker`] moves opaque payloads between producers and exactly one
//! consuming loop per queue. Consumers process deliveries one at a time in
//! delivery order; a handler error asks the broker to redeliver.

use std::sync::Arc;

use async_trait::async_trait;
use conecta_core::ConectaError;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::BusError;

#[cfg(feature = "amqp")]
pub mod amqp;
pub mod channel;

#[cfg(feature = "amqp")]
pub use amqp::AmqpBroker;
pub use channel::ChannelBroker;

/// Processes one delivery.
///
/// `Ok` acknowledges the message. `Err` is reserved for failures worth a
/// redelivery; business-level outcomes are handled inside and return `Ok`.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, payload: &[u8]) -> Result<(), ConectaError>;
}

#[async_trait]
pub trait Broker: Send + Sync {
    /// Publishes a persistent message to a durable queue.
    async fn publish(&self, queue: &str, payload: Vec<u8>) -> Result<(), BusError>;

    /// Consumes `queue` sequentially until `shutdown` fires.
    ///
    /// The delivery in flight when shutdown is requested is finished and
    /// acknowledged before this returns.
    async fn consume(
        &self,
        queue: &str,
        handler: Arc<dyn MessageHandler>,
        shutdown: CancellationToken,
    ) -> Result<(), BusError>;
}

/// Serializes `value` as JSON and publishes it.
pub async fn publish_json<T>(broker: &dyn Broker, queue: &str, value: &T) -> Result<(), BusError>
where
    T: Serialize + ?Sized,
{
    let payload = serde_json::to_vec(value)?;
    broker.publish(queue, payload).await
}
