// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fire-and-forget pub/sub channels.
//!
//! Unlike broker queues, pub/sub messages reach every subscriber that is
//! listening at publish time and are lost otherwise.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::broker::MessageHandler;
use crate::error::BusError;

pub mod local;
#[cfg(feature = "redis")]
pub mod redis;

pub use local::LocalPubSub;
#[cfg(feature = "redis")]
pub use self::redis::RedisPubSub;

#[async_trait]
pub trait PubSub: Send + Sync {
    async fn publish(&self, channel: &str, payload: String) -> Result<(), BusError>;

    /// A stream of payloads published to `channel` from now on.
    async fn subscribe(&self, channel: &str) -> Result<BoxStream<'static, String>, BusError>;
}

/// Feeds every message on `channel` to `handler`, one at a time, until
/// `shutdown` fires. Handler errors are logged; pub/sub has no redelivery.
pub async fn run_subscriber(
    pubsub: Arc<dyn PubSub>,
    channel: &str,
    handler: Arc<dyn MessageHandler>,
    shutdown: CancellationToken,
) -> Result<(), BusError> {
    let mut stream = pubsub.subscribe(channel).await?;
    debug!(channel, "subscriber started");
    loop {
        let message = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            message = stream.next() => match message {
                Some(message) => message,
                None => break,
            },
        };
        if let Err(e) = handler.handle(message.as_bytes()).await {
            warn!(channel, error = %e, "subscriber handler failed");
        }
    }
    debug!(channel, "subscriber stopped");
    Ok(())
}
