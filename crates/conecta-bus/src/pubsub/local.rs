// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::broadcast;
use tracing::warn;

use super::PubSub;
use crate::error::BusError;

const CHANNEL_CAPACITY: usize = 1024;

/// In-process pub/sub over tokio broadcast channels.
#[derive(Clone, Default)]
pub struct LocalPubSub {
    channels: Arc<DashMap<String, broadcast::Sender<String>>>,
}

impl LocalPubSub {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, channel: &str) -> broadcast::Sender<String> {
        self.channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .value()
            .clone()
    }
}

#[async_trait]
impl PubSub for LocalPubSub {
    async fn publish(&self, channel: &str, payload: String) -> Result<(), BusError> {
        // No subscribers is not an error.
        let _ = self.sender(channel).send(payload);
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<BoxStream<'static, String>, BusError> {
        let receiver = self.sender(channel).subscribe();
        let name = channel.to_string();
        let stream = stream::unfold((receiver, name), |(mut receiver, name)| async move {
            loop {
                match receiver.recv().await {
                    Ok(message) => return Some((message, (receiver, name))),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(channel = %name, skipped, "subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });
        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_subscriber_receives() {
        let pubsub = LocalPubSub::new();
        let mut a = pubsub.subscribe("orders.events").await.unwrap();
        let mut b = pubsub.subscribe("orders.events").await.unwrap();
        let mut other = pubsub.subscribe("other").await.unwrap();

        pubsub.publish("orders.events", "hello".into()).await.unwrap();
        pubsub.publish("other", "x".into()).await.unwrap();

        assert_eq!(a.next().await.unwrap(), "hello");
        assert_eq!(b.next().await.unwrap(), "hello");
        assert_eq!(other.next().await.unwrap(), "x");
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_ok() {
        let pubsub = LocalPubSub::new();
        pubsub.publish("nobody", "x".into()).await.unwrap();
    }
}
