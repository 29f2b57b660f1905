// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tracing::{info, warn};

use super::PubSub;
use crate::error::BusError;

/// Redis PUBLISH/SUBSCRIBE.
///
/// Publishing goes through a shared auto-reconnecting connection; each
/// subscription opens its own dedicated pub/sub connection.
#[derive(Clone)]
pub struct RedisPubSub {
    client: Client,
    conn: ConnectionManager,
}

impl RedisPubSub {
    pub async fn connect(url: &str) -> Result<Self, BusError> {
        let client = Client::open(url)?;
        let conn = ConnectionManager::new(client.clone()).await?;
        info!("connected to Redis pub/sub");
        Ok(Self { client, conn })
    }

    pub(crate) fn connection(&self) -> ConnectionManager {
        self.conn.clone()
    }
}

#[async_trait]
impl PubSub for RedisPubSub {
    async fn publish(&self, channel: &str, payload: String) -> Result<(), BusError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.publish(channel, payload).await?;
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<BoxStream<'static, String>, BusError> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| BusError::Subscribe(e.to_string()))?;
        pubsub
            .subscribe(channel)
            .await
            .map_err(|e| BusError::Subscribe(e.to_string()))?;
        let stream = pubsub.into_on_message().filter_map(|msg| async move {
            match msg.get_payload::<String>() {
                Ok(payload) => Some(payload),
                Err(e) => {
                    warn!(error = %e, "dropping non-UTF-8 pub/sub payload");
                    None
                }
            }
        });
        Ok(stream.boxed())
    }
}
