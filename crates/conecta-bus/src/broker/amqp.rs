// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! RabbitMQ broker.
//!
//! Queues are durable and published to through the default exchange with
//! persistent delivery mode. Consumers reconnect with jittered exponential
//! backoff and hold at most `prefetch` unacknowledged deliveries.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backon::{BackoffBuilder, ExponentialBuilder};
use dashmap::DashSet;
use futures::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions, BasicQosOptions,
    QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{Broker, MessageHandler};
use crate::error::BusError;

const MAX_PUBLISH_RETRIES: usize = 5;

struct PublishState {
    connection: Connection,
    channel: Channel,
}

pub struct AmqpBroker {
    url: String,
    prefetch: u16,
    publisher: Mutex<Option<PublishState>>,
    declared: DashSet<String>,
}

impl AmqpBroker {
    /// Connects eagerly so a bad URL fails at startup.
    pub async fn connect(url: &str, prefetch: u16) -> Result<Self, BusError> {
        let broker = Self {
            url: url.to_string(),
            prefetch: prefetch.max(1),
            publisher: Mutex::new(None),
            declared: DashSet::new(),
        };
        {
            let mut guard = broker.publisher.lock().await;
            *guard = Some(broker.open_publisher().await?);
        }
        info!(prefetch = broker.prefetch, "connected to AMQP broker");
        Ok(broker)
    }

    async fn open_connection(&self) -> Result<Connection, BusError> {
        Connection::connect(&self.url, ConnectionProperties::default())
            .await
            .map_err(|e| BusError::Connection(format!("failed to connect: {e}")))
    }

    async fn open_publisher(&self) -> Result<PublishState, BusError> {
        let connection = self.open_connection().await?;
        let channel = connection
            .create_channel()
            .await
            .map_err(|e| BusError::Connection(format!("failed to create channel: {e}")))?;
        self.declared.clear();
        Ok(PublishState {
            connection,
            channel,
        })
    }

    async fn declare(channel: &Channel, queue: &str) -> Result<(), lapin::Error> {
        channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map(|_| ())
    }

    async fn try_publish(&self, queue: &str, payload: &[u8]) -> Result<(), BusError> {
        let mut guard = self.publisher.lock().await;
        let healthy = match guard.as_ref() {
            Some(state) => state.connection.status().connected() && state.channel.status().connected(),
            None => false,
        };
        if !healthy {
            *guard = Some(self.open_publisher().await?);
        }
        let Some(state) = guard.as_ref() else {
            return Err(BusError::Connection("publisher channel unavailable".into()));
        };

        if !self.declared.contains(queue) {
            Self::declare(&state.channel, queue)
                .await
                .map_err(|e| BusError::PublishFailed(format!("failed to declare {queue}: {e}")))?;
            self.declared.insert(queue.to_string());
        }

        let properties = BasicProperties::default()
            .with_content_type("application/json".into())
            .with_delivery_mode(2);
        let confirm = state
            .channel
            .basic_publish("", queue, BasicPublishOptions::default(), payload, properties)
            .await
            .map_err(|e| BusError::PublishFailed(e.to_string()))?;
        confirm
            .await
            .map_err(|e| BusError::PublishFailed(format!("confirmation failed: {e}")))?;
        Ok(())
    }

    async fn setup_consumer(&self, queue: &str) -> Result<(Connection, lapin::Consumer), BusError> {
        let connection = self.open_connection().await?;
        let channel = connection
            .create_channel()
            .await
            .map_err(|e| BusError::Connection(format!("failed to create channel: {e}")))?;
        channel
            .basic_qos(self.prefetch, BasicQosOptions::default())
            .await
            .map_err(|e| BusError::Subscribe(format!("failed to set prefetch: {e}")))?;
        Self::declare(&channel, queue)
            .await
            .map_err(|e| BusError::Subscribe(format!("failed to declare {queue}: {e}")))?;
        let consumer = channel
            .basic_consume(
                queue,
                &format!("conecta-{queue}"),
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| BusError::Subscribe(format!("failed to start consumer: {e}")))?;
        Ok((connection, consumer))
    }

    async fn process_delivery(
        queue: &str,
        delivery: lapin::message::Delivery,
        handler: &Arc<dyn MessageHandler>,
    ) {
        match handler.handle(&delivery.data).await {
            Ok(()) => {
                if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
                    error!(queue, error = %e, "failed to ack message");
                }
            }
            Err(e) => {
                warn!(queue, error = %e, "handler failed, requeueing");
                let options = BasicNackOptions {
                    requeue: true,
                    ..Default::default()
                };
                if let Err(e) = delivery.nack(options).await {
                    error!(queue, error = %e, "failed to nack message");
                }
            }
        }
    }
}

#[async_trait]
impl Broker for AmqpBroker {
    async fn publish(&self, queue: &str, payload: Vec<u8>) -> Result<(), BusError> {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_secs(5))
            .with_max_times(MAX_PUBLISH_RETRIES)
            .with_jitter()
            .build();

        let mut last_error = None;
        for (attempt, delay) in std::iter::once(Duration::ZERO).chain(backoff).enumerate() {
            if attempt > 0 {
                tokio::time::sleep(delay).await;
            }
            match self.try_publish(queue, &payload).await {
                Ok(()) => {
                    debug!(queue, "published to AMQP queue");
                    return Ok(());
                }
                Err(e) => {
                    error!(queue, attempt = attempt + 1, error = %e, "publish failed, retrying");
                    let mut guard = self.publisher.lock().await;
                    *guard = None;
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| BusError::PublishFailed("max retries exceeded".into())))
    }

    async fn consume(
        &self,
        queue: &str,
        handler: Arc<dyn MessageHandler>,
        shutdown: CancellationToken,
    ) -> Result<(), BusError> {
        let backoff_builder = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_secs(30))
            .with_jitter();
        let mut backoff = backoff_builder.build();

        while !shutdown.is_cancelled() {
            match self.setup_consumer(queue).await {
                Ok((connection, mut consumer)) => {
                    info!(queue, "consumer connected");
                    backoff = backoff_builder.build();
                    loop {
                        let next = tokio::select! {
                            biased;
                            _ = shutdown.cancelled() => None,
                            next = consumer.next() => Some(next),
                        };
                        match next {
                            None => break,
                            Some(Some(Ok(delivery))) => {
                                Self::process_delivery(queue, delivery, &handler).await;
                            }
                            Some(Some(Err(e))) => {
                                error!(queue, error = %e, "delivery error, reconnecting");
                                break;
                            }
                            Some(None) => {
                                info!(queue, "consumer stream ended, reconnecting");
                                break;
                            }
                        }
                    }
                    let _ = connection.close(200, "consumer stopped").await;
                }
                Err(e) => {
                    let delay = backoff.next().unwrap_or(Duration::from_secs(30));
                    error!(queue, error = %e, backoff_ms = delay.as_millis() as u64, "failed to set up consumer");
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        info!(queue, "consumer stopped");
        Ok(())
    }
}
