// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process broker for single-node deployments and tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::{Broker, MessageHandler};
use crate::error::BusError;

/// Deliveries failing this many times are dropped.
pub const MAX_DELIVERIES: u32 = 3;

struct Delivery {
    payload: Vec<u8>,
    attempt: u32,
}

struct MemoryQueue {
    sender: mpsc::UnboundedSender<Delivery>,
    receiver: tokio::sync::Mutex<mpsc::UnboundedReceiver<Delivery>>,
    history: Mutex<Vec<Vec<u8>>>,
}

impl MemoryQueue {
    fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: tokio::sync::Mutex::new(receiver),
            history: Mutex::new(Vec::new()),
        }
    }
}

/// Unbounded in-memory queues keyed by name.
///
/// Every published payload is also kept in a per-queue history so tests
/// can assert on what was sent without racing the consumer.
#[derive(Default, Clone)]
pub struct ChannelBroker {
    queues: Arc<DashMap<String, Arc<MemoryQueue>>>,
}

impl ChannelBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn queue(&self, name: &str) -> Arc<MemoryQueue> {
        let entry = self
            .queues
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryQueue::new()));
        Arc::clone(entry.value())
    }

    /// Every payload ever published to `queue`, oldest first.
    pub fn published(&self, queue: &str) -> Vec<Vec<u8>> {
        let queue = self.queue(queue);
        match queue.history.lock() {
            Ok(history) => history.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// [`published`](Self::published) decoded as JSON; undecodable entries are skipped.
    pub fn published_json<T: DeserializeOwned>(&self, queue: &str) -> Vec<T> {
        self.published(queue)
            .iter()
            .filter_map(|payload| serde_json::from_slice(payload).ok())
            .collect()
    }
}

#[async_trait]
impl Broker for ChannelBroker {
    async fn publish(&self, queue: &str, payload: Vec<u8>) -> Result<(), BusError> {
        let q = self.queue(queue);
        match q.history.lock() {
            Ok(mut history) => history.push(payload.clone()),
            Err(poisoned) => poisoned.into_inner().push(payload.clone()),
        }
        q.sender
            .send(Delivery { payload, attempt: 1 })
            .map_err(|_| BusError::PublishFailed(format!("queue {queue} is closed")))?;
        debug!(queue, "published to in-process queue");
        Ok(())
    }

    async fn consume(
        &self,
        queue: &str,
        handler: Arc<dyn MessageHandler>,
        shutdown: CancellationToken,
    ) -> Result<(), BusError> {
        let q = self.queue(queue);
        let mut receiver = q.receiver.lock().await;
        debug!(queue, "in-process consumer started");

        loop {
            let delivery = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                next = receiver.recv() => match next {
                    Some(delivery) => delivery,
                    None => break,
                },
            };

            if let Err(e) = handler.handle(&delivery.payload).await {
                if delivery.attempt < MAX_DELIVERIES {
                    warn!(queue, attempt = delivery.attempt, error = %e, "handler failed, redelivering");
                    let _ = q.sender.send(Delivery {
                        payload: delivery.payload,
                        attempt: delivery.attempt + 1,
                    });
                } else {
                    error!(queue, attempt = delivery.attempt, error = %e, "handler failed, dropping message");
                }
            }
        }

        debug!(queue, "in-process consumer stopped");
        Ok(())
    }
}
