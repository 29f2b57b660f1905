// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end scenario testing.
//!
//! `TestHarness` assembles the whole fabric in-process: temp SQLite, the
//! channel broker, local pub/sub, the memory result cache, the SSE bridge,
//! every queue consumer and the HTTP router. Carriers and WhatsApp are
//! mocked.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use conecta_bus::queues::{
    ORDER_CONFIRMATION_REQUESTED, ORDER_EVENTS, SHIPMENT_EVENTS, TRANSPORT_REQUESTS,
    TRANSPORT_RESPONSES,
};
use conecta_bus::{
    Broker, ChannelBroker, EventPublisher, LocalPubSub, MemoryCache, MessageHandler, PubSub,
    SseEvent, SsePublisher, run_subscriber,
};
use conecta_core::ConectaError;
use conecta_gateway::{GatewayState, api_router};
use conecta_storage::{Database, SqliteStorage};
use conecta_transport::{
    CoordinatorSettings, ResponseConsumer, ShipmentCoordinator, TransportAdapterRouter,
    TransportPublisher,
};
use conecta_vault::{CredentialVault, LayeredCredentialSource, VaultKey};
use conecta_whatsapp::{
    ConfirmationConsumer, Dispatcher, InboundHandler, OrderEventConsumer, TemplateCatalog,
    WebhookState, webhook_router,
};
use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::mock_carrier::MockCarrier;
use crate::mock_whatsapp::MockWhatsAppApi;

/// Builder for test environments.
pub struct TestHarnessBuilder {
    vault_secret: String,
    settings: CoordinatorSettings,
    result_ttl: Duration,
    conversation_window: chrono::Duration,
    verify_token: Option<String>,
    app_secret: Option<String>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            vault_secret: "secret".to_string(),
            settings: CoordinatorSettings {
                quote_timeout: Duration::from_secs(5),
                poll_interval: Duration::from_millis(10),
            },
            result_ttl: Duration::from_secs(60),
            conversation_window: chrono::Duration::hours(24),
            verify_token: Some("verify-me".to_string()),
            app_secret: None,
        }
    }

    pub fn with_vault_secret(mut self, secret: &str) -> Self {
        self.vault_secret = secret.to_string();
        self
    }

    pub fn with_quote_timeout(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.settings = CoordinatorSettings {
            quote_timeout: timeout,
            poll_interval,
        };
        self
    }

    pub fn with_conversation_window(mut self, window: chrono::Duration) -> Self {
        self.conversation_window = window;
        self
    }

    /// Requires `X-Hub-Signature-256` on webhook posts.
    pub fn with_app_secret(mut self, secret: &str) -> Self {
        self.app_secret = Some(secret.to_string());
        self
    }

    pub async fn build(self) -> Result<TestHarness, ConectaError> {
        let temp_dir = tempfile::TempDir::new().map_err(ConectaError::storage)?;
        let db_path = temp_dir.path().join("conecta.db");
        let db = Database::open(&db_path.to_string_lossy()).await?;
        let storage = Arc::new(SqliteStorage::new(db));

        let broker = ChannelBroker::new();
        let broker_handle: Arc<dyn Broker> = Arc::new(broker.clone());
        let pubsub = Arc::new(LocalPubSub::new());
        let cache = Arc::new(MemoryCache::new());
        let vault = Arc::new(CredentialVault::new(VaultKey::from_material(
            self.vault_secret.as_bytes(),
        )));
        let credentials = Arc::new(LayeredCredentialSource::standard(
            storage.clone(),
            vault.clone(),
        ));
        let events: Arc<dyn EventPublisher> = Arc::new(SsePublisher::new(pubsub.clone()));

        let coordinator = Arc::new(ShipmentCoordinator::new(
            storage.clone(),
            TransportPublisher::new(broker_handle.clone()),
            cache.clone(),
            self.settings,
        ));
        let response_consumer = Arc::new(ResponseConsumer::new(
            storage.clone(),
            cache.clone(),
            events,
            self.result_ttl,
        ));

        let carrier = Arc::new(MockCarrier::new());
        let adapter_router = Arc::new(
            TransportAdapterRouter::new(credentials.clone(), broker_handle.clone())
                .with_client(carrier.clone()),
        );

        let whatsapp = Arc::new(MockWhatsAppApi::new());
        let dispatcher = Arc::new(Dispatcher::new(
            storage.clone(),
            credentials.clone(),
            whatsapp.clone(),
            TemplateCatalog::default(),
            self.conversation_window,
        ));
        let inbound = Arc::new(InboundHandler::new(
            storage.clone(),
            dispatcher.clone(),
            broker_handle.clone(),
        ));
        let order_events = Arc::new(OrderEventConsumer::new(storage.clone(), broker_handle.clone()));
        let confirmations = Arc::new(ConfirmationConsumer::new(dispatcher.clone(), storage.clone()));

        Ok(TestHarness {
            storage,
            broker,
            pubsub,
            vault,
            coordinator,
            response_consumer,
            adapter_router,
            carrier,
            whatsapp,
            dispatcher,
            inbound,
            order_events,
            confirmations,
            verify_token: self.verify_token,
            app_secret: self.app_secret,
            shutdown: CancellationToken::new(),
            tasks: Vec::new(),
            _temp_dir: temp_dir,
        })
    }
}

/// A complete in-process Conecta.
pub struct TestHarness {
    pub storage: Arc<SqliteStorage>,
    /// Keeps a history of every published payload per queue.
    pub broker: ChannelBroker,
    pub pubsub: Arc<LocalPubSub>,
    pub vault: Arc<CredentialVault>,
    pub coordinator: Arc<ShipmentCoordinator>,
    pub response_consumer: Arc<ResponseConsumer>,
    pub adapter_router: Arc<TransportAdapterRouter>,
    pub carrier: Arc<MockCarrier>,
    pub whatsapp: Arc<MockWhatsAppApi>,
    pub dispatcher: Arc<Dispatcher>,
    pub inbound: Arc<InboundHandler>,
    pub order_events: Arc<OrderEventConsumer>,
    pub confirmations: Arc<ConfirmationConsumer>,
    verify_token: Option<String>,
    app_secret: Option<String>,
    pub shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub async fn new() -> Result<Self, ConectaError> {
        Self::builder().build().await
    }

    /// Spawns every queue consumer and the order-event subscriber.
    ///
    /// Yields once so the subscriber is listening before this returns.
    pub async fn start(&mut self) {
        let queues: [(&str, Arc<dyn MessageHandler>); 3] = [
            (TRANSPORT_REQUESTS, self.adapter_router.clone() as Arc<dyn MessageHandler>),
            (TRANSPORT_RESPONSES, self.response_consumer.clone() as Arc<dyn MessageHandler>),
            (ORDER_CONFIRMATION_REQUESTED, self.confirmations.clone() as Arc<dyn MessageHandler>),
        ];
        for (queue, handler) in queues {
            let broker = self.broker.clone();
            let shutdown = self.shutdown.clone();
            self.tasks.push(tokio::spawn(async move {
                if let Err(e) = broker.consume(queue, handler, shutdown).await {
                    tracing::error!(queue, error = %e, "test consumer failed");
                }
            }));
        }

        let pubsub: Arc<dyn PubSub> = self.pubsub.clone();
        let handler: Arc<dyn MessageHandler> = self.order_events.clone();
        let shutdown = self.shutdown.clone();
        let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();
        self.tasks.push(tokio::spawn(async move {
            let _ = ready_tx.send(());
            if let Err(e) = run_subscriber(pubsub, ORDER_EVENTS, handler, shutdown).await {
                tracing::error!(error = %e, "order event subscriber failed");
            }
        }));
        let _ = ready_rx.await;
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    /// The public HTTP surface: gateway API plus the WhatsApp webhook.
    pub fn router(&self) -> Router {
        let api = api_router(GatewayState {
            coordinator: self.coordinator.clone(),
            storage: self.storage.clone(),
            pubsub: self.pubsub.clone(),
            shutdown: self.shutdown.clone(),
        });
        api.merge(webhook_router(WebhookState {
            inbound: self.inbound.clone(),
            verify_token: self.verify_token.clone(),
            app_secret: self.app_secret.clone(),
        }))
    }

    /// Shipment events published from now on.
    pub async fn shipment_events(&self) -> Result<BoxStream<'static, SseEvent>, ConectaError> {
        let raw = self.pubsub.subscribe(SHIPMENT_EVENTS).await?;
        Ok(raw
            .filter_map(|payload| async move { serde_json::from_str::<SseEvent>(&payload).ok() })
            .boxed())
    }

    /// Publishes an order event on the internal channel.
    pub async fn publish_order_event(&self, event: &serde_json::Value) -> Result<(), ConectaError> {
        self.pubsub
            .publish(ORDER_EVENTS, event.to_string())
            .await
            .map_err(ConectaError::from)
    }

    /// Polls `check` every 10ms until it yields a value or `timeout` passes.
    pub async fn eventually<T, F, Fut>(&self, timeout: Duration, mut check: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Option<T>>,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(value) = check().await {
                return Some(value);
            }
            if tokio::time::Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Cancels every spawned task and waits for them to drain.
    pub async fn stop(mut self) {
        self.shutdown.cancel();
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn harness_builds_and_stops() {
        let mut harness = TestHarness::new().await.unwrap();
        harness.start().await;
        let _router = harness.router();
        harness.stop().await;
    }
}
