// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `conecta serve` command implementation.
//!
//! Opens storage and messaging, builds every service, spawns one task per
//! broker queue and pub/sub channel, then serves HTTP until a signal
//! arrives. Consumers finish their in-flight message before the process
//! exits.

use std::sync::Arc;
use std::time::Duration;

use conecta_bus::queues::{
    ORDER_CONFIRMATION_REQUESTED, ORDER_EVENTS, TRANSPORT_REQUESTS, TRANSPORT_RESPONSES,
};
use conecta_bus::{Broker, MessageHandler, PubSub, connect_broker, connect_messaging, publisher_for, run_subscriber};
use conecta_config::model::{ConectaConfig, LoggingConfig};
use conecta_core::ConectaError;
use conecta_gateway::GatewayState;
use conecta_payments::{PaymentAdapter, gateway_for};
use conecta_storage::SqliteStorage;
use conecta_transport::{
    CoordinatorSettings, EnvioClickClient, ResponseConsumer, ShipmentCoordinator,
    TransportAdapterRouter, TransportPublisher,
};
use conecta_vault::{CredentialVault, LayeredCredentialSource, VaultKey};
use conecta_whatsapp::{
    CloudApiClient, ConfirmationConsumer, Dispatcher, InboundHandler, OrderEventConsumer,
    TemplateCatalog, WebhookState, webhook_router,
};
use secrecy::SecretString;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::shutdown;

/// Runs the `conecta serve` command.
pub async fn run_serve(config: ConectaConfig) -> Result<(), ConectaError> {
    init_tracing(&config.logging);
    info!("starting conecta serve");

    let key = config
        .vault
        .encryption_key
        .clone()
        .map(SecretString::from)
        .ok_or_else(|| {
            ConectaError::Config(
                "vault.encryption_key is not set (CONECTA_VAULT_ENCRYPTION_KEY)".to_string(),
            )
        })?;
    let vault = Arc::new(CredentialVault::new(VaultKey::from_secret(&key)));
    drop(key);

    let storage = Arc::new(SqliteStorage::open(&config.storage).await?);
    let broker = connect_broker(&config.broker).await?;
    let messaging = connect_messaging(&config.redis).await?;
    let credentials = Arc::new(LayeredCredentialSource::standard(storage.clone(), vault));
    let events = publisher_for(Some(messaging.pubsub.clone()));

    let transport = &config.transport;
    let coordinator = Arc::new(ShipmentCoordinator::new(
        storage.clone(),
        TransportPublisher::new(broker.clone()),
        messaging.cache.clone(),
        CoordinatorSettings::from(transport),
    ));
    let response_consumer = Arc::new(ResponseConsumer::new(
        storage.clone(),
        messaging.cache.clone(),
        events,
        Duration::from_secs(transport.result_ttl_secs),
    ));
    let carrier_timeout = Duration::from_secs(transport.provider_timeout_secs);
    let adapter_router = Arc::new(
        TransportAdapterRouter::new(credentials.clone(), broker.clone())
            .with_client(Arc::new(EnvioClickClient::new(carrier_timeout)?)),
    );

    let whatsapp_api = Arc::new(CloudApiClient::from_config(&config.whatsapp, carrier_timeout)?);
    let dispatcher = Arc::new(Dispatcher::new(
        storage.clone(),
        credentials.clone(),
        whatsapp_api,
        TemplateCatalog::default(),
        chrono::Duration::hours(config.whatsapp.conversation_window_hours),
    ));
    let inbound = Arc::new(InboundHandler::new(
        storage.clone(),
        dispatcher.clone(),
        broker.clone(),
    ));
    let order_events = Arc::new(OrderEventConsumer::new(storage.clone(), broker.clone()));
    let confirmations = Arc::new(ConfirmationConsumer::new(dispatcher, storage.clone()));

    let shutdown = shutdown::install_signal_handler();
    let mut tasks = Vec::new();

    let mut queues: Vec<(String, Arc<dyn MessageHandler>)> = vec![
        (TRANSPORT_REQUESTS.to_string(), adapter_router as Arc<dyn MessageHandler>),
        (TRANSPORT_RESPONSES.to_string(), response_consumer as Arc<dyn MessageHandler>),
        (
            ORDER_CONFIRMATION_REQUESTED.to_string(),
            confirmations as Arc<dyn MessageHandler>,
        ),
    ];
    let gateway_timeout = Duration::from_secs(config.payments.timeout_secs);
    for code in &config.payments.gateways {
        let gateway = gateway_for(code, gateway_timeout)
            .map_err(|e| ConectaError::Config(format!("payment gateway '{code}': {e}")))?;
        let adapter = PaymentAdapter::new(gateway, credentials.clone(), broker.clone());
        queues.push((adapter.queue(), Arc::new(adapter) as Arc<dyn MessageHandler>));
    }
    for (queue, handler) in queues {
        tasks.push(spawn_consumer(broker.clone(), queue, handler, shutdown.clone()));
    }
    tasks.push(spawn_subscriber(
        messaging.pubsub.clone(),
        ORDER_EVENTS,
        order_events,
        shutdown.clone(),
    ));
    info!(tasks = tasks.len(), "consumers started");

    let app = conecta_gateway::api_router(GatewayState {
        coordinator,
        storage: storage.clone(),
        pubsub: messaging.pubsub.clone(),
        shutdown: shutdown.clone(),
    })
    .merge(webhook_router(WebhookState {
        inbound,
        verify_token: config.whatsapp.verify_token.clone(),
        app_secret: config.whatsapp.app_secret.clone(),
    }));

    let served = conecta_gateway::serve(&config.server, app, shutdown.clone()).await;
    if let Err(e) = &served {
        error!(error = %e, "HTTP server failed, stopping consumers");
    }
    shutdown.cancel();

    for task in tasks {
        if let Err(e) = task.await {
            warn!(error = %e, "consumer task ended abnormally");
        }
    }
    storage.close().await?;
    info!("conecta stopped");
    served
}

fn spawn_consumer(
    broker: Arc<dyn Broker>,
    queue: String,
    handler: Arc<dyn MessageHandler>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(queue = %queue, "consumer started");
        if let Err(e) = broker.consume(&queue, handler, shutdown).await {
            error!(queue = %queue, error = %e, "consumer failed");
        }
        info!(queue = %queue, "consumer stopped");
    })
}

fn spawn_subscriber(
    pubsub: Arc<dyn PubSub>,
    channel: &'static str,
    handler: Arc<dyn MessageHandler>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = run_subscriber(pubsub, channel, handler, shutdown).await {
            error!(channel, error = %e, "subscriber failed");
        }
    })
}

/// `RUST_LOG` wins over `logging.level`.
fn init_tracing(logging: &LoggingConfig) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("conecta={},warn", logging.level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false);
    let result = if logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        eprintln!("conecta: tracing already initialized: {e}");
    }
}
