// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shipment coordination against in-process messaging and real SQLite.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use conecta_bus::queues::{TRANSPORT_REQUESTS, TRANSPORT_RESPONSES};
use conecta_bus::{
    ChannelBroker, LocalPubSub, MemoryCache, MessageHandler, PubSub, ResultCache,
    SseEvent, SsePublisher, ShipmentEventType,
};
use conecta_core::*;
use conecta_storage::{Database, SqliteStorage};
use conecta_transport::*;
use conecta_vault::{CredentialSource, Credentials};
use futures::StreamExt;
use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;

struct Fixture {
    storage: Arc<SqliteStorage>,
    broker: ChannelBroker,
    cache: Arc<MemoryCache>,
    pubsub: Arc<LocalPubSub>,
    business_id: i64,
}

async fn fixture(is_testing: bool) -> Fixture {
    let storage = Arc::new(SqliteStorage::new(Database::open_in_memory().await.unwrap()));
    let biz = storage.insert_business("Tienda Ana").await.unwrap();
    let type_id = storage
        .insert_integration_type(&IntegrationType {
            id: 0,
            code: "envioclick".into(),
            name: "EnvioClick".into(),
            category: IntegrationCategory::Shipping,
            base_url: "https://api.provider/".into(),
            base_url_test: Some("https://sandbox.provider/".into()),
            platform_credentials: None,
        })
        .await
        .unwrap();
    storage
        .insert_integration(&NewIntegration {
            business_id: Some(biz.id),
            integration_type_id: type_id,
            name: "EnvioClick".into(),
            is_active: true,
            is_testing,
            config: json!({}),
            credentials: None,
        })
        .await
        .unwrap();
    Fixture {
        storage,
        broker: ChannelBroker::new(),
        cache: Arc::new(MemoryCache::new()),
        pubsub: Arc::new(LocalPubSub::new()),
        business_id: biz.id,
    }
}

impl Fixture {
    fn coordinator(&self, settings: CoordinatorSettings) -> ShipmentCoordinator {
        ShipmentCoordinator::new(
            self.storage.clone(),
            TransportPublisher::new(Arc::new(self.broker.clone())),
            self.cache.clone(),
            settings,
        )
    }

    fn consumer(&self) -> ResponseConsumer {
        ResponseConsumer::new(
            self.storage.clone(),
            self.cache.clone(),
            Arc::new(SsePublisher::new(self.pubsub.clone())),
            Duration::from_secs(60),
        )
    }

    fn requests(&self) -> Vec<TransportRequest> {
        self.broker.published_json(TRANSPORT_REQUESTS)
    }
}

fn shipment_request(order: Option<&str>) -> ShipmentRequest {
    let mut raw = json!({
        "origin": {"dane_code": "11001000"},
        "destination": {"dane_code": "05001000"},
        "packages": [{"weight": 1.0, "length": 20.0, "width": 20.0, "height": 20.0}],
        "declared_value": 100000.0,
        "currency": "COP"
    });
    if let Some(order) = order {
        raw["order_uuid"] = json!(order);
    }
    serde_json::from_value(raw).unwrap()
}

fn order(id: &str, business_id: i64) -> Order {
    let now = Utc::now();
    Order {
        id: id.into(),
        business_id,
        order_number: "1001".into(),
        customer_name: "Ana".into(),
        customer_phone: "+573001234567".into(),
        payment_method_id: Some(3),
        status: "paid".into(),
        integration_id: Some(1),
        total: 100000.0,
        currency: "COP".into(),
        guide_link: None,
        tracking_number: None,
        created_at: now,
        updated_at: now,
    }
}

fn response(
    request: &TransportRequest,
    status: TransportStatus,
    data: Option<Value>,
    error: Option<&str>,
) -> TransportResponse {
    match status {
        TransportStatus::Success => TransportResponse::success(request, data.unwrap_or(Value::Null)),
        TransportStatus::Error => TransportResponse::failure(request, error.unwrap_or("boom")),
    }
}

async fn next_event(stream: &mut futures::stream::BoxStream<'static, String>) -> SseEvent {
    let raw = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .unwrap()
        .unwrap();
    serde_json::from_str(&raw).unwrap()
}

#[tokio::test]
async fn resolver_picks_sandbox_url_when_testing() {
    let fx = fixture(true).await;
    let resolver = CarrierResolver::new(fx.storage.clone());
    let info = resolver.resolve(fx.business_id).await.unwrap();
    assert_eq!(info.provider_code, "envioclick");
    assert_eq!(info.base_url, "https://sandbox.provider/");
    assert!(info.is_testing);

    let prod = fixture(false).await;
    let info = CarrierResolver::new(prod.storage.clone())
        .resolve(prod.business_id)
        .await
        .unwrap();
    assert_eq!(info.base_url, "https://api.provider/");
}

#[tokio::test]
async fn resolver_names_the_business_without_carrier() {
    let fx = fixture(false).await;
    let other = fx.storage.insert_business("Sin Envios SAS").await.unwrap();
    let err = CarrierResolver::new(fx.storage.clone())
        .resolve(other.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotConfigured);
    assert!(err.to_string().contains("Sin Envios SAS"));
}

#[tokio::test]
async fn quote_returns_rates_parked_by_the_consumer() {
    let fx = fixture(true).await;
    let coordinator = Arc::new(fx.coordinator(CoordinatorSettings {
        quote_timeout: Duration::from_secs(5),
        poll_interval: Duration::from_millis(10),
    }));
    let cancel = CancellationToken::new();

    let quoting = {
        let coordinator = coordinator.clone();
        let cancel = cancel.clone();
        let business_id = fx.business_id;
        tokio::spawn(async move {
            coordinator
                .quote(business_id, shipment_request(None), &cancel)
                .await
        })
    };

    let request = loop {
        if let Some(request) = fx.requests().pop() {
            break request;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    };
    assert_eq!(request.operation, TransportOperation::Quote);
    assert_eq!(request.base_url, "https://sandbox.provider/");
    assert!(request.is_test);
    assert!(request.timestamp.is_some());

    let rates = json!([{"carrier": "TCC", "total": 12000}]);
    fx.consumer()
        .process(&response(&request, TransportStatus::Success, Some(json!({"data": {"rates": rates.clone()}})), None))
        .await;

    let quotes = quoting.await.unwrap().unwrap();
    assert_eq!(quotes, rates);
}

#[tokio::test]
async fn quote_error_surfaces_as_quote_failed() {
    let fx = fixture(false).await;
    let coordinator = Arc::new(fx.coordinator(CoordinatorSettings {
        quote_timeout: Duration::from_secs(5),
        poll_interval: Duration::from_millis(10),
    }));
    let cancel = CancellationToken::new();
    let quoting = {
        let coordinator = coordinator.clone();
        let business_id = fx.business_id;
        tokio::spawn(async move { coordinator.quote(business_id, shipment_request(None), &cancel).await })
    };
    let request = loop {
        if let Some(request) = fx.requests().pop() {
            break request;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    };
    fx.consumer()
        .process(&response(&request, TransportStatus::Error, None, Some("destino sin cobertura")))
        .await;

    let err = quoting.await.unwrap().unwrap_err();
    assert!(matches!(err, ConectaError::QuoteFailed(ref m) if m == "destino sin cobertura"));
}

#[tokio::test(start_paused = true)]
async fn quote_result_just_before_deadline_is_returned() {
    let fx = fixture(false).await;
    let coordinator = fx.coordinator(CoordinatorSettings {
        quote_timeout: Duration::from_secs(30),
        poll_interval: Duration::from_millis(500),
    });
    let cache = fx.cache.clone();
    let broker = fx.broker.clone();
    tokio::spawn(async move {
        let request: TransportRequest = loop {
            if let Some(request) = broker.published_json(TRANSPORT_REQUESTS).pop() {
                break request;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        };
        tokio::time::sleep(Duration::from_millis(29_800)).await;
        let response = TransportResponse::success(&request, json!({"quotes": [{"total": 1}]}));
        cache
            .set(
                &quote_result_key(&request.correlation_id),
                serde_json::to_string(&response).unwrap(),
                Duration::from_secs(60),
            )
            .await
            .unwrap();
    });

    let quotes = coordinator
        .quote(fx.business_id, shipment_request(None), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(quotes, json!([{"total": 1}]));
}

#[tokio::test(start_paused = true)]
async fn quote_times_out_without_result() {
    let fx = fixture(false).await;
    let coordinator = fx.coordinator(CoordinatorSettings::default());
    let err = coordinator
        .quote(fx.business_id, shipment_request(None), &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        ConectaError::QuoteTimeout { waited } => assert!(waited >= Duration::from_secs(30)),
        other => panic!("expected timeout, got {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn cancelled_quote_returns_cancelled() {
    let fx = fixture(false).await;
    let coordinator = fx.coordinator(CoordinatorSettings::default());
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(2)).await;
        trigger.cancel();
    });
    let err = coordinator
        .quote(fx.business_id, shipment_request(None), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, ConectaError::Cancelled));
}

#[tokio::test]
async fn generate_then_response_syncs_order_before_event() {
    let fx = fixture(false).await;
    fx.storage.insert_order(&order("ord-abc", fx.business_id)).await.unwrap();
    let mut events = fx.pubsub.subscribe(conecta_bus::queues::SHIPMENT_EVENTS).await.unwrap();
    let coordinator = fx.coordinator(CoordinatorSettings::default());

    let ticket = coordinator
        .generate_guide(fx.business_id, shipment_request(Some("ord-abc")))
        .await
        .unwrap();
    let shipment_id = ticket.shipment_id.unwrap();
    let draft = fx.storage.get_shipment(shipment_id).await.unwrap().unwrap();
    assert_eq!(draft.status, ShipmentStatus::Draft);
    assert_eq!(draft.correlation_id.as_deref(), Some(ticket.correlation_id.as_str()));
    assert_eq!(draft.dimensions.weight, 1.0);

    let request = fx.requests().pop().unwrap();
    assert_eq!(request.operation, TransportOperation::Generate);
    assert_eq!(request.shipment_id, Some(shipment_id));
    assert!(!request.payload.contains_key("order_uuid"));

    let ok = response(
        &request,
        TransportStatus::Success,
        Some(json!({"tracker": "TRK-1", "url": "https://cdn/lbl.pdf"})),
        None,
    );
    let consumer = fx.consumer();
    consumer.process(&ok).await;

    let event = next_event(&mut events).await;
    assert_eq!(event.event_type, ShipmentEventType::GuideGenerated);
    assert_eq!(event.data["tracking_number"], "TRK-1");
    assert_eq!(event.data["guide_url"], "https://cdn/lbl.pdf");

    let shipment = fx.storage.get_shipment(shipment_id).await.unwrap().unwrap();
    assert_eq!(shipment.status, ShipmentStatus::Pending);
    assert_eq!(shipment.tracking_number.as_deref(), Some("TRK-1"));
    assert_eq!(shipment.guide_url.as_deref(), Some("https://cdn/lbl.pdf"));
    let stored_order = fx.storage.get_order("ord-abc").await.unwrap().unwrap();
    assert_eq!(stored_order.guide_link.as_deref(), Some("https://cdn/lbl.pdf"));
    assert_eq!(stored_order.tracking_number.as_deref(), Some("TRK-1"));

    // Redelivery of the same result leaves the same state.
    consumer.process(&ok).await;
    let again = fx.storage.get_shipment(shipment_id).await.unwrap().unwrap();
    assert_eq!(again.tracking_number, shipment.tracking_number);
    assert_eq!(again.guide_url, shipment.guide_url);
    assert_eq!(again.status, ShipmentStatus::Pending);
}

#[tokio::test]
async fn generate_error_marks_shipment_failed() {
    let fx = fixture(false).await;
    let mut events = fx.pubsub.subscribe(conecta_bus::queues::SHIPMENT_EVENTS).await.unwrap();
    let coordinator = fx.coordinator(CoordinatorSettings::default());
    let ticket = coordinator
        .generate_guide(fx.business_id, shipment_request(None))
        .await
        .unwrap();
    let request = fx.requests().pop().unwrap();

    fx.consumer()
        .process(&response(&request, TransportStatus::Error, None, Some("saldo insuficiente")))
        .await;

    let event = next_event(&mut events).await;
    assert_eq!(event.event_type, ShipmentEventType::GuideFailed);
    assert_eq!(event.data["error"], "saldo insuficiente");
    let shipment = fx
        .storage
        .get_shipment(ticket.shipment_id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(shipment.status, ShipmentStatus::Failed);
}

#[tokio::test]
async fn guide_is_not_kept_when_the_order_cannot_be_synced() {
    let fx = fixture(false).await;
    fx.storage.insert_order(&order("ord-abc", fx.business_id)).await.unwrap();
    let mut events = fx.pubsub.subscribe(conecta_bus::queues::SHIPMENT_EVENTS).await.unwrap();
    let ticket = fx
        .coordinator(CoordinatorSettings::default())
        .generate_guide(fx.business_id, shipment_request(Some("ord-abc")))
        .await
        .unwrap();
    let request = fx.requests().pop().unwrap();
    fx.storage
        .database()
        .connection()
        .call(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER reject_order_update BEFORE UPDATE ON orders
                 BEGIN SELECT RAISE(ABORT, 'orders are read-only'); END;",
            )
        })
        .await
        .unwrap();

    fx.consumer()
        .process(&response(
            &request,
            TransportStatus::Success,
            Some(json!({"tracker": "TRK-1", "url": "https://cdn/lbl.pdf"})),
            None,
        ))
        .await;

    assert_eq!(next_event(&mut events).await.event_type, ShipmentEventType::GuideFailed);
    let shipment = fx
        .storage
        .get_shipment(ticket.shipment_id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(shipment.status, ShipmentStatus::Draft);
    assert!(shipment.tracking_number.is_none());
    assert!(shipment.guide_url.is_none());
    let stored_order = fx.storage.get_order("ord-abc").await.unwrap().unwrap();
    assert!(stored_order.guide_link.is_none());
    assert!(stored_order.tracking_number.is_none());
}

#[tokio::test]
async fn cancelled_shipments_ignore_late_guides() {
    let fx = fixture(false).await;
    let mut events = fx.pubsub.subscribe(conecta_bus::queues::SHIPMENT_EVENTS).await.unwrap();
    let coordinator = fx.coordinator(CoordinatorSettings::default());
    let ticket = coordinator
        .generate_guide(fx.business_id, shipment_request(None))
        .await
        .unwrap();
    let request = fx.requests().pop().unwrap();
    let consumer = fx.consumer();

    let mut cancel = request.clone();
    cancel.operation = TransportOperation::Cancel;
    consumer
        .process(&response(&cancel, TransportStatus::Success, Some(json!({})), None))
        .await;
    assert_eq!(next_event(&mut events).await.event_type, ShipmentEventType::Cancelled);

    consumer
        .process(&response(&request, TransportStatus::Success, Some(json!({"tracker": "T", "url": "u"})), None))
        .await;
    assert_eq!(next_event(&mut events).await.event_type, ShipmentEventType::GuideFailed);
    let shipment = fx
        .storage
        .get_shipment(ticket.shipment_id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(shipment.status, ShipmentStatus::Cancelled);
    assert!(shipment.tracking_number.is_none());
}

#[tokio::test]
async fn track_and_cancel_resolve_by_tracking_number_or_id() {
    let fx = fixture(false).await;
    let coordinator = fx.coordinator(CoordinatorSettings::default());
    let ticket = coordinator
        .generate_guide(fx.business_id, shipment_request(None))
        .await
        .unwrap();
    let shipment_id = ticket.shipment_id.unwrap();

    // No guide yet.
    let err = coordinator.track(Some(fx.business_id), &shipment_id.to_string()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let request = fx.requests().pop().unwrap();
    fx.consumer()
        .process(&response(&request, TransportStatus::Success, Some(json!({"tracker": "TRK-9", "url": "u"})), None))
        .await;

    let by_tracker = coordinator.track(Some(fx.business_id), "TRK-9").await.unwrap();
    let track_request = fx.requests().pop().unwrap();
    assert_eq!(track_request.correlation_id, by_tracker.correlation_id);
    assert_eq!(track_request.operation, TransportOperation::Track);
    assert_eq!(track_request.payload["tracking_number"], "TRK-9");

    let by_id = coordinator.cancel(None, &shipment_id.to_string()).await.unwrap();
    let cancel_request = fx.requests().pop().unwrap();
    assert_eq!(cancel_request.correlation_id, by_id.correlation_id);
    assert_eq!(cancel_request.shipment_id, Some(shipment_id));

    let other_tenant = coordinator.track(Some(fx.business_id + 100), "TRK-9").await.unwrap_err();
    assert_eq!(other_tenant.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn default_origin_address_fills_missing_origin() {
    let fx = fixture(false).await;
    let coordinator = fx.coordinator(CoordinatorSettings::default());
    let mut request = shipment_request(None);
    request.origin = None;

    let err = coordinator.generate_guide(fx.business_id, request.clone()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    coordinator
        .addresses()
        .create(
            fx.business_id,
            &OriginAddressInput {
                alias: "Bodega".into(),
                contact_name: "Ana".into(),
                phone: "3001234567".into(),
                street: "Cra 7 # 12-34".into(),
                city: "Bogotá".into(),
                dane_code: "11001000".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    coordinator.generate_guide(fx.business_id, request).await.unwrap();
    let published = fx.requests().pop().unwrap();
    assert_eq!(published.payload["origin"]["dane_code"], "11001000");
    assert_eq!(published.payload["origin"]["city"], "Bogotá");
}

struct FakeCarrier;

#[async_trait]
impl CarrierClient for FakeCarrier {
    fn code(&self) -> &str {
        "envioclick"
    }
    async fn quote(&self, _: &CarrierContext, _: &Map<String, Value>) -> Result<Value, ConectaError> {
        Ok(json!({"rates": []}))
    }
    async fn generate(&self, ctx: &CarrierContext, _: &Map<String, Value>) -> Result<Value, ConectaError> {
        assert_eq!(ctx.credentials.get("api_key"), Some("K"));
        Ok(json!({"tracker": "TRK-1", "url": "https://cdn/lbl.pdf"}))
    }
    async fn track(&self, _: &CarrierContext, _: &Map<String, Value>) -> Result<Value, ConectaError> {
        Err(ConectaError::ProviderRejected {
            provider: "envioclick".into(),
            message: "unknown guide".into(),
            code: None,
        })
    }
    async fn cancel(&self, _: &CarrierContext, _: &Map<String, Value>) -> Result<Value, ConectaError> {
        Ok(json!({}))
    }
}

struct StaticCredentials;

#[async_trait]
impl CredentialSource for StaticCredentials {
    async fn credentials(&self, _: i64, code: &str) -> Result<Option<Credentials>, ConectaError> {
        Ok((code == "envioclick").then(|| {
            Credentials::new(json!({"api_key": "K"}).as_object().unwrap().clone())
        }))
    }
}

#[tokio::test]
async fn router_always_answers() {
    let broker = ChannelBroker::new();
    let router = TransportAdapterRouter::new(Arc::new(StaticCredentials), Arc::new(broker.clone()))
        .with_client(Arc::new(FakeCarrier));

    let mut request = TransportRequest {
        correlation_id: "c-gen".into(),
        business_id: 7,
        integration_id: 1,
        integration_type_id: 1,
        provider: "envioclick".into(),
        operation: TransportOperation::Generate,
        base_url: "https://sandbox.provider/".into(),
        is_test: true,
        payload: Map::new(),
        timestamp: None,
        shipment_id: Some(5),
    };
    router.handle(&serde_json::to_vec(&request).unwrap()).await.unwrap();

    request.correlation_id = "c-track".into();
    request.operation = TransportOperation::Track;
    router.handle(&serde_json::to_vec(&request).unwrap()).await.unwrap();

    request.correlation_id = "c-unknown".into();
    request.provider = "coordinadora".into();
    router.handle(&serde_json::to_vec(&request).unwrap()).await.unwrap();

    router.handle(b"garbage").await.unwrap();

    let responses: Vec<TransportResponse> = broker.published_json(TRANSPORT_RESPONSES);
    assert_eq!(responses.len(), 3);
    assert!(responses[0].is_success());
    assert_eq!(responses[0].shipment_id, Some(5));
    assert!(responses[0].is_test);
    assert_eq!(responses[1].status, TransportStatus::Error);
    assert!(responses[1].error_message().contains("unknown guide"));
    assert_eq!(responses[2].status, TransportStatus::Error);
    assert!(responses[2].error_message().contains("coordinadora"));
}
