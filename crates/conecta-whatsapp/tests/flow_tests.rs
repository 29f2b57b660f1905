// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification matching, confirmation sends and reply handling against SQLite.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use conecta_bus::queues::{CONVERSATION_OUTCOMES, ORDER_CONFIRMATION_REQUESTED};
use conecta_bus::{ChannelBroker, MessageHandler};
use conecta_core::*;
use conecta_storage::{Database, SqliteStorage};
use conecta_vault::{CredentialSource, Credentials};
use conecta_whatsapp::*;
use serde_json::json;
use tower::ServiceExt;

/// Records every template instead of calling the Cloud API.
#[derive(Default)]
struct RecordingApi {
    sent: Mutex<Vec<(String, TemplateMessage)>>,
}

impl RecordingApi {
    fn templates(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(_, m)| m.name.clone()).collect()
    }
}

#[async_trait]
impl WhatsAppApi for RecordingApi {
    async fn send_template(
        &self,
        _sender: &SenderCredentials,
        to: &str,
        message: &TemplateMessage,
    ) -> Result<String, WhatsAppError> {
        let mut sent = self.sent.lock().unwrap();
        sent.push((to.to_string(), message.clone()));
        Ok(format!("wamid.{}", sent.len()))
    }
}

struct AnyBusiness;

#[async_trait]
impl CredentialSource for AnyBusiness {
    async fn credentials(&self, _business_id: i64, _code: &str) -> Result<Option<Credentials>, ConectaError> {
        let map = json!({"phone_number_id": "1099", "access_token": "EAAG"});
        Ok(Some(Credentials::new(map.as_object().unwrap().clone())))
    }
}

struct World {
    storage: Arc<SqliteStorage>,
    broker: Arc<ChannelBroker>,
    api: Arc<RecordingApi>,
    dispatcher: Arc<Dispatcher>,
    inbound: Arc<InboundHandler>,
    business_id: i64,
    integration_id: i64,
}

async fn world() -> World {
    let storage = Arc::new(SqliteStorage::new(Database::open_in_memory().await.unwrap()));
    let broker = Arc::new(ChannelBroker::new());
    let api = Arc::new(RecordingApi::default());
    let dispatcher = Arc::new(Dispatcher::new(
        storage.clone(),
        Arc::new(AnyBusiness),
        api.clone(),
        TemplateCatalog::default(),
        Duration::hours(24),
    ));
    let inbound = Arc::new(InboundHandler::new(storage.clone(), dispatcher.clone(), broker.clone()));

    let biz = storage.insert_business("Tienda Rosa").await.unwrap();
    let wa_type = storage
        .insert_integration_type(&IntegrationType {
            id: 0,
            code: "whatsapp".into(),
            name: "WhatsApp".into(),
            category: IntegrationCategory::Messaging,
            base_url: "https://graph.facebook.com".into(),
            base_url_test: None,
            platform_credentials: None,
        })
        .await
        .unwrap();
    let integration = storage
        .insert_integration(&NewIntegration {
            business_id: Some(biz.id),
            integration_type_id: wa_type,
            name: "WhatsApp".into(),
            is_active: true,
            is_testing: false,
            config: json!({}),
            credentials: None,
        })
        .await
        .unwrap();
    let now = Utc::now();
    storage
        .insert_order(&Order {
            id: "ord-abc".into(),
            business_id: biz.id,
            order_number: "1001".into(),
            customer_name: "Ana".into(),
            customer_phone: "+573001234567".into(),
            payment_method_id: Some(3),
            status: "paid".into(),
            integration_id: Some(1),
            total: 85000.0,
            currency: "COP".into(),
            guide_link: None,
            tracking_number: None,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();

    World {
        storage,
        broker,
        api,
        dispatcher,
        inbound,
        business_id: biz.id,
        integration_id: integration.id,
    }
}

fn config(integration_id: i64, priority: i64, conditions: NotificationConditions, template: &str) -> NewNotificationConfig {
    NewNotificationConfig {
        integration_id,
        notification_type: "whatsapp".into(),
        is_active: true,
        priority,
        conditions,
        config: NotificationTemplate {
            template_name: template.into(),
            language: "es".into(),
            recipient_type: "customer".into(),
        },
    }
}

fn reply(id: &str, text: &str) -> InboundMessage {
    InboundMessage {
        message_id: id.into(),
        from: "573001234567".into(),
        text: text.into(),
        timestamp: Utc::now(),
    }
}

#[tokio::test]
async fn most_specific_high_priority_config_fires_once() {
    let w = world().await;
    w.storage
        .insert_notification_config(&config(
            w.integration_id,
            10,
            NotificationConditions {
                trigger: "order.status_changed".into(),
                statuses: vec!["paid".into()],
                payment_methods: vec![3],
                source_integration_id: Some(1),
            },
            "pagado_confirmado",
        ))
        .await
        .unwrap();
    w.storage
        .insert_notification_config(&config(
            w.integration_id,
            5,
            NotificationConditions {
                trigger: "order.status_changed".into(),
                ..Default::default()
            },
            "generico",
        ))
        .await
        .unwrap();

    let consumer = OrderEventConsumer::new(w.storage.clone(), w.broker.clone());
    let event = json!({
        "type": "order.status_changed",
        "business_id": w.business_id,
        "order_id": "ord-abc",
        "status": "paid",
        "payment_method_id": 3,
        "source_integration_id": 1
    });
    consumer.handle(event.to_string().as_bytes()).await.unwrap();

    let requests: Vec<ConfirmationRequest> = w.broker.published_json(ORDER_CONFIRMATION_REQUESTED);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].template_name, "pagado_confirmado");
    assert_eq!(requests[0].phone, "+573001234567");
    assert_eq!(requests[0].total, 85000.0);
    assert_eq!(requests[0].currency, "COP");
}

#[tokio::test]
async fn events_without_business_or_integration_are_dropped() {
    let w = world().await;
    let consumer = OrderEventConsumer::new(w.storage.clone(), w.broker.clone());

    let none = consumer
        .process(&OrderEvent {
            event_type: "order.created".into(),
            business_id: None,
            order_id: Some("ord-abc".into()),
            order_number: None,
            status: None,
            payment_method_id: None,
            source_integration_id: None,
            timestamp: None,
        })
        .await
        .unwrap();
    assert!(none.is_none());

    let other = w.storage.insert_business("Sin WhatsApp").await.unwrap();
    let none = consumer
        .process(&OrderEvent {
            event_type: "order.created".into(),
            business_id: Some(other.id),
            order_id: Some("ord-abc".into()),
            order_number: None,
            status: None,
            payment_method_id: None,
            source_integration_id: None,
            timestamp: None,
        })
        .await
        .unwrap();
    assert!(none.is_none());
    assert!(w.broker.published(ORDER_CONFIRMATION_REQUESTED).is_empty());
}

async fn confirmed_conversation(w: &World) -> String {
    let consumer = ConfirmationConsumer::new(w.dispatcher.clone(), w.storage.clone());
    let receipt = consumer
        .process(&ConfirmationRequest {
            business_id: w.business_id,
            integration_id: w.integration_id,
            notification_config_id: 1,
            trigger: "order.created".into(),
            template_name: "confirmacion_pedido_contraentrega".into(),
            language: "es".into(),
            recipient_type: "customer".into(),
            phone: "+573001234567".into(),
            customer_name: "Ana".into(),
            order_id: "ord-abc".into(),
            order_number: "1001".into(),
            total: 85000.0,
            currency: "COP".into(),
            timestamp: Utc::now(),
        })
        .await
        .unwrap();
    receipt.conversation.id
}

#[tokio::test]
async fn initial_send_opens_the_dialogue_and_logs_the_message() {
    let w = world().await;
    let id = confirmed_conversation(&w).await;

    let conv = w.storage.get_conversation(&id).await.unwrap().unwrap();
    assert_eq!(conv.current_state, ConversationState::AwaitingConfirmation);
    assert_eq!(conv.last_message_id.as_deref(), Some("wamid.1"));
    assert_eq!(conv.last_template_id.as_deref(), Some("confirmacion_pedido_contraentrega"));
    assert_eq!(conv.expires_at - conv.created_at, Duration::hours(24));

    let sent = w.api.sent.lock().unwrap().clone();
    assert_eq!(sent[0].0, "573001234567");
    assert_eq!(sent[0].1.body_params, vec!["Ana", "1001", "$85.000 COP"]);

    let logs = w.storage.list_message_logs(&id).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, MessageStatus::Sent);
    assert_eq!(logs[0].direction, MessageDirection::Outbound);
}

#[tokio::test]
async fn cancellation_dialogue_ends_with_reason() {
    let w = world().await;
    let id = confirmed_conversation(&w).await;

    let steps = [
        ("in.1", "No confirmar", ConversationState::AwaitingMenuSelection),
        ("in.2", "Cancelar pedido", ConversationState::AwaitingCancelConfirm),
        ("in.3", "Sí, cancelar", ConversationState::AwaitingCancelReason),
        ("in.4", "Dirección incorrecta", ConversationState::Completed),
    ];
    for (msg_id, text, expected) in steps {
        match w.inbound.handle_reply(&reply(msg_id, text)).await.unwrap() {
            ReplyOutcome::Advanced { to, .. } => assert_eq!(to, expected, "after {text}"),
            other => panic!("unexpected {other:?} after {text}"),
        }
    }

    assert_eq!(
        w.api.templates(),
        vec![
            "confirmacion_pedido_contraentrega",
            "menu_no_confirmacion",
            "confirmar_cancelacion_pedido",
            "motivo_cancelacion",
            "pedido_cancelado",
        ]
    );
    let conv = w.storage.get_conversation(&id).await.unwrap().unwrap();
    assert_eq!(conv.current_state, ConversationState::Completed);
    assert_eq!(conv.metadata["cancellation_reason"], "Dirección incorrecta");
    // The closing reply is logged but does not touch the frozen conversation.
    assert_eq!(conv.last_template_id.as_deref(), Some("motivo_cancelacion"));
    let closing = w
        .storage
        .list_message_logs(&id)
        .await
        .unwrap()
        .into_iter()
        .filter(|l| l.template_name.as_deref() == Some("pedido_cancelado"))
        .count();
    assert_eq!(closing, 1);

    let outcomes: Vec<ConversationOutcome> = w.broker.published_json(CONVERSATION_OUTCOMES);
    assert_eq!(outcomes.len(), 1);
    assert_eq!(
        outcomes[0].outcome,
        Outcome::Cancelled {
            cancellation_reason: "Dirección incorrecta".into()
        }
    );

    let inbound = w
        .storage
        .list_message_logs(&id)
        .await
        .unwrap()
        .into_iter()
        .filter(|l| l.direction == MessageDirection::Inbound)
        .count();
    assert_eq!(inbound, 4);
}

#[tokio::test]
async fn concurrent_replies_advance_the_conversation_once() {
    let w = world().await;
    let id = confirmed_conversation(&w).await;
    w.inbound.handle_reply(&reply("in.1", "No confirmar")).await.unwrap();

    let reply_a = reply("in.2", "Cancelar pedido");
    let reply_b = reply("in.3", "Presentar novedad");
    let (a, b) = tokio::join!(
        w.inbound.handle_reply(&reply_a),
        w.inbound.handle_reply(&reply_b),
    );
    let outcomes = [a.unwrap(), b.unwrap()];
    let advanced = outcomes
        .iter()
        .filter(|o| matches!(o, ReplyOutcome::Advanced { .. }))
        .count();
    assert_eq!(advanced, 1, "{outcomes:?}");

    let conv = w.storage.get_conversation(&id).await.unwrap().unwrap();
    assert!(matches!(
        conv.current_state,
        ConversationState::AwaitingCancelConfirm | ConversationState::AwaitingNoveltyType
    ));
}

#[tokio::test]
async fn unknown_input_leaves_state_alone_and_duplicates_are_ignored() {
    let w = world().await;
    let id = confirmed_conversation(&w).await;

    let out = w.inbound.handle_reply(&reply("in.1", "¿cuándo llega?")).await.unwrap();
    assert_eq!(
        out,
        ReplyOutcome::Rejected {
            conversation_id: id.clone(),
            state: ConversationState::AwaitingConfirmation
        }
    );
    let again = w.inbound.handle_reply(&reply("in.1", "Confirmar pedido")).await.unwrap();
    assert_eq!(again, ReplyOutcome::Duplicate);

    let conv = w.storage.get_conversation(&id).await.unwrap().unwrap();
    assert_eq!(conv.current_state, ConversationState::AwaitingConfirmation);
}

#[tokio::test]
async fn terminal_or_expired_conversations_restart() {
    let w = world().await;
    let id = confirmed_conversation(&w).await;
    w.inbound.handle_reply(&reply("in.1", "Confirmar pedido")).await.unwrap();

    let out = w.inbound.handle_reply(&reply("in.2", "Hola otra vez")).await.unwrap();
    let ReplyOutcome::Restarted { conversation_id } = out else {
        panic!("expected restart, got {out:?}");
    };
    assert_ne!(conversation_id, id);
    let old = w.storage.get_conversation(&id).await.unwrap().unwrap();
    assert_eq!(old.current_state, ConversationState::Completed);
    let fresh = w.storage.get_conversation(&conversation_id).await.unwrap().unwrap();
    assert_eq!(fresh.current_state, ConversationState::Start);
    assert_eq!(fresh.order_number, "1001");

    let stale = Conversation::start(
        "stale".into(),
        "+573109998877",
        "2002",
        w.business_id,
        Utc::now() - Duration::hours(30),
        Duration::hours(24),
    );
    let mut stale = stale;
    stale.current_state = ConversationState::AwaitingConfirmation;
    w.storage.insert_conversation(&stale).await.unwrap();
    let out = w
        .inbound
        .handle_reply(&InboundMessage {
            message_id: "in.3".into(),
            from: "+573109998877".into(),
            text: "Confirmar pedido".into(),
            timestamp: Utc::now(),
        })
        .await
        .unwrap();
    assert!(matches!(out, ReplyOutcome::Restarted { .. }));
    let stale = w.storage.get_conversation("stale").await.unwrap().unwrap();
    assert_eq!(stale.current_state, ConversationState::AwaitingConfirmation);
}

#[tokio::test]
async fn dispatcher_rejects_bad_input_before_sending() {
    let w = world().await;
    let mut request = SendRequest {
        business_id: w.business_id,
        phone: "+573001234".into(),
        order_number: "1001".into(),
        template_name: "pedido_cancelado".into(),
        language: None,
        variables: [("order_number".to_string(), "1001".to_string())].into(),
    };
    let err = w.dispatcher.send(&request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    request.phone = "+573001234567".into();
    request.template_name = "no_existe".into();
    assert!(w.dispatcher.send(&request).await.is_err());
    assert!(w.api.templates().is_empty());
}

#[tokio::test]
async fn webhook_applies_replies_and_monotonic_statuses() {
    let w = world().await;
    let id = confirmed_conversation(&w).await;
    let router = webhook_router(WebhookState {
        inbound: w.inbound.clone(),
        verify_token: Some("tok".into()),
        app_secret: None,
    });

    let verify = router
        .clone()
        .oneshot(
            Request::get("/webhooks/whatsapp?hub.mode=subscribe&hub.verify_token=tok&hub.challenge=42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(verify.status(), StatusCode::OK);
    let bad = router
        .clone()
        .oneshot(
            Request::get("/webhooks/whatsapp?hub.mode=subscribe&hub.verify_token=nope&hub.challenge=42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(bad.status(), StatusCode::FORBIDDEN);

    let payload = json!({"entry": [{"changes": [{"value": {
        "messages": [{"id": "in.1", "from": "573001234567", "type": "button", "button": {"text": "No confirmar"}}],
        "statuses": [
            {"id": "wamid.1", "status": "read", "timestamp": "1700000100"},
            {"id": "wamid.1", "status": "delivered", "timestamp": "1700000050"}
        ]
    }}]}]});
    let resp = router
        .oneshot(
            Request::post("/webhooks/whatsapp")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let conv = w.storage.get_conversation(&id).await.unwrap().unwrap();
    assert_eq!(conv.current_state, ConversationState::AwaitingMenuSelection);
    let log = w.storage.get_message_log_by_message_id("wamid.1").await.unwrap().unwrap();
    assert_eq!(log.status, MessageStatus::Read);
}

#[tokio::test]
async fn webhook_rejects_bad_signature() {
    let w = world().await;
    let router = webhook_router(WebhookState {
        inbound: w.inbound.clone(),
        verify_token: None,
        app_secret: Some("app-secret".into()),
    });
    let resp = router
        .oneshot(
            Request::post("/webhooks/whatsapp")
                .header("x-hub-signature-256", "sha256=00")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
