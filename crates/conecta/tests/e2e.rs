// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end scenarios across the whole fabric: HTTP in, broker and
//! pub/sub in the middle, storage and WhatsApp out.

use std::time::Duration;

use axum::body::Body;
use conecta_bus::SseEvent;
use conecta_bus::queues::{
    CONVERSATION_OUTCOMES, ORDER_CONFIRMATION_REQUESTED, TRANSPORT_REQUESTS,
};
use conecta_core::*;
use conecta_test_utils::{TestHarness, fixtures};
use conecta_transport::{TransportOperation, TransportRequest};
use conecta_vault::{CredentialVault, VaultError, VaultKey};
use conecta_whatsapp::{ConfirmationRequest, ConversationOutcome, Outcome};
use futures::StreamExt;
use futures::stream::BoxStream;
use http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

const WAIT: Duration = Duration::from_secs(5);

fn post(path: &str, business_id: i64, body: &Value) -> Request<Body> {
    Request::post(path)
        .header("content-type", "application/json")
        .header("x-business-id", business_id.to_string())
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn next_event(events: &mut BoxStream<'static, SseEvent>, event_type: &str) -> SseEvent {
    tokio::time::timeout(WAIT, async {
        loop {
            let event = events.next().await.expect("event stream closed");
            if event.event_type.as_ref() == event_type {
                return event;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("no {event_type} event"))
}

async fn shipping_business(h: &TestHarness, is_testing: bool) -> i64 {
    let business_id = fixtures::business(h.storage.as_ref(), "Tienda Ana").await.unwrap();
    fixtures::envioclick(h.storage.as_ref(), &h.vault, business_id, is_testing)
        .await
        .unwrap();
    business_id
}

#[tokio::test]
async fn quote_round_trip_uses_sandbox_and_publishes_event() {
    let mut h = TestHarness::new().await.unwrap();
    h.start().await;
    let business_id = shipping_business(&h, true).await;
    let mut events = h.shipment_events().await.unwrap();

    let resp = h
        .router()
        .oneshot(post(
            "/v1/shipments/quote",
            business_id,
            &fixtures::shipment_body(None),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    let rates = body["quotes"].as_array().unwrap();
    assert_eq!(rates.len(), 2);
    assert_eq!(rates[0]["carrier"], "Coordinadora");

    let requests: Vec<TransportRequest> = h.broker.published_json(TRANSPORT_REQUESTS);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].operation, TransportOperation::Quote);
    assert_eq!(requests[0].base_url, fixtures::SHIPPING_BASE_URL_TEST);
    assert!(requests[0].is_test);
    assert_eq!(requests[0].payload["destination"]["dane_code"], "05001000");

    let calls = h.carrier.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].base_url, fixtures::SHIPPING_BASE_URL_TEST);

    let event = next_event(&mut events, "shipment.quote_received").await;
    assert_eq!(event.business_id, business_id);
    assert_eq!(event.data["correlation_id"], requests[0].correlation_id.as_str());
    assert_eq!(event.data["quotes"].as_array().map(Vec::len), Some(2));
    h.stop().await;
}

#[tokio::test]
async fn generated_guide_is_persisted_before_its_event() {
    let mut h = TestHarness::new().await.unwrap();
    h.start().await;
    let business_id = shipping_business(&h, false).await;
    h.storage
        .insert_order(&fixtures::order("ord-abc", business_id, "1001"))
        .await
        .unwrap();
    let mut events = h.shipment_events().await.unwrap();

    let resp = h
        .router()
        .oneshot(post(
            "/v1/shipments/generate",
            business_id,
            &fixtures::shipment_body(Some("ord-abc")),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let ticket = json_body(resp).await;
    let shipment_id = ticket["shipment_id"].as_i64().unwrap();

    let event = next_event(&mut events, "shipment.guide_generated").await;
    assert_eq!(event.data["shipment_id"], shipment_id);
    assert_eq!(event.data["tracking_number"], "TRK-1");

    // The event only fires once both rows are written.
    let shipment = h.storage.get_shipment(shipment_id).await.unwrap().unwrap();
    assert_eq!(shipment.status, ShipmentStatus::Pending);
    assert_eq!(shipment.tracking_number.as_deref(), Some("TRK-1"));
    assert_eq!(shipment.guide_url.as_deref(), Some("https://cdn/lbl.pdf"));
    assert_eq!(shipment.order_id.as_deref(), Some("ord-abc"));
    let order = h.storage.get_order("ord-abc").await.unwrap().unwrap();
    assert_eq!(order.guide_link.as_deref(), Some("https://cdn/lbl.pdf"));
    assert_eq!(order.tracking_number.as_deref(), Some("TRK-1"));
    h.stop().await;
}

struct MessagingTenant {
    business_id: i64,
    integration_id: i64,
}

async fn messaging_business(h: &TestHarness) -> MessagingTenant {
    let business_id = fixtures::business(h.storage.as_ref(), "Tienda Rosa").await.unwrap();
    let integration = fixtures::whatsapp(h.storage.as_ref(), &h.vault, business_id)
        .await
        .unwrap();
    h.storage
        .insert_order(&fixtures::order("ord-abc", business_id, "1001"))
        .await
        .unwrap();
    MessagingTenant {
        business_id,
        integration_id: integration.id,
    }
}

#[tokio::test]
async fn order_event_fires_only_the_most_specific_notification() {
    let mut h = TestHarness::new().await.unwrap();
    h.start().await;
    let t = messaging_business(&h).await;
    h.storage
        .insert_notification_config(&fixtures::notification_config(
            t.integration_id,
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
    h.storage
        .insert_notification_config(&fixtures::notification_config(
            t.integration_id,
            5,
            NotificationConditions {
                trigger: "order.status_changed".into(),
                ..Default::default()
            },
            "generico",
        ))
        .await
        .unwrap();

    h.publish_order_event(&json!({
        "type": "order.status_changed",
        "business_id": t.business_id,
        "order_id": "ord-abc",
        "status": "paid",
        "payment_method_id": 3,
        "source_integration_id": 1
    }))
    .await
    .unwrap();

    let harness = &h;
    let sent = h
        .eventually(WAIT, move || async move {
            let templates = harness.whatsapp.templates();
            (!templates.is_empty()).then_some(templates)
        })
        .await
        .expect("no WhatsApp message sent");
    assert_eq!(sent, vec!["pagado_confirmado"]);

    let requests: Vec<ConfirmationRequest> = h.broker.published_json(ORDER_CONFIRMATION_REQUESTED);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].template_name, "pagado_confirmado");
    assert_eq!(requests[0].business_id, t.business_id);
    h.stop().await;
}

fn webhook_reply(id: &str, text: &str) -> Request<Body> {
    let payload = json!({"entry": [{"changes": [{"value": {"messages": [
        {"id": id, "from": "573001234567", "timestamp": "1700000000", "type": "button", "button": {"text": text}}
    ]}}]}]});
    Request::post("/webhooks/whatsapp")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

#[tokio::test]
async fn webhook_replies_walk_the_cancellation_path() {
    let mut h = TestHarness::new().await.unwrap();
    h.start().await;
    let t = messaging_business(&h).await;
    h.storage
        .insert_notification_config(&fixtures::notification_config(
            t.integration_id,
            1,
            NotificationConditions {
                trigger: "order.created".into(),
                ..Default::default()
            },
            "confirmacion_pedido_contraentrega",
        ))
        .await
        .unwrap();

    h.publish_order_event(&json!({
        "type": "order.created",
        "business_id": t.business_id,
        "order_id": "ord-abc"
    }))
    .await
    .unwrap();

    let harness = &h;
    let conversation_id = h
        .eventually(WAIT, move || async move {
            let conv = harness
                .storage
                .latest_conversation_for_phone("+573001234567")
                .await
                .ok()
                .flatten()?;
            (conv.current_state == ConversationState::AwaitingConfirmation).then_some(conv.id)
        })
        .await
        .expect("conversation never awaited confirmation");

    let router = h.router();
    let steps = [
        ("in.1", "No confirmar", ConversationState::AwaitingMenuSelection),
        ("in.2", "Cancelar pedido", ConversationState::AwaitingCancelConfirm),
        ("in.3", "Sí, cancelar", ConversationState::AwaitingCancelReason),
        ("in.4", "Dirección incorrecta", ConversationState::Completed),
    ];
    for (id, text, expected) in steps {
        let resp = router.clone().oneshot(webhook_reply(id, text)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let conv = h.storage.get_conversation(&conversation_id).await.unwrap().unwrap();
        assert_eq!(conv.current_state, expected, "after {text}");
    }

    assert_eq!(
        h.whatsapp.templates(),
        vec![
            "confirmacion_pedido_contraentrega",
            "menu_no_confirmacion",
            "confirmar_cancelacion_pedido",
            "motivo_cancelacion",
            "pedido_cancelado",
        ]
    );
    let conv = h.storage.get_conversation(&conversation_id).await.unwrap().unwrap();
    assert_eq!(conv.metadata["cancellation_reason"], "Dirección incorrecta");

    let outcomes: Vec<ConversationOutcome> = h.broker.published_json(CONVERSATION_OUTCOMES);
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].conversation_id, conversation_id);
    assert_eq!(
        outcomes[0].outcome,
        Outcome::Cancelled {
            cancellation_reason: "Dirección incorrecta".into()
        }
    );

    // A redelivered webhook changes nothing.
    let resp = router.oneshot(webhook_reply("in.4", "Dirección incorrecta")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(h.whatsapp.templates().len(), 5);
    h.stop().await;
}

#[tokio::test]
async fn sealed_credentials_open_and_tampering_is_detected() {
    let h = TestHarness::builder()
        .with_vault_secret("secret")
        .build()
        .await
        .unwrap();
    let plain = json!({"api_key": "K", "environment": "sandbox"});
    let mut envelope = h.vault.encrypt(plain.as_object().unwrap()).unwrap();
    assert_eq!(envelope.len(), 12 + plain.to_string().len() + 16);

    // A second vault built from the same key material opens it.
    let other = CredentialVault::new(VaultKey::from_material(b"secret"));
    let creds = other.decrypt(&envelope).unwrap();
    assert_eq!(creds.get("api_key"), Some("K"));
    assert_eq!(creds.get("environment"), Some("sandbox"));

    let last = envelope.len() - 1;
    envelope[last] ^= 0x01;
    assert!(matches!(other.decrypt(&envelope), Err(VaultError::DecryptFailed)));

    let wrong_key = CredentialVault::new(VaultKey::from_material(b"secreT"));
    let sealed = h.vault.encrypt(plain.as_object().unwrap()).unwrap();
    assert!(matches!(wrong_key.decrypt(&sealed), Err(VaultError::DecryptFailed)));
}

#[tokio::test]
async fn super_admin_business_comes_from_the_order() {
    let mut h = TestHarness::new().await.unwrap();
    h.start().await;
    let business_id = shipping_business(&h, false).await;
    h.storage
        .insert_order(&fixtures::order("ord-abc", business_id, "1001"))
        .await
        .unwrap();

    let resp = h
        .router()
        .oneshot(post(
            "/v1/shipments/generate",
            0,
            &fixtures::shipment_body(Some("ord-abc")),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let ticket = json_body(resp).await;
    let shipment_id = ticket["shipment_id"].as_i64().unwrap();

    // The handler saw the whole body: the shipment carries its order.
    let shipment = h.storage.get_shipment(shipment_id).await.unwrap().unwrap();
    assert_eq!(shipment.business_id, business_id);
    assert_eq!(shipment.order_id.as_deref(), Some("ord-abc"));
    let requests: Vec<TransportRequest> = h.broker.published_json(TRANSPORT_REQUESTS);
    assert_eq!(requests[0].business_id, business_id);

    let resp = h
        .router()
        .oneshot(post("/v1/shipments/generate", 0, &fixtures::shipment_body(None)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert_eq!(body["error"], "super admin must specify business_id");

    let resp = h
        .router()
        .oneshot(post(
            "/v1/shipments/generate",
            0,
            &fixtures::shipment_body(Some("ord-missing")),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    h.stop().await;
}
