// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cloud API webhook: subscription handshake, replies and status events.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use conecta_core::MessageStatus;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, warn};

use crate::inbound::{InboundHandler, InboundMessage};

pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

#[derive(Clone)]
pub struct WebhookState {
    pub inbound: Arc<InboundHandler>,
    pub verify_token: Option<String>,
    pub app_secret: Option<String>,
}

/// `GET` answers the subscription challenge, `POST` receives events.
pub fn webhook_router(state: WebhookState) -> Router {
    Router::new()
        .route("/webhooks/whatsapp", get(verify).post(receive))
        .with_state(state)
}

async fn verify(
    State(state): State<WebhookState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let mode = params.get("hub.mode").map(String::as_str);
    let token = params.get("hub.verify_token");
    let challenge = params.get("hub.challenge");
    match (&state.verify_token, mode, token, challenge) {
        (Some(expected), Some("subscribe"), Some(token), Some(challenge)) if token == expected => {
            debug!("webhook subscription verified");
            (StatusCode::OK, challenge.clone()).into_response()
        }
        _ => {
            warn!("webhook verification rejected");
            StatusCode::FORBIDDEN.into_response()
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum SignatureError {
    Missing,
    Malformed,
    Mismatch,
}

/// Checks `sha256=<hex>` against HMAC-SHA256 of the raw body.
pub fn verify_signature(secret: &str, body: &[u8], header: Option<&str>) -> Result<(), SignatureError> {
    let header = header.ok_or(SignatureError::Missing)?;
    let hex_sig = header.strip_prefix("sha256=").ok_or(SignatureError::Malformed)?;
    let expected = hex::decode(hex_sig).map_err(|_| SignatureError::Malformed)?;
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Malformed)?;
    mac.update(body);
    mac.verify_slice(&expected).map_err(|_| SignatureError::Mismatch)
}

async fn receive(State(state): State<WebhookState>, headers: HeaderMap, body: Bytes) -> StatusCode {
    if let Some(secret) = state.app_secret.as_deref() {
        let header = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
        if let Err(e) = verify_signature(secret, &body, header) {
            warn!(reason = ?e, "webhook signature rejected");
            return StatusCode::UNAUTHORIZED;
        }
    }
    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "unparseable webhook payload");
            return StatusCode::BAD_REQUEST;
        }
    };

    for value in payload.entry.iter().flat_map(|e| e.changes.iter()).map(|c| &c.value) {
        for message in &value.messages {
            let Some(inbound) = message.to_inbound() else {
                debug!(kind = %message.kind, "ignoring non-reply message");
                continue;
            };
            if let Err(e) = state.inbound.handle_reply(&inbound).await {
                warn!(message_id = %inbound.message_id, error = %e, "failed to handle reply");
            }
        }
        for status in &value.statuses {
            let Ok(parsed) = MessageStatus::from_str(&status.status) else {
                debug!(status = %status.status, "ignoring unknown status");
                continue;
            };
            let at = parse_timestamp(&status.timestamp);
            if let Err(e) = state.inbound.apply_status(&status.id, parsed, at).await {
                warn!(message_id = %status.id, error = %e, "failed to apply status");
            }
        }
    }
    StatusCode::OK
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or_else(Utc::now)
}

#[derive(Debug, Default, Deserialize)]
struct WebhookPayload {
    #[serde(default)]
    entry: Vec<Entry>,
}

#[derive(Debug, Default, Deserialize)]
struct Entry {
    #[serde(default)]
    changes: Vec<Change>,
}

#[derive(Debug, Default, Deserialize)]
struct Change {
    #[serde(default)]
    value: ChangeValue,
}

#[derive(Debug, Default, Deserialize)]
struct ChangeValue {
    #[serde(default)]
    messages: Vec<WireMessage>,
    #[serde(default)]
    statuses: Vec<WireStatus>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    id: String,
    from: String,
    #[serde(default)]
    timestamp: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: Option<TextBody>,
    #[serde(default)]
    button: Option<ButtonBody>,
    #[serde(default)]
    interactive: Option<InteractiveBody>,
}

#[derive(Debug, Deserialize)]
struct TextBody {
    body: String,
}

#[derive(Debug, Deserialize)]
struct ButtonBody {
    text: String,
}

#[derive(Debug, Deserialize)]
struct InteractiveBody {
    #[serde(default)]
    button_reply: Option<ReplyTitle>,
    #[serde(default)]
    list_reply: Option<ReplyTitle>,
}

#[derive(Debug, Deserialize)]
struct ReplyTitle {
    title: String,
}

#[derive(Debug, Deserialize)]
struct WireStatus {
    id: String,
    status: String,
    #[serde(default)]
    timestamp: String,
}

impl WireMessage {
    fn to_inbound(&self) -> Option<InboundMessage> {
        let text = self
            .text
            .as_ref()
            .map(|t| t.body.clone())
            .or_else(|| self.button.as_ref().map(|b| b.text.clone()))
            .or_else(|| {
                self.interactive.as_ref().and_then(|i| {
                    i.button_reply
                        .as_ref()
                        .or(i.list_reply.as_ref())
                        .map(|r| r.title.clone())
                })
            })?;
        Some(InboundMessage {
            message_id: self.id.clone(),
            from: self.from.clone(),
            text,
            timestamp: parse_timestamp(&self.timestamp),
        })
    }
}
