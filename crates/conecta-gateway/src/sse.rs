// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! GET /v1/events: the shipment event stream of one business.
//!
//! Each client gets its own subscription to the shipment events channel.
//! Events of other businesses are filtered out here. An unscoped super
//! admin sees everything. Streams end when the server shuts down.

use std::convert::Infallible;

use axum::Extension;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use conecta_bus::SseEvent;
use conecta_bus::queues::SHIPMENT_EVENTS;
use conecta_core::ConectaError;
use futures::{Stream, StreamExt, future};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::scope::BusinessScope;
use crate::server::GatewayState;

pub async fn events(
    State(state): State<GatewayState>,
    Extension(scope): Extension<BusinessScope>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let raw = state
        .pubsub
        .subscribe(SHIPMENT_EVENTS)
        .await
        .map_err(ConectaError::from)?;
    let business_id = scope.business_id();
    debug!(?business_id, "event stream opened");

    let stream = raw
        .take_until(state.shutdown.clone().cancelled_owned())
        .filter_map(move |payload| future::ready(to_event(&payload, business_id)))
        .map(Ok);
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// The SSE frame for `payload`, if it belongs to `business_id`.
pub fn to_event(payload: &str, business_id: Option<i64>) -> Option<Event> {
    let event: SseEvent = match serde_json::from_str(payload) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "skipping malformed shipment event");
            return None;
        }
    };
    if business_id.is_some_and(|id| id != event.business_id) {
        return None;
    }
    Event::default()
        .id(event.id.clone())
        .event(event.event_type.as_ref())
        .json_data(&event)
        .ok()
}
