// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable queue and pub/sub channel names.

/// Shipping requests, routed to carrier adapters by the envelope `provider`.
pub const TRANSPORT_REQUESTS: &str = "transport.requests";

/// Carrier adapter results, consumed by the response consumer.
pub const TRANSPORT_RESPONSES: &str = "transport.responses";

/// Unified results of every payment gateway.
pub const PAY_RESPONSES: &str = "pay.responses";

/// Matched order notifications waiting to be sent over WhatsApp.
pub const ORDER_CONFIRMATION_REQUESTED: &str = "orders.confirmation.requested";

/// Terminal outcomes of WhatsApp order conversations.
pub const CONVERSATION_OUTCOMES: &str = "whatsapp.conversation.outcomes";

/// Pub/sub channel carrying order lifecycle events.
pub const ORDER_EVENTS: &str = "orders.events";

/// Pub/sub channel the SSE endpoint fans out to browsers.
pub const SHIPMENT_EVENTS: &str = "shipments.events";

/// Request queue of a single payment gateway, e.g. `pay.bold.requests`.
pub fn payment_requests(gateway: &str) -> String {
    format!("pay.{gateway}.requests")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_queue_names() {
        assert_eq!(payment_requests("bold"), "pay.bold.requests");
        assert_eq!(payment_requests("mercadopago"), "pay.mercadopago.requests");
    }
}
