// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messages this crate consumes and produces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state_machine::Outcome;

/// An order lifecycle event from `orders.events`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    /// `order.created`, `order.updated` or `order.status_changed`.
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub business_id: Option<i64>,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_method_id: Option<i64>,
    #[serde(default)]
    pub source_integration_id: Option<i64>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// A matched notification waiting to be sent, on `orders.confirmation.requested`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationRequest {
    pub business_id: i64,
    pub integration_id: i64,
    pub notification_config_id: i64,
    pub trigger: String,
    pub template_name: String,
    pub language: String,
    pub recipient_type: String,
    pub phone: String,
    pub customer_name: String,
    pub order_id: String,
    pub order_number: String,
    pub total: f64,
    pub currency: String,
    pub timestamp: DateTime<Utc>,
}

/// A finished conversation, on `whatsapp.conversation.outcomes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationOutcome {
    pub conversation_id: String,
    pub business_id: i64,
    pub order_number: String,
    pub phone_number: String,
    #[serde(flatten)]
    pub outcome: Outcome,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn order_event_uses_type_field_and_ignores_extras() {
        let event: OrderEvent = serde_json::from_value(json!({
            "type": "order.status_changed",
            "business_id": 7,
            "order_id": "ord-abc",
            "status": "paid",
            "payment_method_id": 3,
            "source_integration_id": 1,
            "channel": "shopify"
        }))
        .unwrap();
        assert_eq!(event.event_type, "order.status_changed");
        assert_eq!(event.business_id, Some(7));
    }

    #[test]
    fn outcome_is_flattened() {
        let out = ConversationOutcome {
            conversation_id: "c1".into(),
            business_id: 7,
            order_number: "1001".into(),
            phone_number: "+573001234567".into(),
            outcome: Outcome::Cancelled {
                cancellation_reason: "Dirección incorrecta".into(),
            },
            timestamp: Utc::now(),
        };
        let v = serde_json::to_value(&out).unwrap();
        assert_eq!(v["outcome"], "cancelled");
        assert_eq!(v["cancellation_reason"], "Dirección incorrecta");
    }
}
