// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A request to collect a payment through one gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub payment_transaction_id: i64,
    pub business_id: i64,
    pub gateway_code: String,
    pub amount: f64,
    pub currency: String,
    pub reference: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub correlation_id: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentStatus {
    /// Link or intent created; waiting for the customer.
    Pending,
    Approved,
    Failed,
}

/// Unified answer of every gateway, published on `pay.responses`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub payment_transaction_id: i64,
    pub gateway_code: String,
    pub status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    /// Checkout URL the customer pays at, when the gateway issues one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,
    #[serde(default)]
    pub gateway_response: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    pub correlation_id: String,
    pub processing_time_ms: u64,
}

/// What a gateway returns for a created payment.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayOutcome {
    pub status: PaymentStatus,
    pub external_id: Option<String>,
    pub payment_url: Option<String>,
    pub raw: Value,
}

/// Amount in minor units (cents), rounded.
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minor_units_round() {
        assert_eq!(to_minor_units(100000.0), 10_000_000);
        assert_eq!(to_minor_units(19.999), 2000);
        assert_eq!(to_minor_units(0.1 + 0.2), 30);
    }
}
