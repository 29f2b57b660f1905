// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport request and response envelopes.
//!
//! `payload` and `data` are opaque carrier documents. They are only
//! inspected through the narrow extractors at the bottom of this module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Semantic carrier operation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransportOperation {
    Quote,
    Generate,
    Track,
    Cancel,
    /// Anything a newer producer sends that this build does not know.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransportStatus {
    Success,
    Error,
}

/// A carrier operation request published on `transport.requests`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportRequest {
    pub correlation_id: String,
    pub business_id: i64,
    pub integration_id: i64,
    pub integration_type_id: i64,
    /// Provider code; routes the request to a carrier adapter.
    pub provider: String,
    pub operation: TransportOperation,
    pub base_url: String,
    #[serde(default)]
    pub is_test: bool,
    #[serde(default)]
    pub payload: Map<String, Value>,
    /// Stamped by the publisher when absent.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipment_id: Option<i64>,
}

/// A carrier outcome published on `transport.responses`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportResponse {
    pub correlation_id: String,
    pub business_id: i64,
    pub provider: String,
    pub operation: TransportOperation,
    pub status: TransportStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub is_test: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipment_id: Option<i64>,
}

impl TransportResponse {
    /// A successful answer to `request`.
    pub fn success(request: &TransportRequest, data: Value) -> Self {
        Self::answer(request, TransportStatus::Success, Some(data), None)
    }

    /// A failed answer to `request`.
    pub fn failure(request: &TransportRequest, error: impl Into<String>) -> Self {
        Self::answer(request, TransportStatus::Error, None, Some(error.into()))
    }

    fn answer(
        request: &TransportRequest,
        status: TransportStatus,
        data: Option<Value>,
        error: Option<String>,
    ) -> Self {
        Self {
            correlation_id: request.correlation_id.clone(),
            business_id: request.business_id,
            provider: request.provider.clone(),
            operation: request.operation,
            status,
            data,
            error,
            is_test: request.is_test,
            timestamp: Utc::now(),
            shipment_id: request.shipment_id,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == TransportStatus::Success
    }

    /// The error text, or a generic one when the adapter sent none.
    pub fn error_message(&self) -> &str {
        self.error.as_deref().unwrap_or("carrier returned an error")
    }
}

/// Cache key under which a quote response is parked for the poller.
pub fn quote_result_key(correlation_id: &str) -> String {
    format!("shipment:quote:result:{correlation_id}")
}

/// Reads the label tracker and URL from a generate result.
///
/// Carriers put them either at the top level or inside a nested `data`
/// object. Numeric trackers are rendered as strings.
pub fn extract_tracker_and_url(data: &Value) -> (Option<String>, Option<String>) {
    let mut tracker = string_field(data, "tracker");
    let mut url = string_field(data, "url");
    if let Some(nested) = data.get("data") {
        if tracker.is_none() || url.is_none() {
            let (inner_tracker, inner_url) = extract_tracker_and_url(nested);
            tracker = tracker.or(inner_tracker);
            url = url.or(inner_url);
        }
    }
    (tracker, url)
}

/// Reads the rate list from a quote result.
pub fn extract_quotes(data: &Value) -> Value {
    if data.is_array() {
        return data.clone();
    }
    for key in ["quotes", "rates"] {
        if let Some(list) = data.get(key).filter(|v| v.is_array()) {
            return list.clone();
        }
    }
    match data.get("data") {
        Some(nested) => extract_quotes(nested),
        None => data.clone(),
    }
}

fn string_field(data: &Value, key: &str) -> Option<String> {
    match data.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn request(operation: TransportOperation) -> TransportRequest {
        TransportRequest {
            correlation_id: "c1".into(),
            business_id: 7,
            integration_id: 1,
            integration_type_id: 2,
            provider: "envioclick".into(),
            operation,
            base_url: "https://sandbox.provider/".into(),
            is_test: true,
            payload: Map::new(),
            timestamp: None,
            shipment_id: Some(9),
        }
    }

    #[test]
    fn tracker_and_url_at_top_level_or_nested() {
        let top = json!({"tracker": "TRK-1", "url": "https://cdn/lbl.pdf"});
        assert_eq!(
            extract_tracker_and_url(&top),
            (Some("TRK-1".into()), Some("https://cdn/lbl.pdf".into()))
        );

        let nested = json!({"status": "OK", "data": {"tracker": 123456, "url": "https://cdn/x.pdf"}});
        assert_eq!(
            extract_tracker_and_url(&nested),
            (Some("123456".into()), Some("https://cdn/x.pdf".into()))
        );

        assert_eq!(extract_tracker_and_url(&json!({"tracker": ""})), (None, None));
    }

    #[test]
    fn quotes_from_common_shapes() {
        let rates = json!([{"carrier": "TCC", "total": 12000}]);
        assert_eq!(extract_quotes(&rates), rates);
        assert_eq!(extract_quotes(&json!({"quotes": rates.clone()})), rates);
        assert_eq!(extract_quotes(&json!({"data": {"rates": rates.clone()}})), rates);
    }

    #[test]
    fn unknown_operations_deserialize() {
        let raw = json!({
            "correlation_id": "c1",
            "business_id": 7,
            "provider": "envioclick",
            "operation": "refund",
            "status": "success",
            "timestamp": "2026-01-01T00:00:00Z"
        });
        let response: TransportResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(response.operation, TransportOperation::Unknown);
        assert!(response.is_success());
    }

    #[test]
    fn responses_preserve_request_identity() {
        let req = request(TransportOperation::Generate);
        let ok = TransportResponse::success(&req, json!({"tracker": "T"}));
        assert_eq!(ok.correlation_id, "c1");
        assert_eq!(ok.shipment_id, Some(9));
        assert!(ok.is_test);

        let err = TransportResponse::failure(&req, "bad address");
        assert_eq!(err.status, TransportStatus::Error);
        assert_eq!(err.error_message(), "bad address");
        assert_eq!(quote_result_key("c1"), "shipment:quote:result:c1");
    }
}
