// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Caller-facing shipment request bodies.

use conecta_core::{ConectaError, Dimensions, OriginAddress};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One end of a shipment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Place {
    /// DANE municipality code.
    pub dane_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl From<&OriginAddress> for Place {
    fn from(address: &OriginAddress) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            dane_code: address.dane_code.clone(),
            city: non_empty(&address.city),
            address: non_empty(&address.street),
            contact_name: non_empty(&address.contact_name),
            phone: non_empty(&address.phone),
            email: non_empty(&address.email),
        }
    }
}

/// Body of a quote or guide request.
///
/// Fields the carrier needs beyond these travel untouched in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShipmentRequest {
    /// Order the shipment fulfills; also identifies the business for super admins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_uuid: Option<String>,
    /// Stored origin address; the business default is used when both this and `origin` are absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_address_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Place>,
    pub destination: Place,
    pub packages: Vec<Dimensions>,
    pub declared_value: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Rate chosen from a previous quote (guide requests only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurance_cost: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_currency() -> String {
    "COP".to_string()
}

/// DANE codes are five digits, optionally extended to eight.
pub fn is_dane_code(code: &str) -> bool {
    matches!(code.len(), 5 | 8) && code.bytes().all(|b| b.is_ascii_digit())
}

impl ShipmentRequest {
    pub fn validate(&self) -> Result<(), ConectaError> {
        if let Some(origin) = &self.origin {
            if !is_dane_code(&origin.dane_code) {
                return Err(ConectaError::invalid("origin.dane_code", "must be a DANE code"));
            }
        }
        if !is_dane_code(&self.destination.dane_code) {
            return Err(ConectaError::invalid(
                "destination.dane_code",
                "must be a DANE code",
            ));
        }
        if self.packages.is_empty() {
            return Err(ConectaError::invalid("packages", "at least one package is required"));
        }
        for (i, p) in self.packages.iter().enumerate() {
            if p.weight <= 0.0 || p.length <= 0.0 || p.width <= 0.0 || p.height <= 0.0 {
                return Err(ConectaError::invalid(
                    format!("packages[{i}]"),
                    "weight and dimensions must be positive",
                ));
            }
        }
        if !(self.declared_value >= 0.0) {
            return Err(ConectaError::invalid("declared_value", "must not be negative"));
        }
        Ok(())
    }

    /// Total weight and the largest box, for the shipment record.
    pub fn aggregate_dimensions(&self) -> Dimensions {
        self.packages.iter().fold(Dimensions::default(), |acc, p| Dimensions {
            weight: acc.weight + p.weight,
            length: acc.length.max(p.length),
            width: acc.width.max(p.width),
            height: acc.height.max(p.height),
        })
    }

    /// The carrier payload; `order_uuid` and stored-address ids stay local.
    pub fn to_payload(&self) -> Result<Map<String, Value>, ConectaError> {
        let mut value = serde_json::to_value(self)?;
        if let Some(map) = value.as_object_mut() {
            map.remove("order_uuid");
            map.remove("origin_address_id");
        }
        match value {
            Value::Object(map) => Ok(map),
            _ => Err(ConectaError::Internal("shipment request is not an object".into())),
        }
    }
}
