// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use conecta_vault::Credentials;
use serde_json::Value;

use crate::types::PaymentRequest;

pub(crate) fn request(gateway: &str) -> PaymentRequest {
    PaymentRequest {
        payment_transaction_id: 11,
        business_id: 7,
        gateway_code: gateway.into(),
        amount: 85000.0,
        currency: "COP".into(),
        reference: "ORD-1001".into(),
        description: "Pedido 1001".into(),
        metadata: Default::default(),
        correlation_id: "c-1".into(),
        timestamp: None,
    }
}

pub(crate) fn creds(v: Value) -> Credentials {
    Credentials::new(v.as_object().cloned().unwrap_or_default())
}
