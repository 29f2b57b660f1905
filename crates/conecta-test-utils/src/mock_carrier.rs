// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted carrier client.
//!
//! Answers come from a per-operation FIFO queue; an empty queue falls back
//! to a canned success. Every call is recorded.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use conecta_core::ConectaError;
use conecta_transport::{CarrierClient, CarrierContext, TransportOperation};
use serde_json::{Map, Value, json};

/// One recorded carrier call.
#[derive(Debug, Clone)]
pub struct CarrierCall {
    pub operation: TransportOperation,
    pub business_id: i64,
    pub base_url: String,
    pub is_test: bool,
    pub payload: Map<String, Value>,
}

pub struct MockCarrier {
    code: String,
    scripted: Mutex<HashMap<TransportOperation, VecDeque<Result<Value, String>>>>,
    calls: Mutex<Vec<CarrierCall>>,
}

impl MockCarrier {
    /// A mock registered under the `envioclick` provider code.
    pub fn new() -> Self {
        Self::with_code("envioclick")
    }

    pub fn with_code(code: &str) -> Self {
        Self {
            code: code.to_string(),
            scripted: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queues a successful answer for the next `operation` call.
    pub fn respond(&self, operation: TransportOperation, data: Value) {
        self.push(operation, Ok(data));
    }

    /// Queues a provider rejection for the next `operation` call.
    pub fn fail(&self, operation: TransportOperation, message: &str) {
        self.push(operation, Err(message.to_string()));
    }

    pub fn calls(&self) -> Vec<CarrierCall> {
        lock(&self.calls).clone()
    }

    fn push(&self, operation: TransportOperation, answer: Result<Value, String>) {
        lock(&self.scripted)
            .entry(operation)
            .or_default()
            .push_back(answer);
    }

    fn answer(
        &self,
        operation: TransportOperation,
        ctx: &CarrierContext,
        payload: &Map<String, Value>,
    ) -> Result<Value, ConectaError> {
        lock(&self.calls).push(CarrierCall {
            operation,
            business_id: ctx.business_id,
            base_url: ctx.base_url.clone(),
            is_test: ctx.is_test,
            payload: payload.clone(),
        });
        let scripted = lock(&self.scripted)
            .get_mut(&operation)
            .and_then(VecDeque::pop_front);
        match scripted {
            Some(Ok(data)) => Ok(data),
            Some(Err(message)) => Err(ConectaError::ProviderRejected {
                provider: self.code.clone(),
                message,
                code: None,
            }),
            None => Ok(default_answer(operation, payload)),
        }
    }
}

impl Default for MockCarrier {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn default_answer(operation: TransportOperation, payload: &Map<String, Value>) -> Value {
    match operation {
        TransportOperation::Quote => json!({
            "rates": [
                {"carrier": "Coordinadora", "service": "estandar", "total": 12000},
                {"carrier": "TCC", "service": "express", "total": 18500}
            ]
        }),
        TransportOperation::Generate => json!({
            "tracker": "TRK-1",
            "url": "https://cdn/lbl.pdf"
        }),
        TransportOperation::Track => json!({
            "tracking_number": payload.get("tracking_number").cloned().unwrap_or(Value::Null),
            "status": "in_transit",
            "events": [{"description": "En tránsito", "city": "Bogotá"}]
        }),
        TransportOperation::Cancel => json!({"cancelled": true}),
        TransportOperation::Unknown => Value::Null,
    }
}

#[async_trait]
impl CarrierClient for MockCarrier {
    fn code(&self) -> &str {
        &self.code
    }

    async fn quote(&self, ctx: &CarrierContext, payload: &Map<String, Value>) -> Result<Value, ConectaError> {
        self.answer(TransportOperation::Quote, ctx, payload)
    }

    async fn generate(&self, ctx: &CarrierContext, payload: &Map<String, Value>) -> Result<Value, ConectaError> {
        self.answer(TransportOperation::Generate, ctx, payload)
    }

    async fn track(&self, ctx: &CarrierContext, payload: &Map<String, Value>) -> Result<Value, ConectaError> {
        self.answer(TransportOperation::Track, ctx, payload)
    }

    async fn cancel(&self, ctx: &CarrierContext, payload: &Map<String, Value>) -> Result<Value, ConectaError> {
        self.answer(TransportOperation::Cancel, ctx, payload)
    }
}

#[cfg(test)]
mod tests {
    use conecta_vault::Credentials;

    use super::*;

    fn ctx() -> CarrierContext {
        CarrierContext {
            business_id: 7,
            base_url: "https://sandbox.provider/".into(),
            is_test: true,
            credentials: Credentials::new(Map::new()),
        }
    }

    #[tokio::test]
    async fn scripted_answers_come_first_then_defaults() {
        let carrier = MockCarrier::new();
        carrier.fail(TransportOperation::Generate, "sin cobertura");

        let err = carrier.generate(&ctx(), &Map::new()).await.unwrap_err();
        assert!(err.to_string().contains("sin cobertura"));
        let ok = carrier.generate(&ctx(), &Map::new()).await.unwrap();
        assert_eq!(ok["tracker"], "TRK-1");

        let calls = carrier.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|c| c.is_test && c.business_id == 7));
    }
}
