// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Carrier side of the transport fabric.
//!
//! The [`TransportAdapterRouter`] consumes `transport.requests`, hands each
//! envelope to the [`CarrierClient`] registered for its provider code and
//! always answers on `transport.responses`.

use async_trait::async_trait;
use conecta_core::ConectaError;
use conecta_vault::Credentials;
use serde_json::{Map, Value};

pub mod envioclick;
pub mod router;

pub use envioclick::EnvioClickClient;
pub use router::TransportAdapterRouter;

/// Per-request context handed to a carrier client.
#[derive(Debug, Clone)]
pub struct CarrierContext {
    pub business_id: i64,
    pub base_url: String,
    pub is_test: bool,
    pub credentials: Credentials,
}

/// The four semantic carrier operations.
#[async_trait]
pub trait CarrierClient: Send + Sync {
    /// Provider code this client serves (`envioclick`).
    fn code(&self) -> &str;

    async fn quote(&self, ctx: &CarrierContext, payload: &Map<String, Value>)
    -> Result<Value, ConectaError>;

    async fn generate(
        &self,
        ctx: &CarrierContext,
        payload: &Map<String, Value>,
    ) -> Result<Value, ConectaError>;

    async fn track(&self, ctx: &CarrierContext, payload: &Map<String, Value>)
    -> Result<Value, ConectaError>;

    async fn cancel(
        &self,
        ctx: &CarrierContext,
        payload: &Map<String, Value>,
    ) -> Result<Value, ConectaError>;
}
