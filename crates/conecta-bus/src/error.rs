// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use conecta_core::ConectaError;
use thiserror::Error;

/// Failures of the broker, pub/sub or cache clients.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("publish failed: {0}")]
    PublishFailed(String),

    #[error("subscribe failed: {0}")]
    Subscribe(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<BusError> for ConectaError {
    fn from(err: BusError) -> Self {
        ConectaError::Broker(err.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for BusError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_dropped() || err.is_connection_refusal() || err.is_io_error() {
            BusError::Connection(err.to_string())
        } else {
            BusError::Cache(err.to_string())
        }
    }
}
