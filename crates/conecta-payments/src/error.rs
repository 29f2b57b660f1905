// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use conecta_core::ConectaError;
use thiserror::Error;

/// Why a gateway call failed, as reported in `PaymentResponse.error_code`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GatewayError {
    /// The business has no usable configuration for the gateway.
    #[error("{0}")]
    Config(String),

    /// The gateway answered with an error or could not be reached.
    #[error("{message}")]
    Api {
        message: String,
        status: Option<u16>,
    },

    /// Credentials are incomplete or were refused by the gateway.
    #[error("{0}")]
    InvalidCredentials(String),
}

impl GatewayError {
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Config(_) => "config_error",
            GatewayError::Api { .. } => "api_error",
            GatewayError::InvalidCredentials(_) => "invalid_credentials",
        }
    }

    pub fn api(message: impl Into<String>) -> Self {
        GatewayError::Api {
            message: message.into(),
            status: None,
        }
    }
}

impl From<GatewayError> for ConectaError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Config(message) | GatewayError::InvalidCredentials(message) => {
                ConectaError::Credentials(message)
            }
            GatewayError::Api { message, status } => ConectaError::ProviderRejected {
                provider: "payment gateway".into(),
                message,
                code: status.map(|s| s.to_string()),
            },
        }
    }
}
