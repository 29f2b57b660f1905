// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use conecta_core::{ConectaError, ConversationState};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WhatsAppError {
    #[error("template '{0}' is not in the catalog")]
    TemplateNotFound(String),

    #[error("template '{template}' requires variable '{variable}'")]
    MissingVariable { template: String, variable: String },

    #[error("invalid phone number '{number}': {reason}")]
    InvalidPhoneNumber { number: String, reason: String },

    #[error("input '{input}' is not an option in state {state}")]
    InvalidStateTransition {
        state: ConversationState,
        input: String,
    },

    /// The Cloud API refused the message.
    #[error("WhatsApp API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The Cloud API could not be reached.
    #[error("WhatsApp API unreachable: {0}")]
    Unavailable(String),
}

impl From<WhatsAppError> for ConectaError {
    fn from(err: WhatsAppError) -> Self {
        match err {
            WhatsAppError::TemplateNotFound(_) | WhatsAppError::MissingVariable { .. } => {
                ConectaError::invalid("template", err.to_string())
            }
            WhatsAppError::InvalidPhoneNumber { .. } => ConectaError::invalid("phone", err.to_string()),
            WhatsAppError::InvalidStateTransition { .. } => {
                ConectaError::invalid("reply", err.to_string())
            }
            WhatsAppError::Api { status, message } => ConectaError::ProviderRejected {
                provider: "whatsapp".into(),
                message,
                code: Some(status.to_string()),
            },
            WhatsAppError::Unavailable(message) => ConectaError::ProviderUnavailable {
                provider: "whatsapp".into(),
                message,
                source: None,
            },
        }
    }
}
