// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types shared by every Conecta component.
//!
//! Each component may define its own narrower error enum (vault, bus,
//! payment gateways) and convert into [`ConectaError`] at its boundary.
//! [`ConectaError::kind`] collapses the variants into the small set of
//! categories callers branch on, which also carries the HTTP status the
//! gateway maps them to.

use std::time::Duration;

use thiserror::Error;

/// The primary error type used across Conecta components.
#[derive(Debug, Error)]
pub enum ConectaError {
    /// Configuration errors (invalid TOML, missing keys, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (connection, query failure, row decoding).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The business has no active shipping integration.
    #[error("business '{business}' has no active shipping carrier")]
    NoActiveCarrier { business: String },

    /// The business has not configured something a flow depends on.
    #[error("business {business_id} has not configured {what}")]
    NotConfigured { business_id: i64, what: String },

    /// Caller supplied an invalid value.
    #[error("invalid {field}: {message}")]
    InvalidInput { field: String, message: String },

    /// An external provider rejected the request.
    #[error("{provider} rejected the request: {message}")]
    ProviderRejected {
        provider: String,
        message: String,
        code: Option<String>,
    },

    /// An external provider could not be reached or answered garbage.
    #[error("{provider} unavailable: {message}")]
    ProviderUnavailable {
        provider: String,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Message broker or pub/sub failure.
    #[error("broker error: {0}")]
    Broker(String),

    /// A write would violate a uniqueness or state invariant.
    #[error("persistence conflict: {0}")]
    PersistenceConflict(String),

    /// No quote result arrived before the deadline.
    #[error("no quote result after {waited:?}")]
    QuoteTimeout { waited: Duration },

    /// The carrier answered the quote with an error.
    #[error("quote failed: {0}")]
    QuoteFailed(String),

    /// The caller abandoned the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// A super-admin mutation did not identify a business.
    #[error("super admin must specify business_id")]
    SuperAdminBusinessRequired,

    /// Credentials are missing, undecryptable or malformed.
    #[error("credentials error: {0}")]
    Credentials(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    NotConfigured,
    ProviderRejected,
    ProviderUnavailable,
    Timeout,
    Cancelled,
    Conflict,
    Internal,
}

impl ErrorKind {
    /// HTTP status code the gateway answers with.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::NotConfigured => 422,
            ErrorKind::ProviderRejected => 422,
            ErrorKind::ProviderUnavailable => 502,
            ErrorKind::Timeout => 504,
            ErrorKind::Cancelled => 499,
            ErrorKind::Conflict => 409,
            ErrorKind::Internal => 500,
        }
    }
}

impl ConectaError {
    /// Wraps any error as a storage failure.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ConectaError::Storage {
            source: Box::new(err),
        }
    }

    /// Shorthand for [`ConectaError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        ConectaError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for [`ConectaError::InvalidInput`].
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConectaError::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns the category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConectaError::InvalidInput { .. } | ConectaError::SuperAdminBusinessRequired => {
                ErrorKind::Validation
            }
            ConectaError::NotFound { .. } => ErrorKind::NotFound,
            ConectaError::NoActiveCarrier { .. }
            | ConectaError::NotConfigured { .. }
            | ConectaError::Credentials(_) => ErrorKind::NotConfigured,
            ConectaError::ProviderRejected { .. } | ConectaError::QuoteFailed(_) => {
                ErrorKind::ProviderRejected
            }
            ConectaError::ProviderUnavailable { .. } | ConectaError::Broker(_) => {
                ErrorKind::ProviderUnavailable
            }
            ConectaError::QuoteTimeout { .. } | ConectaError::Timeout { .. } => ErrorKind::Timeout,
            ConectaError::Cancelled => ErrorKind::Cancelled,
            ConectaError::PersistenceConflict(_) => ErrorKind::Conflict,
            ConectaError::Config(_) | ConectaError::Storage { .. } | ConectaError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }
}

impl From<serde_json::Error> for ConectaError {
    fn from(err: serde_json::Error) -> Self {
        ConectaError::Internal(format!("json: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_statuses() {
        assert_eq!(
            ConectaError::invalid("phone", "too short").kind().http_status(),
            400
        );
        assert_eq!(ConectaError::not_found("shipment", 7).kind().http_status(), 404);
        assert_eq!(
            ConectaError::QuoteTimeout {
                waited: Duration::from_secs(30)
            }
            .kind(),
            ErrorKind::Timeout
        );
        assert_eq!(
            ConectaError::SuperAdminBusinessRequired.kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            ConectaError::PersistenceConflict("dup".into()).kind().http_status(),
            409
        );
    }

    #[test]
    fn no_active_carrier_names_the_business() {
        let err = ConectaError::NoActiveCarrier {
            business: "Tienda Rosa".into(),
        };
        assert_eq!(
            err.to_string(),
            "business 'Tienda Rosa' has no active shipping carrier"
        );
        assert_eq!(err.kind(), ErrorKind::NotConfigured);
    }

    #[test]
    fn storage_wraps_source() {
        let err = ConectaError::storage(std::io::Error::other("disk full"));
        assert!(err.to_string().contains("disk full"));
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}
