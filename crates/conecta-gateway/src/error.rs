// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use conecta_core::{ConectaError, ErrorKind};
use serde::{Deserialize, Serialize};

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Error category, e.g. `validation` or `not_configured`.
    pub kind: String,
}

/// A [`ConectaError`] rendered with the status of its kind.
#[derive(Debug)]
pub struct ApiError(pub ConectaError);

impl From<ConectaError> for ApiError {
    fn from(err: ConectaError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status =
            StatusCode::from_u16(kind.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let error = if kind == ErrorKind::Internal {
            tracing::error!(error = %self.0, "request failed");
            "internal error".to_string()
        } else {
            tracing::debug!(error = %self.0, %status, "request rejected");
            self.0.to_string()
        };
        (
            status,
            Json(ErrorResponse {
                error,
                kind: kind.to_string(),
            }),
        )
            .into_response()
    }
}
