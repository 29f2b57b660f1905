// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shipment and origin-address handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use conecta_core::{OriginAddress, OriginAddressInput, Shipment};
use conecta_transport::{ShipmentRequest, Ticket};
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::scope::BusinessScope;
use crate::server::GatewayState;

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub quotes: Value,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// The body's `business_id` only selects the scope; carriers never see it.
fn strip_scope_fields(request: &mut ShipmentRequest) {
    request.extra.remove("business_id");
}

/// POST /v1/shipments/quote
///
/// Waits for the carrier's rates; shutdown abandons the wait.
pub async fn quote(
    State(state): State<GatewayState>,
    Extension(scope): Extension<BusinessScope>,
    Json(mut body): Json<ShipmentRequest>,
) -> Result<Json<QuoteResponse>, ApiError> {
    let business_id = scope.require()?;
    strip_scope_fields(&mut body);
    let cancel = state.shutdown.child_token();
    let quotes = state.coordinator.quote(business_id, body, &cancel).await?;
    Ok(Json(QuoteResponse { quotes }))
}

/// POST /v1/shipments/generate
pub async fn generate(
    State(state): State<GatewayState>,
    Extension(scope): Extension<BusinessScope>,
    Json(mut body): Json<ShipmentRequest>,
) -> Result<(StatusCode, Json<Ticket>), ApiError> {
    let business_id = scope.require()?;
    strip_scope_fields(&mut body);
    let ticket = state.coordinator.generate_guide(business_id, body).await?;
    Ok((StatusCode::ACCEPTED, Json(ticket)))
}

/// GET /v1/shipments/track/{identifier}
pub async fn track(
    State(state): State<GatewayState>,
    Extension(scope): Extension<BusinessScope>,
    Path(identifier): Path<String>,
) -> Result<(StatusCode, Json<Ticket>), ApiError> {
    let ticket = state
        .coordinator
        .track(scope.business_id(), &identifier)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(ticket)))
}

/// POST /v1/shipments/cancel/{identifier}
pub async fn cancel(
    State(state): State<GatewayState>,
    Extension(scope): Extension<BusinessScope>,
    Path(identifier): Path<String>,
) -> Result<(StatusCode, Json<Ticket>), ApiError> {
    let ticket = state
        .coordinator
        .cancel(scope.business_id(), &identifier)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(ticket)))
}

/// GET /v1/shipments
pub async fn list_shipments(
    State(state): State<GatewayState>,
    Extension(scope): Extension<BusinessScope>,
) -> Result<Json<Vec<Shipment>>, ApiError> {
    let business_id = scope.require()?;
    Ok(Json(state.coordinator.list(business_id).await?))
}

/// GET /v1/origin-addresses
pub async fn list_addresses(
    State(state): State<GatewayState>,
    Extension(scope): Extension<BusinessScope>,
) -> Result<Json<Vec<OriginAddress>>, ApiError> {
    let business_id = scope.require()?;
    Ok(Json(state.coordinator.addresses().list(business_id).await?))
}

/// POST /v1/origin-addresses
pub async fn create_address(
    State(state): State<GatewayState>,
    Extension(scope): Extension<BusinessScope>,
    Json(input): Json<OriginAddressInput>,
) -> Result<(StatusCode, Json<OriginAddress>), ApiError> {
    let business_id = scope.require()?;
    let address = state.coordinator.addresses().create(business_id, &input).await?;
    Ok((StatusCode::CREATED, Json(address)))
}

/// GET /v1/origin-addresses/{id}
pub async fn get_address(
    State(state): State<GatewayState>,
    Extension(scope): Extension<BusinessScope>,
    Path(id): Path<i64>,
) -> Result<Json<OriginAddress>, ApiError> {
    let business_id = scope.require()?;
    Ok(Json(state.coordinator.addresses().get(business_id, id).await?))
}

/// PUT /v1/origin-addresses/{id}
pub async fn update_address(
    State(state): State<GatewayState>,
    Extension(scope): Extension<BusinessScope>,
    Path(id): Path<i64>,
    Json(input): Json<OriginAddressInput>,
) -> Result<Json<OriginAddress>, ApiError> {
    let business_id = scope.require()?;
    Ok(Json(
        state
            .coordinator
            .addresses()
            .update(business_id, id, &input)
            .await?,
    ))
}

/// POST /v1/origin-addresses/{id}/default
pub async fn set_default_address(
    State(state): State<GatewayState>,
    Extension(scope): Extension<BusinessScope>,
    Path(id): Path<i64>,
) -> Result<Json<OriginAddress>, ApiError> {
    let business_id = scope.require()?;
    Ok(Json(
        state.coordinator.addresses().set_default(business_id, id).await?,
    ))
}

/// DELETE /v1/origin-addresses/{id}
pub async fn delete_address(
    State(state): State<GatewayState>,
    Extension(scope): Extension<BusinessScope>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let business_id = scope.require()?;
    state.coordinator.addresses().delete(business_id, id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
