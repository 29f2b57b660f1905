// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Router assembly and the HTTP listener.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Router, middleware};
use conecta_bus::PubSub;
use conecta_config::model::ServerConfig;
use conecta_core::{ConectaError, Storage};
use conecta_transport::ShipmentCoordinator;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::scope::{business_scope, claims_from_headers};
use crate::sse;

/// Shared state for the request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub coordinator: Arc<ShipmentCoordinator>,
    pub storage: Arc<dyn Storage>,
    pub pubsub: Arc<dyn PubSub>,
    /// Cancelled on shutdown; ends event streams and pending quotes.
    pub shutdown: CancellationToken,
}

/// Routes:
/// - GET /health (public)
/// - POST /v1/shipments/quote, POST /v1/shipments/generate
/// - GET /v1/shipments, GET /v1/shipments/track/{identifier}
/// - POST /v1/shipments/cancel/{identifier}
/// - /v1/origin-addresses CRUD and POST /v1/origin-addresses/{id}/default
/// - GET /v1/events
pub fn api_router(state: GatewayState) -> Router {
    let public_routes = Router::new().route("/health", get(handlers::health));

    let api_routes = Router::new()
        .route("/v1/shipments", get(handlers::list_shipments))
        .route("/v1/shipments/quote", post(handlers::quote))
        .route("/v1/shipments/generate", post(handlers::generate))
        .route("/v1/shipments/track/{identifier}", get(handlers::track))
        .route("/v1/shipments/cancel/{identifier}", post(handlers::cancel))
        .route(
            "/v1/origin-addresses",
            get(handlers::list_addresses).post(handlers::create_address),
        )
        .route(
            "/v1/origin-addresses/{id}",
            get(handlers::get_address)
                .put(handlers::update_address)
                .delete(handlers::delete_address),
        )
        .route(
            "/v1/origin-addresses/{id}/default",
            post(handlers::set_default_address),
        )
        .route("/v1/events", get(sse::events))
        .route_layer(middleware::from_fn_with_state(
            state.storage.clone(),
            business_scope,
        ))
        .route_layer(middleware::from_fn(claims_from_headers))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serves `app` until `shutdown` fires, then drains open connections.
pub async fn serve(
    config: &ServerConfig,
    app: Router,
    shutdown: CancellationToken,
) -> Result<(), ConectaError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ConectaError::Config(format!("failed to bind {addr}: {e}")))?;

    tracing::info!("HTTP server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| ConectaError::Internal(format!("HTTP server error: {e}")))?;

    tracing::info!("HTTP server stopped");
    Ok(())
}
