// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shipment operations as seen by API callers.
//!
//! Quotes are synchronous: the request is published and the result cache
//! polled until the response consumer parks the answer there. Guide
//! generation, tracking and cancellation return immediately with a
//! correlation id; their outcomes arrive over SSE.

use std::sync::Arc;
use std::time::Duration;

use conecta_bus::ResultCache;
use conecta_config::model::TransportConfig;
use conecta_core::{
    ConectaError, NewShipment, Shipment, ShipmentCost, ShipmentStatus, Storage,
};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::addresses::AddressService;
use crate::carrier::{CarrierInfo, CarrierResolver};
use crate::envelope::{
    TransportOperation, TransportRequest, TransportResponse, extract_quotes, quote_result_key,
};
use crate::publisher::TransportPublisher;
use crate::request::{Place, ShipmentRequest};

#[derive(Debug, Clone, Copy)]
pub struct CoordinatorSettings {
    pub quote_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self::from(&TransportConfig::default())
    }
}

impl From<&TransportConfig> for CoordinatorSettings {
    fn from(config: &TransportConfig) -> Self {
        Self {
            quote_timeout: Duration::from_secs(config.quote_timeout_secs),
            poll_interval: Duration::from_millis(config.quote_poll_interval_ms.max(1)),
        }
    }
}

/// Handle for an operation whose outcome arrives over SSE.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ticket {
    pub correlation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipment_id: Option<i64>,
}

pub struct ShipmentCoordinator {
    storage: Arc<dyn Storage>,
    resolver: CarrierResolver,
    publisher: TransportPublisher,
    cache: Arc<dyn ResultCache>,
    addresses: AddressService,
    settings: CoordinatorSettings,
}

impl ShipmentCoordinator {
    pub fn new(
        storage: Arc<dyn Storage>,
        publisher: TransportPublisher,
        cache: Arc<dyn ResultCache>,
        settings: CoordinatorSettings,
    ) -> Self {
        Self {
            resolver: CarrierResolver::new(storage.clone()),
            addresses: AddressService::new(storage.clone()),
            storage,
            publisher,
            cache,
            settings,
        }
    }

    pub fn addresses(&self) -> &AddressService {
        &self.addresses
    }

    /// Publishes a quote request and waits for its result.
    ///
    /// The cache is polled every `poll_interval` and once more at the
    /// deadline. When `cancel` fires the poll in progress completes one
    /// cycle and the call returns [`ConectaError::Cancelled`].
    pub async fn quote(
        &self,
        business_id: i64,
        mut request: ShipmentRequest,
        cancel: &CancellationToken,
    ) -> Result<Value, ConectaError> {
        request.validate()?;
        let carrier = self.resolver.resolve(business_id).await?;
        self.fill_origin(business_id, &mut request).await?;

        let envelope = envelope(
            business_id,
            &carrier,
            TransportOperation::Quote,
            request.to_payload()?,
            None,
        );
        let cid = envelope.correlation_id.clone();
        self.publisher.publish(envelope).await?;

        let response = self.await_quote(&cid, cancel).await?;
        if response.is_success() {
            let quotes = response.data.as_ref().map(extract_quotes).unwrap_or(Value::Null);
            info!(correlation_id = %cid, business_id, "quote received");
            Ok(quotes)
        } else {
            warn!(correlation_id = %cid, business_id, error = %response.error_message(), "quote failed");
            Err(ConectaError::QuoteFailed(response.error_message().to_string()))
        }
    }

    async fn await_quote(
        &self,
        correlation_id: &str,
        cancel: &CancellationToken,
    ) -> Result<TransportResponse, ConectaError> {
        let key = quote_result_key(correlation_id);
        let started = Instant::now();
        let deadline = started + self.settings.quote_timeout;

        loop {
            if let Some(raw) = self.cache.get(&key).await? {
                let response: TransportResponse = serde_json::from_str(&raw)?;
                return Ok(response);
            }
            if cancel.is_cancelled() {
                debug!(correlation_id, "quote poll cancelled");
                return Err(ConectaError::Cancelled);
            }
            let now = Instant::now();
            if now >= deadline {
                warn!(correlation_id, "quote result did not arrive in time");
                return Err(ConectaError::QuoteTimeout {
                    waited: now - started,
                });
            }
            let wait = self.settings.poll_interval.min(deadline - now);
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = cancel.cancelled() => {}
            }
        }
    }

    /// Records a draft shipment and asks the carrier for a label.
    pub async fn generate_guide(
        &self,
        business_id: i64,
        mut request: ShipmentRequest,
    ) -> Result<Ticket, ConectaError> {
        request.validate()?;
        let carrier = self.resolver.resolve(business_id).await?;
        self.fill_origin(business_id, &mut request).await?;

        if let Some(order_id) = request.order_uuid.as_deref() {
            let order = self
                .storage
                .get_order(order_id)
                .await?
                .ok_or_else(|| ConectaError::not_found("order", order_id))?;
            if order.business_id != business_id {
                return Err(ConectaError::not_found("order", order_id));
            }
        }

        let shipping_cost = request.shipping_cost.unwrap_or_default();
        let insurance_cost = request.insurance_cost.unwrap_or_default();
        let correlation_id = new_correlation_id();
        let shipment = self
            .storage
            .insert_shipment(&NewShipment {
                business_id,
                order_id: request.order_uuid.clone(),
                carrier: carrier.provider_code.clone(),
                carrier_code: request.carrier_code.clone(),
                correlation_id: Some(correlation_id.clone()),
                cost: ShipmentCost {
                    shipping_cost,
                    insurance_cost,
                    declared_value: request.declared_value,
                    total_cost: shipping_cost + insurance_cost,
                },
                dimensions: request.aggregate_dimensions(),
                is_test: carrier.is_testing,
            })
            .await?;

        let mut envelope = envelope(
            business_id,
            &carrier,
            TransportOperation::Generate,
            request.to_payload()?,
            Some(shipment.id),
        );
        envelope.correlation_id = correlation_id.clone();
        self.publisher.publish(envelope).await?;

        info!(correlation_id = %correlation_id, business_id, shipment_id = shipment.id, "guide requested");
        Ok(Ticket {
            correlation_id,
            shipment_id: Some(shipment.id),
        })
    }

    /// Asks the carrier for tracking updates of a shipment.
    ///
    /// `scope` restricts the lookup to one business; `None` searches all.
    pub async fn track(&self, scope: Option<i64>, identifier: &str) -> Result<Ticket, ConectaError> {
        let shipment = self.find_shipment(scope, identifier).await?;
        let tracking_number = shipment
            .tracking_number
            .clone()
            .ok_or_else(|| ConectaError::invalid("identifier", "shipment has no guide yet"))?;
        let carrier = self.resolver.resolve(shipment.business_id).await?;

        let mut payload = Map::new();
        payload.insert("tracking_number".into(), json!(tracking_number));
        let envelope = envelope(
            shipment.business_id,
            &carrier,
            TransportOperation::Track,
            payload,
            Some(shipment.id),
        );
        let ticket = Ticket {
            correlation_id: envelope.correlation_id.clone(),
            shipment_id: Some(shipment.id),
        };
        self.publisher.publish(envelope).await?;
        Ok(ticket)
    }

    /// Asks the carrier to void a shipment's label.
    pub async fn cancel(&self, scope: Option<i64>, identifier: &str) -> Result<Ticket, ConectaError> {
        let shipment = self.find_shipment(scope, identifier).await?;
        if shipment.status == ShipmentStatus::Cancelled {
            return Err(ConectaError::PersistenceConflict(format!(
                "shipment {} is already cancelled",
                shipment.id
            )));
        }
        let tracking_number = shipment
            .tracking_number
            .clone()
            .ok_or_else(|| ConectaError::invalid("identifier", "shipment has no guide to cancel"))?;
        let carrier = self.resolver.resolve(shipment.business_id).await?;

        let mut payload = Map::new();
        payload.insert("tracking_number".into(), json!(tracking_number));
        let envelope = envelope(
            shipment.business_id,
            &carrier,
            TransportOperation::Cancel,
            payload,
            Some(shipment.id),
        );
        let ticket = Ticket {
            correlation_id: envelope.correlation_id.clone(),
            shipment_id: Some(shipment.id),
        };
        self.publisher.publish(envelope).await?;
        info!(correlation_id = %ticket.correlation_id, shipment_id = shipment.id, "cancellation requested");
        Ok(ticket)
    }

    pub async fn list(&self, business_id: i64) -> Result<Vec<Shipment>, ConectaError> {
        self.storage.list_shipments(business_id).await
    }

    /// Tracking number first, numeric shipment id as fallback.
    pub async fn find_shipment(
        &self,
        scope: Option<i64>,
        identifier: &str,
    ) -> Result<Shipment, ConectaError> {
        let identifier = identifier.trim();
        let mut found = self.storage.find_shipment_by_tracking_number(identifier).await?;
        if found.is_none() {
            if let Ok(id) = identifier.parse::<i64>() {
                found = self.storage.get_shipment(id).await?;
            }
        }
        match found {
            Some(shipment) if scope.is_none_or(|b| b == shipment.business_id) => Ok(shipment),
            _ => Err(ConectaError::not_found("shipment", identifier)),
        }
    }

    async fn fill_origin(
        &self,
        business_id: i64,
        request: &mut ShipmentRequest,
    ) -> Result<(), ConectaError> {
        if request.origin.is_some() {
            return Ok(());
        }
        let address = match request.origin_address_id {
            Some(id) => self.addresses.get(business_id, id).await?,
            None => self
                .addresses
                .default_address(business_id)
                .await?
                .ok_or_else(|| ConectaError::invalid("origin", "no origin given and no default origin address"))?,
        };
        request.origin = Some(Place::from(&address));
        Ok(())
    }
}

fn new_correlation_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn envelope(
    business_id: i64,
    carrier: &CarrierInfo,
    operation: TransportOperation,
    payload: Map<String, Value>,
    shipment_id: Option<i64>,
) -> TransportRequest {
    TransportRequest {
        correlation_id: new_correlation_id(),
        business_id,
        integration_id: carrier.integration_id,
        integration_type_id: carrier.integration_type_id,
        provider: carrier.provider_code.clone(),
        operation,
        base_url: carrier.base_url.clone(),
        is_test: carrier.is_testing,
        payload,
        timestamp: None,
        shipment_id,
    }
}
