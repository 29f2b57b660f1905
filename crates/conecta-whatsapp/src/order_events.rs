// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use conecta_bus::queues::ORDER_CONFIRMATION_REQUESTED;
use conecta_bus::{Broker, MessageHandler, publish_json};
use conecta_core::{ConectaError, Order, Storage};
use tracing::{debug, info, warn};

use crate::dispatcher::WHATSAPP_PROVIDER_CODE;
use crate::events::{ConfirmationRequest, OrderEvent};
use crate::matcher::{OrderFacts, first_match};

/// Turns order events into at most one WhatsApp notification request.
pub struct OrderEventConsumer {
    storage: Arc<dyn Storage>,
    broker: Arc<dyn Broker>,
}

impl OrderEventConsumer {
    pub fn new(storage: Arc<dyn Storage>, broker: Arc<dyn Broker>) -> Self {
        Self { storage, broker }
    }

    /// Matches the event and publishes the confirmation request, if any.
    pub async fn process(&self, event: &OrderEvent) -> Result<Option<ConfirmationRequest>, ConectaError> {
        let Some(business_id) = event.business_id else {
            warn!(event_type = %event.event_type, "order event without business_id dropped");
            return Ok(None);
        };
        let Some((integration, _)) = self
            .storage
            .active_integration_by_code(business_id, WHATSAPP_PROVIDER_CODE)
            .await?
        else {
            debug!(business_id, "no active WhatsApp integration");
            return Ok(None);
        };

        let configs = self
            .storage
            .active_notification_configs(integration.id, &event.event_type)
            .await?;
        if configs.is_empty() {
            debug!(business_id, integration_id = integration.id, trigger = %event.event_type, "no notification configs");
            return Ok(None);
        }

        let Some(order) = self.load_order(business_id, event).await? else {
            warn!(business_id, order_id = ?event.order_id, "order event for unknown order");
            return Ok(None);
        };

        let status = event.status.as_deref().unwrap_or(&order.status);
        let facts = OrderFacts {
            status,
            payment_method_id: event.payment_method_id.or(order.payment_method_id),
            source_integration_id: event.source_integration_id.or(order.integration_id),
        };
        let Some(config) = first_match(&configs, &facts) else {
            debug!(business_id, order_id = %order.id, status, "no notification config matched");
            return Ok(None);
        };

        let request = ConfirmationRequest {
            business_id,
            integration_id: integration.id,
            notification_config_id: config.id,
            trigger: event.event_type.clone(),
            template_name: config.config.template_name.clone(),
            language: config.config.language.clone(),
            recipient_type: config.config.recipient_type.clone(),
            phone: order.customer_phone.clone(),
            customer_name: order.customer_name.clone(),
            order_id: order.id.clone(),
            order_number: order.order_number.clone(),
            total: order.total,
            currency: order.currency.clone(),
            timestamp: Utc::now(),
        };
        publish_json(self.broker.as_ref(), ORDER_CONFIRMATION_REQUESTED, &request).await?;
        info!(
            business_id,
            order_id = %order.id,
            config_id = config.id,
            template = %request.template_name,
            "notification requested"
        );
        Ok(Some(request))
    }

    async fn load_order(&self, business_id: i64, event: &OrderEvent) -> Result<Option<Order>, ConectaError> {
        if let Some(id) = event.order_id.as_deref() {
            let order = self.storage.get_order(id).await?;
            return Ok(order.filter(|o| o.business_id == business_id));
        }
        match event.order_number.as_deref() {
            Some(number) => self.storage.get_order_by_number(business_id, number).await,
            None => Ok(None),
        }
    }
}

#[async_trait]
impl MessageHandler for OrderEventConsumer {
    async fn handle(&self, payload: &[u8]) -> Result<(), ConectaError> {
        let event: OrderEvent = match serde_json::from_slice(payload) {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "dropping malformed order event");
                return Ok(());
            }
        };
        self.process(&event).await.map(|_| ())
    }
}
