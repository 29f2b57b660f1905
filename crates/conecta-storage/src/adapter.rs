// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the repository traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use conecta_config::model::StorageConfig;
use conecta_core::{
    AddressRepository, Business, BusinessRepository, ConectaError, Conversation,
    ConversationRepository, ConversationState, Integration, IntegrationCategory,
    IntegrationRepository, IntegrationType, MessageLog, MessageLogRepository, MessageStatus,
    NewIntegration, NewNotificationConfig, NewShipment, NotificationConfig,
    NotificationConfigRepository, Order, OrderRepository, OriginAddress, OriginAddressInput,
    Shipment, ShipmentRepository,
};
use tracing::debug;

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage delegating to the typed query modules.
#[derive(Clone)]
pub struct SqliteStorage {
    db: Database,
}

impl SqliteStorage {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Opens the configured database file and runs migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, ConectaError> {
        let db = Database::open_with(&config.database_path, config.wal_mode).await?;
        debug!(path = %config.database_path, "SQLite storage initialized");
        Ok(Self { db })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Flushes the WAL before shutdown.
    pub async fn close(&self) -> Result<(), ConectaError> {
        self.db.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl BusinessRepository for SqliteStorage {
    async fn insert_business(&self, name: &str) -> Result<Business, ConectaError> {
        queries::businesses::insert_business(&self.db, name).await
    }

    async fn get_business(&self, id: i64) -> Result<Option<Business>, ConectaError> {
        queries::businesses::get_business(&self.db, id).await
    }
}

#[async_trait]
impl IntegrationRepository for SqliteStorage {
    async fn insert_integration_type(&self, ty: &IntegrationType) -> Result<i64, ConectaError> {
        queries::integrations::insert_integration_type(&self.db, ty).await
    }

    async fn get_integration_type(&self, id: i64) -> Result<Option<IntegrationType>, ConectaError> {
        queries::integrations::get_integration_type(&self.db, id).await
    }

    async fn get_integration_type_by_code(
        &self,
        code: &str,
    ) -> Result<Option<IntegrationType>, ConectaError> {
        queries::integrations::get_integration_type_by_code(&self.db, code).await
    }

    async fn insert_integration(&self, new: &NewIntegration) -> Result<Integration, ConectaError> {
        queries::integrations::insert_integration(&self.db, new).await
    }

    async fn get_integration(&self, id: i64) -> Result<Option<Integration>, ConectaError> {
        queries::integrations::get_integration(&self.db, id).await
    }

    async fn set_integration_active(&self, id: i64, active: bool) -> Result<(), ConectaError> {
        queries::integrations::set_integration_active(&self.db, id, active).await
    }

    async fn active_integrations_by_category(
        &self,
        business_id: i64,
        category: IntegrationCategory,
    ) -> Result<Vec<(Integration, IntegrationType)>, ConectaError> {
        queries::integrations::active_integrations_by_category(&self.db, business_id, category)
            .await
    }

    async fn active_integration_by_code(
        &self,
        business_id: i64,
        code: &str,
    ) -> Result<Option<(Integration, IntegrationType)>, ConectaError> {
        queries::integrations::active_integration_by_code(&self.db, business_id, code).await
    }
}

#[async_trait]
impl OrderRepository for SqliteStorage {
    async fn insert_order(&self, order: &Order) -> Result<(), ConectaError> {
        queries::orders::insert_order(&self.db, order).await
    }

    async fn get_order(&self, id: &str) -> Result<Option<Order>, ConectaError> {
        queries::orders::get_order(&self.db, id).await
    }

    async fn get_order_by_number(
        &self,
        business_id: i64,
        order_number: &str,
    ) -> Result<Option<Order>, ConectaError> {
        queries::orders::get_order_by_number(&self.db, business_id, order_number).await
    }
}

#[async_trait]
impl ShipmentRepository for SqliteStorage {
    async fn insert_shipment(&self, new: &NewShipment) -> Result<Shipment, ConectaError> {
        queries::shipments::insert_shipment(&self.db, new).await
    }

    async fn get_shipment(&self, id: i64) -> Result<Option<Shipment>, ConectaError> {
        queries::shipments::get_shipment(&self.db, id).await
    }

    async fn find_shipment_by_tracking_number(
        &self,
        tracking_number: &str,
    ) -> Result<Option<Shipment>, ConectaError> {
        queries::shipments::find_by_tracking_number(&self.db, tracking_number).await
    }

    async fn update_shipment(&self, shipment: &Shipment) -> Result<(), ConectaError> {
        queries::shipments::update_shipment(&self.db, shipment).await
    }

    async fn apply_guide(&self, shipment: &Shipment) -> Result<(), ConectaError> {
        queries::shipments::apply_guide(&self.db, shipment).await
    }

    async fn list_shipments(&self, business_id: i64) -> Result<Vec<Shipment>, ConectaError> {
        queries::shipments::list_shipments(&self.db, business_id).await
    }
}

#[async_trait]
impl AddressRepository for SqliteStorage {
    async fn create_address(
        &self,
        business_id: i64,
        input: &OriginAddressInput,
    ) -> Result<OriginAddress, ConectaError> {
        queries::addresses::create_address(&self.db, business_id, input).await
    }

    async fn get_address(
        &self,
        business_id: i64,
        id: i64,
    ) -> Result<Option<OriginAddress>, ConectaError> {
        queries::addresses::get_address(&self.db, business_id, id).await
    }

    async fn list_addresses(&self, business_id: i64) -> Result<Vec<OriginAddress>, ConectaError> {
        queries::addresses::list_addresses(&self.db, business_id).await
    }

    async fn update_address(
        &self,
        business_id: i64,
        id: i64,
        input: &OriginAddressInput,
    ) -> Result<OriginAddress, ConectaError> {
        queries::addresses::update_address(&self.db, business_id, id, input).await
    }

    async fn set_default_address(&self, business_id: i64, id: i64) -> Result<(), ConectaError> {
        queries::addresses::set_default_address(&self.db, business_id, id).await
    }

    async fn delete_address(&self, business_id: i64, id: i64) -> Result<(), ConectaError> {
        queries::addresses::delete_address(&self.db, business_id, id).await
    }
}

#[async_trait]
impl NotificationConfigRepository for SqliteStorage {
    async fn insert_notification_config(
        &self,
        new: &NewNotificationConfig,
    ) -> Result<NotificationConfig, ConectaError> {
        queries::notification_configs::insert_notification_config(&self.db, new).await
    }

    async fn active_notification_configs(
        &self,
        integration_id: i64,
        trigger: &str,
    ) -> Result<Vec<NotificationConfig>, ConectaError> {
        queries::notification_configs::active_configs(&self.db, integration_id, trigger).await
    }
}

#[async_trait]
impl ConversationRepository for SqliteStorage {
    async fn insert_conversation(&self, conversation: &Conversation) -> Result<(), ConectaError> {
        queries::conversations::insert_conversation(&self.db, conversation).await
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, ConectaError> {
        queries::conversations::get_conversation(&self.db, id).await
    }

    async fn get_conversation_by_phone_and_order(
        &self,
        phone_number: &str,
        order_number: &str,
    ) -> Result<Option<Conversation>, ConectaError> {
        queries::conversations::get_by_phone_and_order(&self.db, phone_number, order_number).await
    }

    async fn latest_conversation_for_phone(
        &self,
        phone_number: &str,
    ) -> Result<Option<Conversation>, ConectaError> {
        queries::conversations::latest_for_phone(&self.db, phone_number).await
    }

    async fn update_conversation_state(
        &self,
        id: &str,
        from: ConversationState,
        to: ConversationState,
        metadata: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<bool, ConectaError> {
        queries::conversations::update_state(&self.db, id, from, to, metadata).await
    }

    async fn record_outbound_message(
        &self,
        id: &str,
        message_id: &str,
        template_name: &str,
    ) -> Result<(), ConectaError> {
        queries::conversations::record_outbound(&self.db, id, message_id, template_name).await
    }
}

#[async_trait]
impl MessageLogRepository for SqliteStorage {
    async fn insert_message_log(&self, log: &MessageLog) -> Result<(), ConectaError> {
        queries::message_logs::insert_message_log(&self.db, log).await
    }

    async fn get_message_log_by_message_id(
        &self,
        message_id: &str,
    ) -> Result<Option<MessageLog>, ConectaError> {
        queries::message_logs::get_by_message_id(&self.db, message_id).await
    }

    async fn update_message_status(
        &self,
        message_id: &str,
        status: MessageStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, ConectaError> {
        queries::message_logs::update_status(&self.db, message_id, status, at).await
    }

    async fn list_message_logs(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<MessageLog>, ConectaError> {
        queries::message_logs::list_for_conversation(&self.db, conversation_id).await
    }
}
