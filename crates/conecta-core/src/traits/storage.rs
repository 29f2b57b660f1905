// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Repository traits for the records the integration fabric touches.
//!
//! Components depend on [`Storage`] (or a single repository trait) rather
//! than on a concrete backend, so tests can swap in a temp database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ConectaError;
use crate::types::{
    Business, Conversation, ConversationState, Integration, IntegrationCategory, IntegrationType,
    MessageLog, MessageStatus, NewIntegration, NewNotificationConfig, NewShipment,
    NotificationConfig, Order, OriginAddress, OriginAddressInput, Shipment,
};

#[async_trait]
pub trait BusinessRepository: Send + Sync {
    async fn insert_business(&self, name: &str) -> Result<Business, ConectaError>;

    async fn get_business(&self, id: i64) -> Result<Option<Business>, ConectaError>;
}

#[async_trait]
pub trait IntegrationRepository: Send + Sync {
    /// Seeds a catalog entry.
    async fn insert_integration_type(&self, ty: &IntegrationType) -> Result<i64, ConectaError>;

    async fn get_integration_type(&self, id: i64)
    -> Result<Option<IntegrationType>, ConectaError>;

    async fn get_integration_type_by_code(
        &self,
        code: &str,
    ) -> Result<Option<IntegrationType>, ConectaError>;

    /// Creates an integration. Fails with `PersistenceConflict` when an
    /// active shipping integration already exists for the same
    /// (business, type).
    async fn insert_integration(&self, new: &NewIntegration) -> Result<Integration, ConectaError>;

    async fn get_integration(&self, id: i64) -> Result<Option<Integration>, ConectaError>;

    /// Toggles `is_active` under the same uniqueness rule as insertion.
    async fn set_integration_active(&self, id: i64, active: bool) -> Result<(), ConectaError>;

    /// Active integrations of a business in a category, most recently
    /// updated first, joined with their catalog entry.
    async fn active_integrations_by_category(
        &self,
        business_id: i64,
        category: IntegrationCategory,
    ) -> Result<Vec<(Integration, IntegrationType)>, ConectaError>;

    /// The business's active integration of a given provider code.
    async fn active_integration_by_code(
        &self,
        business_id: i64,
        code: &str,
    ) -> Result<Option<(Integration, IntegrationType)>, ConectaError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn insert_order(&self, order: &Order) -> Result<(), ConectaError>;

    async fn get_order(&self, id: &str) -> Result<Option<Order>, ConectaError>;

    async fn get_order_by_number(
        &self,
        business_id: i64,
        order_number: &str,
    ) -> Result<Option<Order>, ConectaError>;
}

#[async_trait]
pub trait ShipmentRepository: Send + Sync {
    /// Inserts a shipment in `draft` status.
    async fn insert_shipment(&self, new: &NewShipment) -> Result<Shipment, ConectaError>;

    async fn get_shipment(&self, id: i64) -> Result<Option<Shipment>, ConectaError>;

    async fn find_shipment_by_tracking_number(
        &self,
        tracking_number: &str,
    ) -> Result<Option<Shipment>, ConectaError>;

    /// Overwrites the mutable fields of a shipment.
    async fn update_shipment(&self, shipment: &Shipment) -> Result<(), ConectaError>;

    /// Saves a shipment carrying a generated guide and copies `guide_url` and
    /// the stored tracking number onto its linked order, in one transaction.
    async fn apply_guide(&self, shipment: &Shipment) -> Result<(), ConectaError>;

    async fn list_shipments(&self, business_id: i64) -> Result<Vec<Shipment>, ConectaError>;
}

#[async_trait]
pub trait AddressRepository: Send + Sync {
    /// Inserts an address; the first one of a business becomes its default.
    async fn create_address(
        &self,
        business_id: i64,
        input: &OriginAddressInput,
    ) -> Result<OriginAddress, ConectaError>;

    async fn get_address(
        &self,
        business_id: i64,
        id: i64,
    ) -> Result<Option<OriginAddress>, ConectaError>;

    async fn list_addresses(&self, business_id: i64) -> Result<Vec<OriginAddress>, ConectaError>;

    async fn update_address(
        &self,
        business_id: i64,
        id: i64,
        input: &OriginAddressInput,
    ) -> Result<OriginAddress, ConectaError>;

    /// Makes `id` the default, clearing the previous default atomically.
    async fn set_default_address(&self, business_id: i64, id: i64) -> Result<(), ConectaError>;

    /// Deletes a non-default address.
    async fn delete_address(&self, business_id: i64, id: i64) -> Result<(), ConectaError>;
}

#[async_trait]
pub trait NotificationConfigRepository: Send + Sync {
    async fn insert_notification_config(
        &self,
        new: &NewNotificationConfig,
    ) -> Result<NotificationConfig, ConectaError>;

    /// Active configs for an integration whose trigger matches, by
    /// priority descending then insertion order.
    async fn active_notification_configs(
        &self,
        integration_id: i64,
        trigger: &str,
    ) -> Result<Vec<NotificationConfig>, ConectaError>;
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn insert_conversation(&self, conversation: &Conversation) -> Result<(), ConectaError>;

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, ConectaError>;

    /// Most recently created conversation for (phone, order).
    async fn get_conversation_by_phone_and_order(
        &self,
        phone_number: &str,
        order_number: &str,
    ) -> Result<Option<Conversation>, ConectaError>;

    /// Most recently created conversation for a phone, any order.
    async fn latest_conversation_for_phone(
        &self,
        phone_number: &str,
    ) -> Result<Option<Conversation>, ConectaError>;

    /// Moves a conversation from `from` to `to`, only if it is still in
    /// `from` and `from` is not terminal.
    ///
    /// Returns `false` when the stored row has moved on and was left
    /// untouched.
    async fn update_conversation_state(
        &self,
        id: &str,
        from: ConversationState,
        to: ConversationState,
        metadata: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<bool, ConectaError>;

    /// Records the last outbound message and template. Terminal rows are
    /// left as they are.
    async fn record_outbound_message(
        &self,
        id: &str,
        message_id: &str,
        template_name: &str,
    ) -> Result<(), ConectaError>;
}

#[async_trait]
pub trait MessageLogRepository: Send + Sync {
    async fn insert_message_log(&self, log: &MessageLog) -> Result<(), ConectaError>;

    async fn get_message_log_by_message_id(
        &self,
        message_id: &str,
    ) -> Result<Option<MessageLog>, ConectaError>;

    /// Applies a status webhook if it moves the status forward.
    ///
    /// Returns whether the row changed.
    async fn update_message_status(
        &self,
        message_id: &str,
        status: MessageStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, ConectaError>;

    async fn list_message_logs(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<MessageLog>, ConectaError>;
}

/// Every repository in one object.
pub trait Storage:
    BusinessRepository
    + IntegrationRepository
    + OrderRepository
    + ShipmentRepository
    + AddressRepository
    + NotificationConfigRepository
    + ConversationRepository
    + MessageLogRepository
{
}

impl<T> Storage for T where
    T: BusinessRepository
        + IntegrationRepository
        + OrderRepository
        + ShipmentRepository
        + AddressRepository
        + NotificationConfigRepository
        + ConversationRepository
        + MessageLogRepository
{
}
