// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain records shared across Conecta components.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A merchant tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Business {
    pub id: i64,
    pub name: String,
}

/// Provider catalog category.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IntegrationCategory {
    Shipping,
    Messaging,
    Payment,
    Ecommerce,
    Invoicing,
}

/// Provider catalog entry. Seeded, never edited by tenants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationType {
    pub id: i64,
    /// Stable machine name (`envioclick`, `bold_pay`, `whatsapp`).
    pub code: String,
    pub name: String,
    pub category: IntegrationCategory,
    pub base_url: String,
    pub base_url_test: Option<String>,
    /// Raw AEAD envelope used when a tenant has no credentials of its own.
    #[serde(skip)]
    pub platform_credentials: Option<Vec<u8>>,
}

/// A tenant's binding to an external provider.
///
/// `business_id == None` marks a platform-global integration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Integration {
    pub id: i64,
    pub business_id: Option<i64>,
    pub integration_type_id: i64,
    pub name: String,
    pub is_active: bool,
    pub is_testing: bool,
    pub config: serde_json::Value,
    /// `{"encrypted": "<base64>"}` wrapper, opened by the vault.
    #[serde(skip)]
    pub credentials: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create an integration.
#[derive(Debug, Clone)]
pub struct NewIntegration {
    pub business_id: Option<i64>,
    pub integration_type_id: i64,
    pub name: String,
    pub is_active: bool,
    pub is_testing: bool,
    pub config: serde_json::Value,
    pub credentials: Option<serde_json::Value>,
}

/// The slice of an order that the integration fabric reads and writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub business_id: i64,
    pub order_number: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub payment_method_id: Option<i64>,
    pub status: String,
    /// Source channel the order arrived through.
    pub integration_id: Option<i64>,
    pub total: f64,
    pub currency: String,
    pub guide_link: Option<String>,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Shipment lifecycle status.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ShipmentStatus {
    Draft,
    Pending,
    InTransit,
    Delivered,
    Cancelled,
    Failed,
}

impl ShipmentStatus {
    /// Whether a shipment in this status may move to `next`.
    ///
    /// Re-applying the current status is always allowed so duplicate
    /// deliveries stay idempotent. Nothing leaves `cancelled`.
    pub fn can_transition_to(self, next: ShipmentStatus) -> bool {
        if self == next {
            return true;
        }
        !matches!(self, ShipmentStatus::Cancelled)
    }

    /// Statuses that require a tracking number mirrored on the order.
    pub fn requires_guide(self) -> bool {
        matches!(
            self,
            ShipmentStatus::Pending | ShipmentStatus::InTransit | ShipmentStatus::Delivered
        )
    }
}

/// Cost breakdown in the shipment's currency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShipmentCost {
    pub shipping_cost: f64,
    pub insurance_cost: f64,
    pub declared_value: f64,
    pub total_cost: f64,
}

/// Package dimensions in kilograms and centimeters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub weight: f64,
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

/// A tenant-owned fulfillment record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: i64,
    pub business_id: i64,
    pub order_id: Option<String>,
    pub carrier: String,
    pub carrier_code: Option<String>,
    pub tracking_number: Option<String>,
    pub guide_url: Option<String>,
    pub status: ShipmentStatus,
    pub correlation_id: Option<String>,
    pub cost: ShipmentCost,
    pub dimensions: Dimensions,
    pub is_test: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Shipment {
    /// Sets the tracking number unless one is already recorded.
    ///
    /// Returns `false` when an existing, different tracking number was kept.
    pub fn assign_tracking_number(&mut self, tracker: &str) -> bool {
        match &self.tracking_number {
            Some(existing) => existing == tracker,
            None => {
                self.tracking_number = Some(tracker.to_string());
                true
            }
        }
    }
}

/// Fields required to insert a shipment.
#[derive(Debug, Clone, Default)]
pub struct NewShipment {
    pub business_id: i64,
    pub order_id: Option<String>,
    pub carrier: String,
    pub carrier_code: Option<String>,
    pub correlation_id: Option<String>,
    pub cost: ShipmentCost,
    pub dimensions: Dimensions,
    pub is_test: bool,
}

/// A pickup address a business ships from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginAddress {
    pub id: i64,
    pub business_id: i64,
    pub alias: String,
    pub company: String,
    pub contact_name: String,
    pub email: String,
    pub phone: String,
    pub street: String,
    pub suburb: String,
    pub city: String,
    pub state: String,
    /// DANE municipality code.
    pub dane_code: String,
    pub postal_code: Option<String>,
    pub reference: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Editable fields of an origin address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OriginAddressInput {
    pub alias: String,
    #[serde(default)]
    pub company: String,
    pub contact_name: String,
    #[serde(default)]
    pub email: String,
    pub phone: String,
    pub street: String,
    #[serde(default)]
    pub suburb: String,
    pub city: String,
    #[serde(default)]
    pub state: String,
    pub dane_code: String,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
}

/// Conditions under which a notification config fires.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationConditions {
    pub trigger: String,
    #[serde(default)]
    pub statuses: Vec<String>,
    #[serde(default)]
    pub payment_methods: Vec<i64>,
    #[serde(default)]
    pub source_integration_id: Option<i64>,
}

/// Template settings of a notification config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationTemplate {
    pub template_name: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_recipient_type")]
    pub recipient_type: String,
}

fn default_language() -> String {
    "es".to_string()
}

fn default_recipient_type() -> String {
    "customer".to_string()
}

/// A per-integration notification rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub id: i64,
    pub integration_id: i64,
    pub notification_type: String,
    pub is_active: bool,
    pub priority: i64,
    pub conditions: NotificationConditions,
    pub config: NotificationTemplate,
    pub created_at: DateTime<Utc>,
}

/// Fields required to create a notification config.
#[derive(Debug, Clone)]
pub struct NewNotificationConfig {
    pub integration_id: i64,
    pub notification_type: String,
    pub is_active: bool,
    pub priority: i64,
    pub conditions: NotificationConditions,
    pub config: NotificationTemplate,
}

/// WhatsApp dialogue state.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversationState {
    Start,
    AwaitingConfirmation,
    AwaitingMenuSelection,
    AwaitingNoveltyType,
    AwaitingCancelConfirm,
    AwaitingCancelReason,
    Completed,
    HandoffToHuman,
}

impl ConversationState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ConversationState::Completed | ConversationState::HandoffToHuman
        )
    }
}

/// A per-(phone, order) WhatsApp dialogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub phone_number: String,
    pub order_number: String,
    pub business_id: i64,
    pub current_state: ConversationState,
    pub last_message_id: Option<String>,
    pub last_template_id: Option<String>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Conversation {
    /// Starts a fresh conversation in `START` with the given window.
    pub fn start(
        id: String,
        phone_number: &str,
        order_number: &str,
        business_id: i64,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Self {
        Self {
            id,
            phone_number: phone_number.to_string(),
            order_number: order_number.to_string(),
            business_id,
            current_state: ConversationState::Start,
            last_message_id: None,
            last_template_id: None,
            metadata: serde_json::Map::new(),
            created_at: now,
            updated_at: now,
            expires_at: now + window,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whether an incoming message may continue this conversation.
    pub fn accepts_messages(&self, now: DateTime<Utc>) -> bool {
        !self.current_state.is_terminal() && !self.is_expired(now)
    }
}

/// Direction of a logged WhatsApp message.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MessageDirection {
    Outbound,
    Inbound,
}

/// Delivery status of a logged WhatsApp message.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MessageStatus {
    Queued,
    Sent,
    Delivered,
    Read,
    Failed,
}

impl MessageStatus {
    /// Whether a status webhook may move a message from `self` to `next`.
    ///
    /// Progress only moves forward through queued, sent, delivered, read.
    /// `failed` is reachable only before delivery.
    pub fn can_advance_to(self, next: MessageStatus) -> bool {
        use MessageStatus::*;
        match (self, next) {
            (Failed, _) => false,
            (Queued | Sent, Failed) => true,
            (_, Failed) => false,
            (current, next) => next.rank() > current.rank(),
        }
    }

    fn rank(self) -> u8 {
        match self {
            MessageStatus::Queued => 0,
            MessageStatus::Sent => 1,
            MessageStatus::Delivered => 2,
            MessageStatus::Read => 3,
            MessageStatus::Failed => 4,
        }
    }
}

/// Append-only record of a WhatsApp message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageLog {
    pub id: String,
    pub conversation_id: String,
    pub direction: MessageDirection,
    /// Provider-assigned id (`wamid.*`).
    pub message_id: String,
    pub template_name: Option<String>,
    pub content: String,
    pub status: MessageStatus,
    pub delivered_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
