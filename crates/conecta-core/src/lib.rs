// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Conecta integration backend.
//!
//! Holds the error taxonomy, the domain records the integration fabric
//! reads and writes, and the repository traits the storage crate
//! implements.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{ConectaError, ErrorKind};
pub use traits::{
    AddressRepository, BusinessRepository, ConversationRepository, IntegrationRepository,
    MessageLogRepository, NotificationConfigRepository, OrderRepository, ShipmentRepository,
    Storage,
};
pub use types::{
    Business, Conversation, ConversationState, Dimensions, Integration, IntegrationCategory,
    IntegrationType, MessageDirection, MessageLog, MessageStatus, NewIntegration,
    NewNotificationConfig, NewShipment, NotificationConditions, NotificationConfig,
    NotificationTemplate, Order, OriginAddress, OriginAddressInput, Shipment, ShipmentCost,
    ShipmentStatus,
};
