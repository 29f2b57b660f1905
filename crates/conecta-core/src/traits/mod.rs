// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence seams implemented by `conecta-storage`.

pub mod storage;

pub use storage::{
    AddressRepository, BusinessRepository, ConversationRepository, IntegrationRepository,
    MessageLogRepository, NotificationConfigRepository, OrderRepository, ShipmentRepository,
    Storage,
};
