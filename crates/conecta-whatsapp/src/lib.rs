// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp order notifications.
//!
//! Order events are matched against per-integration notification configs
//! ([`OrderEventConsumer`]); a match becomes a confirmation request that
//! the [`ConfirmationConsumer`] sends through the [`Dispatcher`]. Customer
//! replies arrive on the webhook and drive the conversation state machine
//! through the [`InboundHandler`].

pub mod client;
pub mod confirmation;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod inbound;
pub mod matcher;
pub mod order_events;
pub mod phone;
pub mod state_machine;
pub mod templates;
pub mod webhook;

pub use client::{CloudApiClient, SenderCredentials, WhatsAppApi};
pub use confirmation::ConfirmationConsumer;
pub use dispatcher::{Dispatcher, SendReceipt, SendRequest, WHATSAPP_PROVIDER_CODE};
pub use error::WhatsAppError;
pub use events::{ConfirmationRequest, ConversationOutcome, OrderEvent};
pub use inbound::{InboundHandler, InboundMessage, ReplyOutcome};
pub use matcher::{OrderFacts, first_match, matches};
pub use order_events::OrderEventConsumer;
pub use phone::PhoneNumber;
pub use state_machine::{Outcome, Transition, transition};
pub use templates::{TemplateCatalog, TemplateDef, TemplateMessage};
pub use webhook::{WebhookState, webhook_router};
