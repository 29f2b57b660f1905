// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messaging plumbing for the integration fabric.
//!
//! Durable work queues ([`Broker`]), fire-and-forget channels
//! ([`PubSub`]), a TTL result cache and the SSE event bridge. Each has a
//! networked backend (RabbitMQ, Redis) and an in-process one used for
//! single-node runs and tests.

pub mod broker;
pub mod cache;
pub mod error;
pub mod factory;
pub mod pubsub;
pub mod queues;
pub mod sse;

pub use broker::{Broker, ChannelBroker, MessageHandler, publish_json};
pub use cache::{MemoryCache, ResultCache};
pub use error::BusError;
pub use factory::{Messaging, connect_broker, connect_messaging};
pub use pubsub::{LocalPubSub, PubSub, run_subscriber};
pub use sse::{EventPublisher, NoopPublisher, SseEvent, SsePublisher, ShipmentEventType, publisher_for};
