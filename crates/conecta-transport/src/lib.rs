// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shipping over the transport fabric.
//!
//! Producers ([`ShipmentCoordinator`]) resolve a business's carrier and
//! publish [`TransportRequest`]s; carrier adapters answer with
//! [`TransportResponse`]s; the [`ResponseConsumer`] applies those answers
//! to shipments and orders and reports them over SSE.

pub mod adapter;
pub mod addresses;
pub mod carrier;
pub mod consumer;
pub mod coordinator;
pub mod envelope;
pub mod publisher;
pub mod request;

pub use adapter::{CarrierClient, CarrierContext, EnvioClickClient, TransportAdapterRouter};
pub use addresses::AddressService;
pub use carrier::{CarrierInfo, CarrierResolver};
pub use consumer::ResponseConsumer;
pub use coordinator::{CoordinatorSettings, ShipmentCoordinator, Ticket};
pub use envelope::{
    TransportOperation, TransportRequest, TransportResponse, TransportStatus,
    extract_tracker_and_url, quote_result_key,
};
pub use publisher::TransportPublisher;
pub use request::{Place, ShipmentRequest};
