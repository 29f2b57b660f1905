// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payment gateway adapters.
//!
//! Each enabled gateway gets a [`PaymentAdapter`] consuming its own
//! `pay.<gateway>.requests` queue. Adapters open the business's gateway
//! credentials through the vault, call the gateway, and publish one
//! [`PaymentResponse`] per request on `pay.responses`.

pub mod adapter;
pub mod error;
pub mod gateway;
pub mod gateways;
pub mod publisher;
pub mod types;

#[cfg(test)]
mod test_support;

pub use adapter::PaymentAdapter;
pub use error::GatewayError;
pub use gateway::{Endpoints, PaymentGateway};
pub use gateways::{
    BoldGateway, EpaycoGateway, MercadoPagoGateway, StripeGateway, WompiGateway, gateway_for,
};
pub use publisher::PaymentRequestPublisher;
pub use types::{GatewayOutcome, PaymentRequest, PaymentResponse, PaymentStatus};
