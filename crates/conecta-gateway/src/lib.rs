// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for Conecta.
//!
//! Shipment and origin-address endpoints over the shipment coordinator,
//! plus the per-business shipment event stream. Authentication happens
//! upstream; requests reach this router carrying [`Claims`].

pub mod error;
pub mod handlers;
pub mod scope;
pub mod server;
pub mod sse;

pub use error::{ApiError, ErrorResponse};
pub use scope::{BusinessScope, Claims};
pub use server::{GatewayState, api_router, serve};
