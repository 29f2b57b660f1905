// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Conecta integration tests.
//!
//! Everything runs in-process: temp SQLite, the channel broker, local
//! pub/sub and the memory cache. Carriers and the WhatsApp Cloud API are
//! replaced by recording mocks.
//!
//! # Components
//!
//! - [`TestHarness`] - the assembled stack with consumers and HTTP router
//! - [`MockCarrier`] - scripted carrier client
//! - [`MockWhatsAppApi`] - records templates instead of sending them
//! - [`fixtures`] - tenants, orders, addresses and notification configs

pub mod fixtures;
pub mod harness;
pub mod mock_carrier;
pub mod mock_whatsapp;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_carrier::{CarrierCall, MockCarrier};
pub use mock_whatsapp::MockWhatsAppApi;
