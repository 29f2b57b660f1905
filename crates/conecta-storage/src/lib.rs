// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for Conecta.
//!
//! WAL-mode SQLite with embedded refinery migrations, a single-writer
//! connection via `tokio-rusqlite`, and one query module per table.
//! [`SqliteStorage`] implements every repository trait from `conecta-core`.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
