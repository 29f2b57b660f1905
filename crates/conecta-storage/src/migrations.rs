// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQL migrations embedded at build time with refinery.

use conecta_core::ConectaError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Applies every pending migration.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), ConectaError> {
    let report = embedded::migrations::runner()
        .run(conn)
        .map_err(ConectaError::storage)?;
    for migration in report.applied_migrations() {
        tracing::info!(version = migration.version(), name = migration.name(), "applied migration");
    }
    Ok(())
}
