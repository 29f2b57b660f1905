// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use conecta_core::{Business, ConectaError};
use rusqlite::params;

use crate::database::{Database, map_tr_err};

pub async fn insert_business(db: &Database, name: &str) -> Result<Business, ConectaError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO businesses (name, created_at) VALUES (?1, ?2)",
                params![name, super::now()],
            )?;
            Ok(Business {
                id: conn.last_insert_rowid(),
                name,
            })
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_business(db: &Database, id: i64) -> Result<Option<Business>, ConectaError> {
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT id, name FROM businesses WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Business {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            );
            match result {
                Ok(business) => Ok(Some(business)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}
