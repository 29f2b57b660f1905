// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Origin addresses with a single default per business.

use conecta_core::{ConectaError, OriginAddress, OriginAddressInput};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::{now, parse_ts};
use crate::database::{Database, map_tr_err};

const COLUMNS: &str = "id, business_id, alias, company, contact_name, email, phone, street, \
     suburb, city, state, dane_code, postal_code, reference, is_default, created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<OriginAddress> {
    let created_at: String = row.get(15)?;
    let updated_at: String = row.get(16)?;
    Ok(OriginAddress {
        id: row.get(0)?,
        business_id: row.get(1)?,
        alias: row.get(2)?,
        company: row.get(3)?,
        contact_name: row.get(4)?,
        email: row.get(5)?,
        phone: row.get(6)?,
        street: row.get(7)?,
        suburb: row.get(8)?,
        city: row.get(9)?,
        state: row.get(10)?,
        dane_code: row.get(11)?,
        postal_code: row.get(12)?,
        reference: row.get(13)?,
        is_default: row.get(14)?,
        created_at: parse_ts(15, &created_at)?,
        updated_at: parse_ts(16, &updated_at)?,
    })
}

fn select_one(conn: &Connection, business_id: i64, id: i64) -> rusqlite::Result<Option<OriginAddress>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM origin_addresses WHERE business_id = ?1 AND id = ?2"),
        params![business_id, id],
        from_row,
    )
    .optional()
}

pub async fn create_address(
    db: &Database,
    business_id: i64,
    input: &OriginAddressInput,
) -> Result<OriginAddress, ConectaError> {
    let a = input.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let existing: i64 = tx.query_row(
                "SELECT COUNT(*) FROM origin_addresses WHERE business_id = ?1",
                params![business_id],
                |row| row.get(0),
            )?;
            let stamp = now();
            tx.execute(
                "INSERT INTO origin_addresses
                     (business_id, alias, company, contact_name, email, phone, street, suburb,
                      city, state, dane_code, postal_code, reference, is_default,
                      created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)",
                params![
                    business_id,
                    a.alias,
                    a.company,
                    a.contact_name,
                    a.email,
                    a.phone,
                    a.street,
                    a.suburb,
                    a.city,
                    a.state,
                    a.dane_code,
                    a.postal_code,
                    a.reference,
                    existing == 0,
                    stamp,
                ],
            )?;
            let id = tx.last_insert_rowid();
            let created = tx.query_row(
                &format!("SELECT {COLUMNS} FROM origin_addresses WHERE id = ?1"),
                params![id],
                from_row,
            )?;
            tx.commit()?;
            Ok(created)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_address(
    db: &Database,
    business_id: i64,
    id: i64,
) -> Result<Option<OriginAddress>, ConectaError> {
    db.connection()
        .call(move |conn| select_one(conn, business_id, id))
        .await
        .map_err(map_tr_err)
}

/// Default first, then by creation.
pub async fn list_addresses(
    db: &Database,
    business_id: i64,
) -> Result<Vec<OriginAddress>, ConectaError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM origin_addresses WHERE business_id = ?1
                 ORDER BY is_default DESC, id ASC"
            ))?;
            let rows = stmt.query_map(params![business_id], from_row)?;
            let mut addresses = Vec::new();
            for row in rows {
                addresses.push(row?);
            }
            Ok(addresses)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn update_address(
    db: &Database,
    business_id: i64,
    id: i64,
    input: &OriginAddressInput,
) -> Result<OriginAddress, ConectaError> {
    let a = input.clone();
    db.connection()
        .call(move |conn| -> Result<Result<OriginAddress, ConectaError>, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE origin_addresses SET
                     alias = ?3, company = ?4, contact_name = ?5, email = ?6, phone = ?7,
                     street = ?8, suburb = ?9, city = ?10, state = ?11, dane_code = ?12,
                     postal_code = ?13, reference = ?14, updated_at = ?15
                 WHERE business_id = ?1 AND id = ?2",
                params![
                    business_id,
                    id,
                    a.alias,
                    a.company,
                    a.contact_name,
                    a.email,
                    a.phone,
                    a.street,
                    a.suburb,
                    a.city,
                    a.state,
                    a.dane_code,
                    a.postal_code,
                    a.reference,
                    now(),
                ],
            )?;
            if changed == 0 {
                return Ok(Err(ConectaError::not_found("origin address", id)));
            }
            match select_one(conn, business_id, id)? {
                Some(address) => Ok(Ok(address)),
                None => Ok(Err(ConectaError::not_found("origin address", id))),
            }
        })
        .await
        .map_err(map_tr_err)?
}

pub async fn set_default_address(db: &Database, business_id: i64, id: i64) -> Result<(), ConectaError> {
    db.connection()
        .call(move |conn| -> Result<Result<(), ConectaError>, rusqlite::Error> {
            let tx = conn.transaction()?;
            if select_one(&tx, business_id, id)?.is_none() {
                return Ok(Err(ConectaError::not_found("origin address", id)));
            }
            let stamp = now();
            tx.execute(
                "UPDATE origin_addresses SET is_default = 0, updated_at = ?2
                 WHERE business_id = ?1 AND is_default = 1",
                params![business_id, stamp],
            )?;
            tx.execute(
                "UPDATE origin_addresses SET is_default = 1, updated_at = ?3
                 WHERE business_id = ?1 AND id = ?2",
                params![business_id, id, stamp],
            )?;
            tx.commit()?;
            Ok(Ok(()))
        })
        .await
        .map_err(map_tr_err)?
}

pub async fn delete_address(db: &Database, business_id: i64, id: i64) -> Result<(), ConectaError> {
    db.connection()
        .call(move |conn| -> Result<Result<(), ConectaError>, rusqlite::Error> {
            let Some(address) = select_one(conn, business_id, id)? else {
                return Ok(Err(ConectaError::not_found("origin address", id)));
            };
            if address.is_default {
                return Ok(Err(ConectaError::invalid(
                    "origin_address",
                    "the default address cannot be deleted",
                )));
            }
            conn.execute(
                "DELETE FROM origin_addresses WHERE business_id = ?1 AND id = ?2",
                params![business_id, id],
            )?;
            Ok(Ok(()))
        })
        .await
        .map_err(map_tr_err)?
}
