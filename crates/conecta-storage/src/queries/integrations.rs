// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integrations and the provider catalog.

use conecta_core::{
    ConectaError, Integration, IntegrationCategory, IntegrationType, NewIntegration,
};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::{now, parse_enum, parse_json, parse_ts};
use crate::database::{Database, map_tr_err};

const INTEGRATION_COLUMNS: &str = "i.id, i.business_id, i.integration_type_id, i.name, \
     i.is_active, i.is_testing, i.config, i.credentials, i.created_at, i.updated_at";

const TYPE_COLUMNS: &str = "t.id, t.code, t.name, t.category, t.base_url, t.base_url_test, \
     t.platform_credentials_encrypted";

fn integration_from_row(row: &Row<'_>) -> rusqlite::Result<Integration> {
    let config: String = row.get(6)?;
    let credentials: Option<String> = row.get(7)?;
    let created_at: String = row.get(8)?;
    let updated_at: String = row.get(9)?;
    Ok(Integration {
        id: row.get(0)?,
        business_id: row.get(1)?,
        integration_type_id: row.get(2)?,
        name: row.get(3)?,
        is_active: row.get(4)?,
        is_testing: row.get(5)?,
        config: parse_json(6, &config)?,
        credentials: credentials
            .as_deref()
            .map(|raw| parse_json(7, raw))
            .transpose()?,
        created_at: parse_ts(8, &created_at)?,
        updated_at: parse_ts(9, &updated_at)?,
    })
}

/// Reads catalog columns starting at `offset`.
fn type_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<IntegrationType> {
    let category: String = row.get(offset + 3)?;
    Ok(IntegrationType {
        id: row.get(offset)?,
        code: row.get(offset + 1)?,
        name: row.get(offset + 2)?,
        category: parse_enum(offset + 3, &category)?,
        base_url: row.get(offset + 4)?,
        base_url_test: row.get(offset + 5)?,
        platform_credentials: row.get(offset + 6)?,
    })
}

pub async fn insert_integration_type(
    db: &Database,
    ty: &IntegrationType,
) -> Result<i64, ConectaError> {
    let ty = ty.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO integration_types
                     (code, name, category, base_url, base_url_test, platform_credentials_encrypted)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    ty.code,
                    ty.name,
                    ty.category.as_ref(),
                    ty.base_url,
                    ty.base_url_test,
                    ty.platform_credentials,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_integration_type(
    db: &Database,
    id: i64,
) -> Result<Option<IntegrationType>, ConectaError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {TYPE_COLUMNS} FROM integration_types t WHERE t.id = ?1"),
                params![id],
                |row| type_from_row(row, 0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_integration_type_by_code(
    db: &Database,
    code: &str,
) -> Result<Option<IntegrationType>, ConectaError> {
    let code = code.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {TYPE_COLUMNS} FROM integration_types t WHERE t.code = ?1"),
                params![code],
                |row| type_from_row(row, 0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Whether activating an integration of `type_id` for `business_id` would
/// leave two active shipping integrations of the same type.
fn shipping_conflict(
    conn: &Connection,
    business_id: Option<i64>,
    type_id: i64,
    exclude_id: Option<i64>,
) -> rusqlite::Result<bool> {
    let category: String = conn.query_row(
        "SELECT category FROM integration_types WHERE id = ?1",
        params![type_id],
        |row| row.get(0),
    )?;
    if category != IntegrationCategory::Shipping.as_ref() {
        return Ok(false);
    }
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM integrations
         WHERE business_id IS ?1 AND integration_type_id = ?2 AND is_active = 1
           AND id IS NOT ?3",
        params![business_id, type_id, exclude_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub async fn insert_integration(
    db: &Database,
    new: &NewIntegration,
) -> Result<Integration, ConectaError> {
    let new = new.clone();
    db.connection()
        .call(move |conn| -> Result<Result<Integration, ConectaError>, rusqlite::Error> {
            let tx = conn.transaction()?;
            if new.is_active
                && shipping_conflict(&tx, new.business_id, new.integration_type_id, None)?
            {
                return Ok(Err(ConectaError::PersistenceConflict(format!(
                    "business {:?} already has an active integration of type {}",
                    new.business_id, new.integration_type_id
                ))));
            }
            let stamp = now();
            tx.execute(
                "INSERT INTO integrations
                     (business_id, integration_type_id, name, is_active, is_testing,
                      config, credentials, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    new.business_id,
                    new.integration_type_id,
                    new.name,
                    new.is_active,
                    new.is_testing,
                    new.config.to_string(),
                    new.credentials.as_ref().map(|c| c.to_string()),
                    stamp,
                ],
            )?;
            let id = tx.last_insert_rowid();
            let integration = tx.query_row(
                &format!("SELECT {INTEGRATION_COLUMNS} FROM integrations i WHERE i.id = ?1"),
                params![id],
                integration_from_row,
            )?;
            tx.commit()?;
            Ok(Ok(integration))
        })
        .await
        .map_err(map_tr_err)?
}

pub async fn get_integration(db: &Database, id: i64) -> Result<Option<Integration>, ConectaError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {INTEGRATION_COLUMNS} FROM integrations i WHERE i.id = ?1"),
                params![id],
                integration_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn set_integration_active(
    db: &Database,
    id: i64,
    active: bool,
) -> Result<(), ConectaError> {
    db.connection()
        .call(move |conn| -> Result<Result<(), ConectaError>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let row: Option<(Option<i64>, i64)> = tx
                .query_row(
                    "SELECT business_id, integration_type_id FROM integrations WHERE id = ?1",
                    params![id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            let Some((business_id, type_id)) = row else {
                return Ok(Err(ConectaError::not_found("integration", id)));
            };
            if active && shipping_conflict(&tx, business_id, type_id, Some(id))? {
                return Ok(Err(ConectaError::PersistenceConflict(format!(
                    "business {business_id:?} already has an active integration of type {type_id}"
                ))));
            }
            tx.execute(
                "UPDATE integrations SET is_active = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, active, now()],
            )?;
            tx.commit()?;
            Ok(Ok(()))
        })
        .await
        .map_err(map_tr_err)?
}

pub async fn active_integrations_by_category(
    db: &Database,
    business_id: i64,
    category: IntegrationCategory,
) -> Result<Vec<(Integration, IntegrationType)>, ConectaError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {INTEGRATION_COLUMNS}, {TYPE_COLUMNS}
                 FROM integrations i JOIN integration_types t ON t.id = i.integration_type_id
                 WHERE i.business_id = ?1 AND i.is_active = 1 AND t.category = ?2
                 ORDER BY i.updated_at DESC, i.id DESC"
            ))?;
            let rows = stmt.query_map(params![business_id, category.as_ref()], |row| {
                Ok((integration_from_row(row)?, type_from_row(row, 10)?))
            })?;
            let mut found = Vec::new();
            for row in rows {
                found.push(row?);
            }
            Ok(found)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn active_integration_by_code(
    db: &Database,
    business_id: i64,
    code: &str,
) -> Result<Option<(Integration, IntegrationType)>, ConectaError> {
    let code = code.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {INTEGRATION_COLUMNS}, {TYPE_COLUMNS}
                     FROM integrations i JOIN integration_types t ON t.id = i.integration_type_id
                     WHERE i.business_id = ?1 AND i.is_active = 1 AND t.code = ?2
                     ORDER BY i.updated_at DESC, i.id DESC
                     LIMIT 1"
                ),
                params![business_id, code],
                |row| Ok((integration_from_row(row)?, type_from_row(row, 10)?)),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}
