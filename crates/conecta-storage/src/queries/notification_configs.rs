// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use conecta_core::{ConectaError, NewNotificationConfig, NotificationConfig};
use rusqlite::{Row, params};

use super::{now, parse_json, parse_ts, to_json};
use crate::database::{Database, map_tr_err};

const COLUMNS: &str =
    "id, integration_id, notification_type, is_active, priority, conditions, config, created_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<NotificationConfig> {
    let conditions: String = row.get(5)?;
    let config: String = row.get(6)?;
    let created_at: String = row.get(7)?;
    Ok(NotificationConfig {
        id: row.get(0)?,
        integration_id: row.get(1)?,
        notification_type: row.get(2)?,
        is_active: row.get(3)?,
        priority: row.get(4)?,
        conditions: parse_json(5, &conditions)?,
        config: parse_json(6, &config)?,
        created_at: parse_ts(7, &created_at)?,
    })
}

pub async fn insert_notification_config(
    db: &Database,
    new: &NewNotificationConfig,
) -> Result<NotificationConfig, ConectaError> {
    let new = new.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO notification_configs
                     (integration_id, notification_type, is_active, priority, conditions, config, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    new.integration_id,
                    new.notification_type,
                    new.is_active,
                    new.priority,
                    to_json(&new.conditions)?,
                    to_json(&new.config)?,
                    now(),
                ],
            )?;
            let id = conn.last_insert_rowid();
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM notification_configs WHERE id = ?1"),
                params![id],
                from_row,
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Active configs whose `conditions.trigger` equals `trigger`, highest
/// priority first, ties in insertion order.
pub async fn active_configs(
    db: &Database,
    integration_id: i64,
    trigger: &str,
) -> Result<Vec<NotificationConfig>, ConectaError> {
    let trigger = trigger.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM notification_configs
                 WHERE integration_id = ?1 AND is_active = 1
                   AND json_extract(conditions, '$.trigger') = ?2
                 ORDER BY priority DESC, id ASC"
            ))?;
            let rows = stmt.query_map(params![integration_id, trigger], from_row)?;
            let mut configs = Vec::new();
            for row in rows {
                configs.push(row?);
            }
            Ok(configs)
        })
        .await
        .map_err(map_tr_err)
}
