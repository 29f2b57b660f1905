// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use chrono::{DateTime, Utc};
use conecta_core::{ConectaError, MessageLog, MessageStatus};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::{parse_enum, parse_opt_ts, parse_ts, ts};
use crate::database::{Database, map_tr_err};

const COLUMNS: &str = "id, conversation_id, direction, message_id, template_name, content, \
     status, delivered_at, read_at, created_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<MessageLog> {
    let direction: String = row.get(2)?;
    let status: String = row.get(6)?;
    let created_at: String = row.get(9)?;
    Ok(MessageLog {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        direction: parse_enum(2, &direction)?,
        message_id: row.get(3)?,
        template_name: row.get(4)?,
        content: row.get(5)?,
        status: parse_enum(6, &status)?,
        delivered_at: parse_opt_ts(7, row.get(7)?)?,
        read_at: parse_opt_ts(8, row.get(8)?)?,
        created_at: parse_ts(9, &created_at)?,
    })
}

fn by_message_id(conn: &Connection, message_id: &str) -> rusqlite::Result<Option<MessageLog>> {
    conn.query_row(
        &format!(
            "SELECT {COLUMNS} FROM message_logs WHERE message_id = ?1
             ORDER BY created_at ASC LIMIT 1"
        ),
        params![message_id],
        from_row,
    )
    .optional()
}

pub async fn insert_message_log(db: &Database, log: &MessageLog) -> Result<(), ConectaError> {
    let log = log.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!("INSERT INTO message_logs ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"),
                params![
                    log.id,
                    log.conversation_id,
                    log.direction.as_ref(),
                    log.message_id,
                    log.template_name,
                    log.content,
                    log.status.as_ref(),
                    log.delivered_at.as_ref().map(ts),
                    log.read_at.as_ref().map(ts),
                    ts(&log.created_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_by_message_id(
    db: &Database,
    message_id: &str,
) -> Result<Option<MessageLog>, ConectaError> {
    let message_id = message_id.to_string();
    db.connection()
        .call(move |conn| by_message_id(conn, &message_id))
        .await
        .map_err(map_tr_err)
}

/// Moves the status forward only; stale or out-of-order webhooks are no-ops.
pub async fn update_status(
    db: &Database,
    message_id: &str,
    status: MessageStatus,
    at: DateTime<Utc>,
) -> Result<bool, ConectaError> {
    let message_id = message_id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let Some(current) = by_message_id(&tx, &message_id)? else {
                return Ok(false);
            };
            if !current.status.can_advance_to(status) {
                return Ok(false);
            }
            let stamp = ts(&at);
            let delivered_at = match status {
                MessageStatus::Delivered | MessageStatus::Read => {
                    Some(current.delivered_at.as_ref().map(ts).unwrap_or_else(|| stamp.clone()))
                }
                _ => current.delivered_at.as_ref().map(ts),
            };
            let read_at = match status {
                MessageStatus::Read => Some(stamp),
                _ => current.read_at.as_ref().map(ts),
            };
            tx.execute(
                "UPDATE message_logs SET status = ?2, delivered_at = ?3, read_at = ?4 WHERE id = ?1",
                params![current.id, status.as_ref(), delivered_at, read_at],
            )?;
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_for_conversation(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<MessageLog>, ConectaError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM message_logs WHERE conversation_id = ?1
                 ORDER BY created_at ASC, rowid ASC"
            ))?;
            let rows = stmt.query_map(params![conversation_id], from_row)?;
            let mut logs = Vec::new();
            for row in rows {
                logs.push(row?);
            }
            Ok(logs)
        })
        .await
        .map_err(map_tr_err)
}
