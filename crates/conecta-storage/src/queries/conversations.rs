// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp conversations.
//!
//! Terminal rows are frozen: state updates carry a guard on the stored
//! state, so a stale reader cannot revive a finished conversation.

use conecta_core::{ConectaError, Conversation, ConversationState};
use rusqlite::{OptionalExtension, Row, params};

use super::{now, parse_enum, parse_json, parse_ts, to_json, ts};
use crate::database::{Database, map_tr_err};

const COLUMNS: &str = "id, phone_number, order_number, business_id, current_state, \
     last_message_id, last_template_id, metadata, created_at, updated_at, expires_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Conversation> {
    let state: String = row.get(4)?;
    let metadata: String = row.get(7)?;
    let created_at: String = row.get(8)?;
    let updated_at: String = row.get(9)?;
    let expires_at: String = row.get(10)?;
    Ok(Conversation {
        id: row.get(0)?,
        phone_number: row.get(1)?,
        order_number: row.get(2)?,
        business_id: row.get(3)?,
        current_state: parse_enum(4, &state)?,
        last_message_id: row.get(5)?,
        last_template_id: row.get(6)?,
        metadata: parse_json(7, &metadata)?,
        created_at: parse_ts(8, &created_at)?,
        updated_at: parse_ts(9, &updated_at)?,
        expires_at: parse_ts(10, &expires_at)?,
    })
}

const TERMINAL_STATES: &str = "('COMPLETED', 'HANDOFF_TO_HUMAN')";

/// Inserts a conversation, replacing a row with the same id.
pub async fn insert_conversation(db: &Database, c: &Conversation) -> Result<(), ConectaError> {
    let c = c.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!("INSERT OR REPLACE INTO conversations ({COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"),
                params![
                    c.id,
                    c.phone_number,
                    c.order_number,
                    c.business_id,
                    c.current_state.as_ref(),
                    c.last_message_id,
                    c.last_template_id,
                    to_json(&c.metadata)?,
                    ts(&c.created_at),
                    ts(&c.updated_at),
                    ts(&c.expires_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_conversation(db: &Database, id: &str) -> Result<Option<Conversation>, ConectaError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM conversations WHERE id = ?1"),
                params![id],
                from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_by_phone_and_order(
    db: &Database,
    phone_number: &str,
    order_number: &str,
) -> Result<Option<Conversation>, ConectaError> {
    let phone_number = phone_number.to_string();
    let order_number = order_number.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {COLUMNS} FROM conversations
                     WHERE phone_number = ?1 AND order_number = ?2
                     ORDER BY created_at DESC, rowid DESC LIMIT 1"
                ),
                params![phone_number, order_number],
                from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn latest_for_phone(
    db: &Database,
    phone_number: &str,
) -> Result<Option<Conversation>, ConectaError> {
    let phone_number = phone_number.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {COLUMNS} FROM conversations WHERE phone_number = ?1
                     ORDER BY created_at DESC, rowid DESC LIMIT 1"
                ),
                params![phone_number],
                from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn update_state(
    db: &Database,
    id: &str,
    from: ConversationState,
    to: ConversationState,
    metadata: &serde_json::Map<String, serde_json::Value>,
) -> Result<bool, ConectaError> {
    let id = id.to_string();
    let metadata = metadata.clone();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                &format!(
                    "UPDATE conversations SET current_state = ?2, metadata = ?3, updated_at = ?4
                     WHERE id = ?1 AND current_state = ?5 AND current_state NOT IN {TERMINAL_STATES}"
                ),
                params![id, to.as_ref(), to_json(&metadata)?, now(), from.as_ref()],
            )
        })
        .await
        .map_err(map_tr_err)?;
    Ok(changed > 0)
}

pub async fn record_outbound(
    db: &Database,
    id: &str,
    message_id: &str,
    template_name: &str,
) -> Result<(), ConectaError> {
    let id = id.to_string();
    let message_id = message_id.to_string();
    let template_name = template_name.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!(
                    "UPDATE conversations SET last_message_id = ?2, last_template_id = ?3, updated_at = ?4
                     WHERE id = ?1 AND current_state NOT IN {TERMINAL_STATES}"
                ),
                params![id, message_id, template_name, now()],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
