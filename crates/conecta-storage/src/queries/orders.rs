// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use conecta_core::{ConectaError, Order};
use rusqlite::{OptionalExtension, Row, params};

use super::{now, parse_ts, ts};
use crate::database::{Database, map_tr_err};

const COLUMNS: &str = "id, business_id, order_number, customer_name, customer_phone, \
     payment_method_id, status, integration_id, total, currency, guide_link, tracking_number, \
     created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Order> {
    let created_at: String = row.get(12)?;
    let updated_at: String = row.get(13)?;
    Ok(Order {
        id: row.get(0)?,
        business_id: row.get(1)?,
        order_number: row.get(2)?,
        customer_name: row.get(3)?,
        customer_phone: row.get(4)?,
        payment_method_id: row.get(5)?,
        status: row.get(6)?,
        integration_id: row.get(7)?,
        total: row.get(8)?,
        currency: row.get(9)?,
        guide_link: row.get(10)?,
        tracking_number: row.get(11)?,
        created_at: parse_ts(12, &created_at)?,
        updated_at: parse_ts(13, &updated_at)?,
    })
}

pub async fn insert_order(db: &Database, order: &Order) -> Result<(), ConectaError> {
    let order = order.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!("INSERT INTO orders ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"),
                params![
                    order.id,
                    order.business_id,
                    order.order_number,
                    order.customer_name,
                    order.customer_phone,
                    order.payment_method_id,
                    order.status,
                    order.integration_id,
                    order.total,
                    order.currency,
                    order.guide_link,
                    order.tracking_number,
                    ts(&order.created_at),
                    ts(&order.updated_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_order(db: &Database, id: &str) -> Result<Option<Order>, ConectaError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM orders WHERE id = ?1"),
                params![id],
                from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_order_by_number(
    db: &Database,
    business_id: i64,
    order_number: &str,
) -> Result<Option<Order>, ConectaError> {
    let order_number = order_number.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {COLUMNS} FROM orders WHERE business_id = ?1 AND order_number = ?2
                     ORDER BY created_at DESC LIMIT 1"
                ),
                params![business_id, order_number],
                from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}
