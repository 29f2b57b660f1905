// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shipment rows.
//!
//! Updates never overwrite a recorded tracking number and never move a
//! cancelled shipment to another status, whatever the caller passes.

use conecta_core::{
    ConectaError, Dimensions, NewShipment, Shipment, ShipmentCost, ShipmentStatus,
};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::{now, parse_enum, parse_ts};
use crate::database::{Database, map_tr_err};

const COLUMNS: &str = "id, business_id, order_id, carrier, carrier_code, tracking_number, \
     guide_url, status, correlation_id, shipping_cost, insurance_cost, declared_value, total_cost, \
     weight, length, width, height, is_test, created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Shipment> {
    let status: String = row.get(7)?;
    let created_at: String = row.get(18)?;
    let updated_at: String = row.get(19)?;
    Ok(Shipment {
        id: row.get(0)?,
        business_id: row.get(1)?,
        order_id: row.get(2)?,
        carrier: row.get(3)?,
        carrier_code: row.get(4)?,
        tracking_number: row.get(5)?,
        guide_url: row.get(6)?,
        status: parse_enum(7, &status)?,
        correlation_id: row.get(8)?,
        cost: ShipmentCost {
            shipping_cost: row.get(9)?,
            insurance_cost: row.get(10)?,
            declared_value: row.get(11)?,
            total_cost: row.get(12)?,
        },
        dimensions: Dimensions {
            weight: row.get(13)?,
            length: row.get(14)?,
            width: row.get(15)?,
            height: row.get(16)?,
        },
        is_test: row.get(17)?,
        created_at: parse_ts(18, &created_at)?,
        updated_at: parse_ts(19, &updated_at)?,
    })
}

pub async fn insert_shipment(db: &Database, new: &NewShipment) -> Result<Shipment, ConectaError> {
    let new = new.clone();
    db.connection()
        .call(move |conn| {
            let stamp = now();
            conn.execute(
                "INSERT INTO shipments
                     (business_id, order_id, carrier, carrier_code, status, correlation_id,
                      shipping_cost, insurance_cost, declared_value, total_cost,
                      weight, length, width, height, is_test, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16)",
                params![
                    new.business_id,
                    new.order_id,
                    new.carrier,
                    new.carrier_code,
                    ShipmentStatus::Draft.as_ref(),
                    new.correlation_id,
                    new.cost.shipping_cost,
                    new.cost.insurance_cost,
                    new.cost.declared_value,
                    new.cost.total_cost,
                    new.dimensions.weight,
                    new.dimensions.length,
                    new.dimensions.width,
                    new.dimensions.height,
                    new.is_test,
                    stamp,
                ],
            )?;
            let id = conn.last_insert_rowid();
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM shipments WHERE id = ?1"),
                params![id],
                from_row,
            )
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_shipment(db: &Database, id: i64) -> Result<Option<Shipment>, ConectaError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM shipments WHERE id = ?1"),
                params![id],
                from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn find_by_tracking_number(
    db: &Database,
    tracking_number: &str,
) -> Result<Option<Shipment>, ConectaError> {
    let tracking_number = tracking_number.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM shipments WHERE tracking_number = ?1"),
                params![tracking_number],
                from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn update_shipment(db: &Database, shipment: &Shipment) -> Result<(), ConectaError> {
    let s = shipment.clone();
    db.connection()
        .call(move |conn| write_shipment(conn, &s))
        .await
        .map_err(map_tr_err)?
}

/// Writes a generated guide onto the shipment and, when the shipment is
/// linked to an order, mirrors it onto that order. Both rows change or
/// neither does.
pub async fn apply_guide(db: &Database, shipment: &Shipment) -> Result<(), ConectaError> {
    let s = shipment.clone();
    db.connection()
        .call(move |conn| -> Result<Result<(), ConectaError>, rusqlite::Error> {
            let tx = conn.transaction()?;
            if let Err(e) = write_shipment(&tx, &s)? {
                return Ok(Err(e));
            }
            if let Some(order_id) = s.order_id.as_deref() {
                // The stored tracking number wins over the one passed in.
                let (tracking, guide): (Option<String>, Option<String>) = tx.query_row(
                    "SELECT tracking_number, guide_url FROM shipments WHERE id = ?1",
                    params![s.id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?;
                let changed = tx.execute(
                    "UPDATE orders SET guide_link = ?2, tracking_number = ?3, updated_at = ?4
                     WHERE id = ?1",
                    params![order_id, guide, tracking, now()],
                )?;
                if changed == 0 {
                    return Ok(Err(ConectaError::not_found("order", order_id)));
                }
            }
            tx.commit()?;
            Ok(Ok(()))
        })
        .await
        .map_err(map_tr_err)?
}

fn write_shipment(
    conn: &Connection,
    s: &Shipment,
) -> Result<Result<(), ConectaError>, rusqlite::Error> {
    let changed = conn.execute(
        "UPDATE shipments SET
             order_id = ?2, carrier_code = ?3,
             tracking_number = COALESCE(tracking_number, ?4),
             guide_url = ?5, status = ?6, correlation_id = ?7,
             shipping_cost = ?8, insurance_cost = ?9, declared_value = ?10, total_cost = ?11,
             weight = ?12, length = ?13, width = ?14, height = ?15,
             is_test = ?16, updated_at = ?17
         WHERE id = ?1 AND (status != 'cancelled' OR ?6 = 'cancelled')",
        params![
            s.id,
            s.order_id,
            s.carrier_code,
            s.tracking_number,
            s.guide_url,
            s.status.as_ref(),
            s.correlation_id,
            s.cost.shipping_cost,
            s.cost.insurance_cost,
            s.cost.declared_value,
            s.cost.total_cost,
            s.dimensions.weight,
            s.dimensions.length,
            s.dimensions.width,
            s.dimensions.height,
            s.is_test,
            now(),
        ],
    )?;
    if changed > 0 {
        return Ok(Ok(()));
    }
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM shipments WHERE id = ?1)",
        params![s.id],
        |row| row.get(0),
    )?;
    if exists {
        Ok(Err(ConectaError::PersistenceConflict(format!(
            "shipment {} is cancelled",
            s.id
        ))))
    } else {
        Ok(Err(ConectaError::not_found("shipment", s.id)))
    }
}

pub async fn list_shipments(db: &Database, business_id: i64) -> Result<Vec<Shipment>, ConectaError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM shipments WHERE business_id = ?1
                 ORDER BY created_at DESC, id DESC"
            ))?;
            let rows = stmt.query_map(params![business_id], from_row)?;
            let mut shipments = Vec::new();
            for row in rows {
                shipments.push(row?);
            }
            Ok(shipments)
        })
        .await
        .map_err(map_tr_err)
}
