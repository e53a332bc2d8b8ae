//! Parking lot repository.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::parse_datetime;
use crate::error::{Result, StorageError};
use crate::models::{Lot, NewLot};

const LOT_COLUMNS: &str = "id, operator_id, name, address, capacity, hourly_rate, \
     daily_maximum_price, advanced_pricing_enabled, created_at, updated_at";

/// Repository for lots and their flat pricing.
pub struct LotsRepo;

impl LotsRepo {
    /// Insert a lot owned by `operator_id`. Absent prices are stored as zero.
    pub fn insert(conn: &Connection, operator_id: i64, lot: NewLot) -> Result<i64> {
        conn.execute(
            "INSERT INTO lots (operator_id, name, address, capacity, hourly_rate, daily_maximum_price)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                operator_id,
                lot.name,
                lot.address,
                lot.capacity,
                lot.hourly_rate.unwrap_or(0.0),
                lot.daily_maximum_price.unwrap_or(0.0)
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Lot>> {
        let sql = format!("SELECT {LOT_COLUMNS} FROM lots WHERE id = ?1");
        let lot = conn.query_row(&sql, [id], row_to_lot).optional()?;
        Ok(lot)
    }

    /// All lots owned by an operator, by name.
    pub fn list_for_operator(conn: &Connection, operator_id: i64) -> Result<Vec<Lot>> {
        let sql = format!(
            "SELECT {LOT_COLUMNS} FROM lots WHERE operator_id = ?1 ORDER BY name ASC, id ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let lots = stmt
            .query_map([operator_id], row_to_lot)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(lots)
    }

    /// Set the lot's global hourly rate and daily cap.
    pub fn update_pricing(
        conn: &Connection,
        id: i64,
        hourly_rate: f64,
        daily_maximum_price: f64,
    ) -> Result<()> {
        let rows = conn.execute(
            "UPDATE lots SET hourly_rate = ?1, daily_maximum_price = ?2, updated_at = datetime('now')
             WHERE id = ?3",
            params![hourly_rate, daily_maximum_price, id],
        )?;
        if rows == 0 {
            return Err(StorageError::NotFound(format!("lot {id}")));
        }
        Ok(())
    }

    pub fn set_advanced_enabled(conn: &Connection, id: i64, enabled: bool) -> Result<()> {
        let rows = conn.execute(
            "UPDATE lots SET advanced_pricing_enabled = ?1, updated_at = datetime('now')
             WHERE id = ?2",
            params![enabled as i32, id],
        )?;
        if rows == 0 {
            return Err(StorageError::NotFound(format!("lot {id}")));
        }
        Ok(())
    }

    /// Delete a lot. Its pricing blocks go with it.
    pub fn delete(conn: &Connection, id: i64) -> Result<bool> {
        let rows = conn.execute("DELETE FROM lots WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}

fn row_to_lot(row: &Row<'_>) -> rusqlite::Result<Lot> {
    Ok(Lot {
        id: row.get(0)?,
        operator_id: row.get(1)?,
        name: row.get(2)?,
        address: row.get(3)?,
        capacity: row.get(4)?,
        hourly_rate: row.get(5)?,
        daily_maximum_price: row.get(6)?,
        advanced_pricing_enabled: row.get::<_, i32>(7)? != 0,
        created_at: parse_datetime(&row.get::<_, String>(8)?),
        updated_at: parse_datetime(&row.get::<_, String>(9)?),
    })
}
