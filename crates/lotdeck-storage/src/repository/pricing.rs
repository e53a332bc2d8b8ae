//! Advanced pricing block repository.
//!
//! Blocks are stored one row per active slot, `position` being the slot
//! order within the day. Saves always rewrite the whole week.

use lotdeck_core::pricing::{DayPersistedBlock, PersistedBlock, PersistedMode};
use lotdeck_core::{DayOfWeek, TimeOfDay};
use rusqlite::{params, Connection};
use tracing::{debug, warn};

use crate::error::{Result, StorageError};

/// Repository for a lot's persisted pricing blocks.
pub struct PricingRepo;

impl PricingRepo {
    /// All stored blocks of a lot, Monday first, slot order within a day.
    pub fn get_for_lot(conn: &Connection, lot_id: i64) -> Result<Vec<DayPersistedBlock>> {
        let mut stmt = conn.prepare(
            "SELECT day_of_week, block_mode, start_time, end_time, hourly_rate, daily_maximum_price
             FROM pricing_blocks WHERE lot_id = ?1 ORDER BY position ASC, id ASC",
        )?;

        let rows = stmt
            .query_map([lot_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<f64>>(4)?,
                    row.get::<_, Option<f64>>(5)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(rows.len());
        for (day, mode, start, end, hourly_rate, daily_maximum_price) in rows {
            let Some(day_of_week) = DayOfWeek::parse(&day) else {
                warn!("Skipping pricing block with unknown day {:?} for lot {}", day, lot_id);
                continue;
            };
            records.push(DayPersistedBlock {
                day_of_week,
                block: PersistedBlock {
                    block_mode: PersistedMode::parse(&mode),
                    is_default: None,
                    start_time: start.parse().ok(),
                    end_time: end.parse().ok(),
                    hourly_rate,
                    daily_maximum_price,
                },
            });
        }

        // Stable, so positions stay in order within each day.
        records.sort_by_key(|r| r.day_of_week);
        Ok(records)
    }

    /// Replaces every stored block of the lot and enables advanced pricing,
    /// all in one transaction.
    ///
    /// Records with no usable mode are skipped.
    pub fn replace_for_lot(
        conn: &Connection,
        lot_id: i64,
        records: &[DayPersistedBlock],
    ) -> Result<usize> {
        let tx = conn.unchecked_transaction()?;

        let updated = tx.execute(
            "UPDATE lots SET advanced_pricing_enabled = 1, updated_at = datetime('now')
             WHERE id = ?1",
            [lot_id],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("lot {lot_id}")));
        }

        tx.execute("DELETE FROM pricing_blocks WHERE lot_id = ?1", [lot_id])?;

        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO pricing_blocks
                 (lot_id, day_of_week, position, block_mode, start_time, end_time, hourly_rate, daily_maximum_price)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;

            for day in DayOfWeek::ALL {
                let mut position = 0i64;
                for record in records.iter().filter(|r| r.day_of_week == day) {
                    let block = &record.block;
                    let Some(mode) = block.resolved_mode() else {
                        continue;
                    };
                    stmt.execute(params![
                        lot_id,
                        day.as_str(),
                        position,
                        mode.as_str(),
                        block.start_time.unwrap_or(TimeOfDay::MIDNIGHT).to_string(),
                        block.end_time.unwrap_or(TimeOfDay::END_OF_DAY).to_string(),
                        block.hourly_rate,
                        block.daily_maximum_price
                    ])?;
                    position += 1;
                    inserted += 1;
                }
            }
        }

        tx.commit()?;
        debug!("Stored {} pricing blocks for lot {}", inserted, lot_id);
        Ok(inserted)
    }

    /// Discards every stored block and disables advanced pricing.
    pub fn clear_for_lot(conn: &Connection, lot_id: i64) -> Result<()> {
        let tx = conn.unchecked_transaction()?;

        let updated = tx.execute(
            "UPDATE lots SET advanced_pricing_enabled = 0, updated_at = datetime('now')
             WHERE id = ?1",
            [lot_id],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("lot {lot_id}")));
        }
        tx.execute("DELETE FROM pricing_blocks WHERE lot_id = ?1", [lot_id])?;

        tx.commit()?;
        Ok(())
    }
}
