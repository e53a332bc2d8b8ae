//! High-level database interface.

use std::io::Read;
use std::path::PathBuf;

use directories::ProjectDirs;
use lotdeck_core::pricing::DayPersistedBlock;
use lotdeck_core::WeeklySchedule;
use tracing::info;

use crate::error::{Result, StorageError};
use crate::models::{Lot, NewLot, NewOperator, Operator};
use crate::pool::ConnectionPool;
use crate::repository::{LotsRepo, OperatorRepo, PricingRepo};

/// High-level database interface for lotdeck.
#[derive(Clone)]
pub struct Database {
    pool: ConnectionPool,
}

impl Database {
    /// Opens the database in the default app data directory.
    pub fn new() -> Result<Self> {
        Self::with_path(Self::default_db_path()?)
    }

    /// Opens the database at a specific path.
    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("Opening database at: {:?}", path);
        let pool = ConnectionPool::new(&path)?;

        Ok(Self { pool })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let pool = ConnectionPool::in_memory()?;
        Ok(Self { pool })
    }

    /// Get the default database path.
    pub fn default_db_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "lotdeck", "lotdeck")
            .ok_or_else(|| StorageError::Config("Could not determine app data directory".into()))?;

        Ok(proj_dirs.data_dir().join("lotdeck.db"))
    }

    // === Operators ===

    pub fn create_operator(&self, operator: NewOperator) -> Result<i64> {
        let conn = self.pool.get()?;
        OperatorRepo::insert(&conn, operator)
    }

    pub fn get_operator(&self, id: i64) -> Result<Option<Operator>> {
        let conn = self.pool.get()?;
        OperatorRepo::get_by_id(&conn, id)
    }

    pub fn get_operator_by_email(&self, email: &str) -> Result<Option<Operator>> {
        let conn = self.pool.get()?;
        OperatorRepo::get_by_email(&conn, email)
    }

    pub fn record_login(&self, operator_id: i64) -> Result<()> {
        let conn = self.pool.get()?;
        OperatorRepo::update_last_login(&conn, operator_id)
    }

    pub fn set_operator_password(&self, operator_id: i64, password_hash: &str) -> Result<()> {
        let conn = self.pool.get()?;
        OperatorRepo::set_password(&conn, operator_id, password_hash)
    }

    pub fn count_operators(&self) -> Result<i64> {
        let conn = self.pool.get()?;
        OperatorRepo::count(&conn)
    }

    // === Lots ===

    pub fn create_lot(&self, operator_id: i64, lot: NewLot) -> Result<i64> {
        let conn = self.pool.get()?;
        LotsRepo::insert(&conn, operator_id, lot)
    }

    pub fn get_lot(&self, id: i64) -> Result<Option<Lot>> {
        let conn = self.pool.get()?;
        LotsRepo::get_by_id(&conn, id)
    }

    pub fn list_lots(&self, operator_id: i64) -> Result<Vec<Lot>> {
        let conn = self.pool.get()?;
        LotsRepo::list_for_operator(&conn, operator_id)
    }

    /// Update a lot's global rate and cap, returning the updated lot.
    pub fn update_lot_pricing(
        &self,
        id: i64,
        hourly_rate: f64,
        daily_maximum_price: f64,
    ) -> Result<Lot> {
        let conn = self.pool.get()?;
        LotsRepo::update_pricing(&conn, id, hourly_rate, daily_maximum_price)?;
        LotsRepo::get_by_id(&conn, id)?.ok_or_else(|| StorageError::NotFound(format!("lot {id}")))
    }

    pub fn delete_lot(&self, id: i64) -> Result<bool> {
        let conn = self.pool.get()?;
        LotsRepo::delete(&conn, id)
    }

    /// Bulk-inserts lots from a JSON array of lot records, all or nothing.
    ///
    /// Returns the ids of the new lots in file order.
    pub fn import_lots_json<R: Read>(&self, reader: R, operator_id: i64) -> Result<Vec<i64>> {
        let lots: Vec<NewLot> = serde_json::from_reader(reader)?;

        let conn = self.pool.get()?;
        let tx = conn.unchecked_transaction()?;
        let ids = lots
            .into_iter()
            .map(|lot| LotsRepo::insert(&tx, operator_id, lot))
            .collect::<Result<Vec<_>>>()?;
        tx.commit()?;

        info!("Imported {} lots for operator {}", ids.len(), operator_id);
        Ok(ids)
    }

    // === Advanced pricing ===

    /// Stored blocks of a lot, Monday first.
    pub fn get_pricing_blocks(&self, lot_id: i64) -> Result<Vec<DayPersistedBlock>> {
        let conn = self.pool.get()?;
        PricingRepo::get_for_lot(&conn, lot_id)
    }

    /// Atomically replaces the lot's week of blocks and enables advanced pricing.
    pub fn replace_pricing_blocks(
        &self,
        lot_id: i64,
        records: &[DayPersistedBlock],
    ) -> Result<usize> {
        let conn = self.pool.get()?;
        let count = PricingRepo::replace_for_lot(&conn, lot_id, records)?;
        info!("Saved advanced pricing for lot {} ({} blocks)", lot_id, count);
        Ok(count)
    }

    /// Atomically discards the lot's blocks and disables advanced pricing.
    pub fn disable_advanced_pricing(&self, lot_id: i64) -> Result<()> {
        let conn = self.pool.get()?;
        PricingRepo::clear_for_lot(&conn, lot_id)?;
        info!("Disabled advanced pricing for lot {}", lot_id);
        Ok(())
    }

    /// The lot's week, rebuilt against its current global pricing.
    ///
    /// A lot without advanced pricing gets global-default days.
    pub fn weekly_schedule(&self, lot: &Lot) -> Result<WeeklySchedule> {
        let global = lot.global_pricing();
        if !lot.advanced_pricing_enabled {
            return Ok(WeeklySchedule::empty(&global));
        }
        let records = self.get_pricing_blocks(lot.id)?;
        Ok(WeeklySchedule::from_persisted(&records, &global))
    }
}
