//! lotdeck storage - SQLite persistence layer.
//!
//! Stores operator accounts, their lots with flat pricing, and the
//! advanced pricing blocks of each lot.
//!
//! # Example
//!
//! ```no_run
//! use lotdeck_storage::{Database, NewLot, NewOperator};
//!
//! let db = Database::in_memory().unwrap();
//! let operator_id = db.create_operator(NewOperator {
//!     email: "owner@example.com".to_string(),
//!     password_hash: "$argon2id$...".to_string(),
//!     display_name: None,
//! }).unwrap();
//!
//! let lot_id = db.create_lot(operator_id, NewLot {
//!     name: "Harbor St".to_string(),
//!     address: None,
//!     capacity: 120,
//!     hourly_rate: Some(3.5),
//!     daily_maximum_price: Some(24.0),
//! }).unwrap();
//! ```

mod database;
pub mod error;
pub mod models;
mod pool;
pub mod repository;
mod schema;

pub use database::Database;
pub use error::{Result, StorageError};
pub use models::{Lot, NewLot, NewOperator, Operator};
pub use pool::ConnectionPool;
