//! Database repositories for each table.

pub mod lots;
pub mod operators;
pub mod pricing;

pub use lots::LotsRepo;
pub use operators::OperatorRepo;
pub use pricing::PricingRepo;

use chrono::{DateTime, Utc};

/// Parse a datetime stored either as RFC 3339 or SQLite's `datetime('now')`.
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|dt| dt.and_utc())
        })
        .unwrap_or_else(|_| Utc::now())
}
