//! Data models for storage.

use chrono::{DateTime, Utc};
use lotdeck_core::input::deserialize_lenient_decimal;
use lotdeck_core::GlobalPricing;
use serde::{Deserialize, Serialize};

/// An operator account.
#[derive(Debug, Clone, Serialize)]
pub struct Operator {
    pub id: i64,
    /// Lower-cased login email.
    pub email: String,
    /// Argon2 PHC string.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Parameters for creating an operator.
#[derive(Debug, Clone)]
pub struct NewOperator {
    pub email: String,
    pub password_hash: String,
    pub display_name: Option<String>,
}

/// A parking lot and its flat pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    pub id: i64,
    pub operator_id: i64,
    pub name: String,
    pub address: Option<String>,
    /// Number of spaces.
    pub capacity: i64,
    pub hourly_rate: f64,
    pub daily_maximum_price: f64,
    pub advanced_pricing_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lot {
    /// The defaults advanced pricing falls back to.
    pub fn global_pricing(&self) -> GlobalPricing {
        GlobalPricing::new(self.hourly_rate, self.daily_maximum_price)
    }
}

/// Parameters for creating a lot.
///
/// Also the record shape of lot import files, hence the camelCase names and
/// lenient price decoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLot {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub capacity: i64,
    #[serde(default, deserialize_with = "deserialize_lenient_decimal")]
    pub hourly_rate: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_decimal")]
    pub daily_maximum_price: Option<f64>,
}
