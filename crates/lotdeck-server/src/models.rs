//! API request and response models.

use lotdeck_core::input::deserialize_lenient_decimal;
use lotdeck_core::pricing::{BlockMode, DaySchedule, Slot, WeeklySchedule};
use lotdeck_storage::Lot;
use serde::{Deserialize, Serialize};

/// Request body for POST /api/auth/login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response body for POST /api/auth/login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub session_token: String,
    pub operator_id: i64,
}

/// Body of mutating requests that carry nothing but the session.
#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    pub session_token: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Response body for GET /api/lots.
#[derive(Debug, Serialize)]
pub struct LotsResponse {
    pub lots: Vec<Lot>,
}

/// Request body for PUT /api/lots/{id}/pricing.
///
/// Prices arrive as typed text; anything outside `[0-9.]` is stripped
/// before parsing.
#[derive(Debug, Deserialize)]
pub struct UpdatePricingRequest {
    pub session_token: String,
    #[serde(default, deserialize_with = "deserialize_lenient_decimal")]
    pub hourly_rate: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_decimal")]
    pub daily_maximum_price: Option<f64>,
}

/// A lot's advanced pricing as the editor sees it.
#[derive(Debug, Serialize)]
pub struct AdvancedPricingResponse {
    pub enabled: bool,
    pub days: WeeklySchedule,
}

/// Request body for PUT /api/lots/{id}/advanced-pricing.
#[derive(Debug, Deserialize)]
pub struct SaveAdvancedPricingRequest {
    pub session_token: String,
    pub days: WeeklySchedule,
}

/// Query parameters for GET /api/lots/{id}/rate.
///
/// Either part defaults to the server's current local time.
#[derive(Debug, Deserialize)]
pub struct RateQuery {
    pub day: Option<String>,
    pub time: Option<String>,
}

/// Response body for GET /api/lots/{id}/rate.
#[derive(Debug, Serialize)]
pub struct RateResponse {
    pub day: String,
    pub time: String,
    pub hourly_rate: f64,
    pub daily_maximum_price: f64,
    /// The block that set the price, absent when the lot's defaults apply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<Slot>,
}

/// Request body for POST /api/pricing/mode-change.
#[derive(Debug, Deserialize)]
pub struct ModeChangeRequest {
    pub schedule: DaySchedule,
    pub slot: Slot,
    pub mode: BlockMode,
    #[serde(default, deserialize_with = "deserialize_lenient_decimal")]
    pub hourly_rate: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_decimal")]
    pub daily_maximum_price: Option<f64>,
}

/// Response body for POST /api/pricing/mode-change.
#[derive(Debug, Serialize)]
pub struct ModeChangeResponse {
    pub schedule: DaySchedule,
    /// Whether the first two blocks now span the whole day.
    pub fully_covered: bool,
}
