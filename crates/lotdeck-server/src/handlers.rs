//! API route handlers.

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::Json;
use chrono::{Datelike, Local};
use tracing::{debug, info, warn};

use lotdeck_core::auth::SessionToken;
use lotdeck_core::{DayOfWeek, GlobalPricing, TimeOfDay};
use lotdeck_storage::Lot;

use crate::error::{ApiError, Result};
use crate::models::{
    AdvancedPricingResponse, LoginRequest, LoginResponse, LotsResponse, ModeChangeRequest,
    ModeChangeResponse, RateQuery, RateResponse, SaveAdvancedPricingRequest, SessionRequest,
    SuccessResponse, UpdatePricingRequest,
};
use crate::state::AppState;

/// Resolves a session token to its operator.
fn require_operator(state: &AppState, token: Option<SessionToken>) -> Result<i64> {
    let token = token.ok_or(ApiError::Unauthorized)?;
    state
        .auth
        .validate_session(&token)
        .ok_or(ApiError::SessionExpired)
}

/// Reads `Authorization: Bearer <token>`.
fn bearer_token(headers: &HeaderMap) -> Option<SessionToken> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(SessionToken::from_string)
}

fn body_token(token: String) -> Option<SessionToken> {
    (!token.is_empty()).then(|| SessionToken::from_string(token))
}

/// Loads a lot, hiding lots owned by other operators.
fn owned_lot(state: &AppState, operator_id: i64, lot_id: i64) -> Result<Lot> {
    state
        .db
        .get_lot(lot_id)?
        .filter(|lot| lot.operator_id == operator_id)
        .ok_or_else(|| ApiError::NotFound(format!("lot {lot_id}")))
}

fn advanced_pricing(state: &AppState, lot: &Lot) -> Result<AdvancedPricingResponse> {
    let days = state
        .db
        .weekly_schedule(lot)?
        .adjust_coverage(&lot.global_pricing());
    Ok(AdvancedPricingResponse {
        enabled: lot.advanced_pricing_enabled,
        days,
    })
}

/// POST /api/auth/login - Verify credentials and open a session.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let operator = state
        .db
        .get_operator_by_email(&req.email)?
        .ok_or(ApiError::InvalidCredentials)?;

    let is_valid = state
        .auth
        .verify_password(&req.password, &operator.password_hash)
        .map_err(|_| ApiError::InvalidCredentials)?;

    if !is_valid {
        warn!(operator_id = operator.id, "Login rejected");
        return Err(ApiError::InvalidCredentials);
    }

    let token = state.auth.create_session(operator.id);

    if let Err(e) = state.db.record_login(operator.id) {
        warn!("Failed to record login for operator {}: {}", operator.id, e);
    }

    info!(operator_id = operator.id, "Operator logged in");

    Ok(Json(LoginResponse {
        success: true,
        session_token: token.as_str().to_string(),
        operator_id: operator.id,
    }))
}

/// POST /api/auth/logout - End a session.
pub async fn logout(
    State(state): State<AppState>,
    Json(req): Json<SessionRequest>,
) -> Result<Json<SuccessResponse>> {
    let token = SessionToken::from_string(req.session_token);
    let success = state.auth.logout(&token);
    debug!(success, "Logout");
    Ok(Json(SuccessResponse { success }))
}

/// GET /api/lots - Lots owned by the calling operator.
pub async fn list_lots(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<LotsResponse>> {
    let operator_id = require_operator(&state, bearer_token(&headers))?;
    let lots = state.db.list_lots(operator_id)?;
    Ok(Json(LotsResponse { lots }))
}

/// GET /api/lots/{id} - Lot detail.
pub async fn get_lot(
    State(state): State<AppState>,
    Path(lot_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Lot>> {
    let operator_id = require_operator(&state, bearer_token(&headers))?;
    Ok(Json(owned_lot(&state, operator_id, lot_id)?))
}

/// PUT /api/lots/{id}/pricing - Set the global hourly rate and daily cap.
pub async fn update_pricing(
    State(state): State<AppState>,
    Path(lot_id): Path<i64>,
    Json(req): Json<UpdatePricingRequest>,
) -> Result<Json<Lot>> {
    let operator_id = require_operator(&state, body_token(req.session_token))?;
    owned_lot(&state, operator_id, lot_id)?;

    let hourly_rate = req
        .hourly_rate
        .ok_or_else(|| ApiError::BadRequest("hourly_rate must be a number".to_string()))?;
    let daily_maximum_price = req
        .daily_maximum_price
        .ok_or_else(|| ApiError::BadRequest("daily_maximum_price must be a number".to_string()))?;

    let lot = state
        .db
        .update_lot_pricing(lot_id, hourly_rate, daily_maximum_price)?;

    info!(
        lot_id,
        hourly_rate, daily_maximum_price, "Lot pricing updated"
    );
    Ok(Json(lot))
}

/// GET /api/lots/{id}/advanced-pricing - The editor's weekly schedule.
pub async fn get_advanced_pricing(
    State(state): State<AppState>,
    Path(lot_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<AdvancedPricingResponse>> {
    let operator_id = require_operator(&state, bearer_token(&headers))?;
    let lot = owned_lot(&state, operator_id, lot_id)?;
    Ok(Json(advanced_pricing(&state, &lot)?))
}

/// PUT /api/lots/{id}/advanced-pricing - Save all seven days at once.
pub async fn save_advanced_pricing(
    State(state): State<AppState>,
    Path(lot_id): Path<i64>,
    Json(req): Json<SaveAdvancedPricingRequest>,
) -> Result<Json<AdvancedPricingResponse>> {
    let operator_id = require_operator(&state, body_token(req.session_token))?;
    let lot = owned_lot(&state, operator_id, lot_id)?;
    let global = lot.global_pricing();

    if let Some((day, e)) = req.days.first_invalid() {
        warn!(lot_id, %day, "Rejected malformed pricing day: {}", e);
        return Err(ApiError::BadRequest(format!("{day}: {e}")));
    }

    let days = req.days.adjust_coverage(&global);
    if let Some((day, a, b)) = days.first_overlap() {
        warn!(lot_id, %day, "Rejected overlapping pricing blocks");
        return Err(ApiError::BadRequest(format!(
            "{day}: blocks {a} and {b} overlap"
        )));
    }

    state
        .db
        .replace_pricing_blocks(lot_id, &days.to_persisted(&global))?;

    let lot = owned_lot(&state, operator_id, lot_id)?;
    Ok(Json(advanced_pricing(&state, &lot)?))
}

/// POST /api/lots/{id}/advanced-pricing/disable - Back to flat pricing.
pub async fn disable_advanced_pricing(
    State(state): State<AppState>,
    Path(lot_id): Path<i64>,
    Json(req): Json<SessionRequest>,
) -> Result<Json<SuccessResponse>> {
    let operator_id = require_operator(&state, body_token(req.session_token))?;
    owned_lot(&state, operator_id, lot_id)?;

    state.db.disable_advanced_pricing(lot_id)?;
    Ok(Json(SuccessResponse { success: true }))
}

/// GET /api/lots/{id}/rate - Rate and cap in force at a moment.
pub async fn get_rate(
    State(state): State<AppState>,
    Path(lot_id): Path<i64>,
    Query(query): Query<RateQuery>,
    headers: HeaderMap,
) -> Result<Json<RateResponse>> {
    let operator_id = require_operator(&state, bearer_token(&headers))?;
    let lot = owned_lot(&state, operator_id, lot_id)?;

    let now = Local::now();
    let day = match query.day {
        Some(ref s) => DayOfWeek::parse(s)
            .ok_or_else(|| ApiError::BadRequest(format!("unknown day: {s}")))?,
        None => DayOfWeek::from_chrono(now.weekday()),
    };
    let time = match query.time {
        Some(ref s) => s
            .parse::<TimeOfDay>()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?,
        None => TimeOfDay::from_naive_time(now.time()),
    };

    let global = lot.global_pricing();
    let pricing = state
        .db
        .weekly_schedule(&lot)?
        .effective_pricing(day, time, &global);

    debug!(lot_id, %day, %time, ?pricing, "Resolved rate");

    Ok(Json(RateResponse {
        day: day.to_string(),
        time: time.to_string(),
        hourly_rate: pricing.hourly_rate,
        daily_maximum_price: pricing.daily_maximum_price,
        slot: pricing.slot,
    }))
}

/// POST /api/pricing/mode-change - Apply an editor mode selection.
///
/// Stateless: the client sends the day as it stands and gets the corrected
/// day back.
pub async fn mode_change(Json(req): Json<ModeChangeRequest>) -> Result<Json<ModeChangeResponse>> {
    let hourly_rate = req
        .hourly_rate
        .ok_or_else(|| ApiError::BadRequest("hourly_rate must be a number".to_string()))?;
    let daily_maximum_price = req.daily_maximum_price.ok_or_else(|| {
        ApiError::BadRequest("daily_maximum_price must be a number".to_string())
    })?;
    let global = GlobalPricing::new(hourly_rate, daily_maximum_price);

    let schedule = req
        .schedule
        .validate()
        .and_then(|()| req.schedule.apply_mode_change(req.slot, req.mode, &global))
        .map_err(|e| {
            debug!("Mode change rejected: {}", e);
            e
        })?
        .adjust_coverage(&global);

    Ok(Json(ModeChangeResponse {
        fully_covered: schedule.is_fully_covered(),
        schedule,
    }))
}
