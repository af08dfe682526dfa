//! Rainfall window and agricultural risk endpoints.
//!
//! - GET /api/v1/zones/:zone/rainfall/window?window=7&field=precipitation&aggregation=sum
//!   with an optional `as_of=YYYY-MM-DD`
//! - GET /api/v1/zones/:zone/risk?as_of=YYYY-MM-DD&days=N
//! - GET /api/v1/zones/:zone/risk/drought-frequency

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{load_zone_series, parse_date, parse_zone, resolve_as_of, AppState};
use crate::config::EngineConfig;
use crate::errors::{AppError, EngineError, ErrorResponse};
use crate::helpers::window_start;
use crate::services::risk::{
    condition_advisories, daily_risk, drought_days_per_year, risk_alerts, AdvisoryBand,
    ConditionAdvisory, DailyRisk, DroughtFrequency, RiskAlert, RiskLevel,
};
use crate::services::series::{DailyField, DailySeries, Zone};
use crate::services::window::{rolling_window, Aggregation, RollingWindowResult, WindowSpan};

/// Default number of classified days returned by the risk endpoint.
const DEFAULT_HISTORY_DAYS: u32 = 30;

/// Upper bound for the `days` query parameter.
const MAX_HISTORY_DAYS: u32 = 366;

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, IntoParams)]
pub struct WindowQuery {
    /// Window length: days ("7", "30d") or "all"; defaults to 7
    pub window: Option<String>,
    /// Daily field to aggregate; defaults to precipitation
    pub field: Option<DailyField>,
    /// "sum" or "mean"; defaults to sum
    pub aggregation: Option<Aggregation>,
    /// Last day of the window (YYYY-MM-DD); defaults to the latest observed day
    pub as_of: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct RiskQuery {
    /// Evaluation date (YYYY-MM-DD); defaults to the latest observed day
    pub as_of: Option<String>,
    /// Number of classified days ending at `as_of` (1-366, default 30)
    pub days: Option<u32>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Current risk state plus recent daily classifications.
#[derive(Debug, Serialize, ToSchema)]
pub struct RiskResponse {
    pub zone: Zone,
    pub as_of: NaiveDate,
    /// Rolling window used for classification, days
    pub window_days: u32,
    /// Rolling rainfall ending at `as_of`, mm
    pub rolling_mm: f64,
    pub level: RiskLevel,
    pub advisory: AdvisoryBand,
    /// Alerts raised over the history range, oldest first
    pub alerts: Vec<RiskAlert>,
    /// Daily extremes flagged on `as_of`; empty when the day was not observed
    pub conditions: Vec<ConditionAdvisory>,
    pub history: Vec<DailyRisk>,
}

fn risk_summary(
    series: &DailySeries,
    engine: &EngineConfig,
    as_of: NaiveDate,
    days: u32,
) -> Result<RiskResponse, EngineError> {
    if !(1..=MAX_HISTORY_DAYS).contains(&days) {
        return Err(EngineError::OutOfRangeInput(format!(
            "days {} outside 1-{}",
            days, MAX_HISTORY_DAYS
        )));
    }
    let from = window_start(as_of, days).ok_or_else(|| {
        EngineError::OutOfRangeInput(format!("{} days before {} is out of range", days, as_of))
    })?;
    let history = daily_risk(series, &engine.risk, from, as_of)?;
    let alerts = risk_alerts(series, &engine.risk, from, as_of)?;
    let current = history.last().cloned().ok_or_else(|| {
        EngineError::InsufficientData(format!(
            "{}: nothing to classify at {}",
            series.zone(),
            as_of
        ))
    })?;
    let conditions = series
        .get(as_of)
        .map(|record| condition_advisories(record, &engine.conditions))
        .unwrap_or_default();

    Ok(RiskResponse {
        zone: series.zone(),
        as_of,
        window_days: engine.risk.window_days,
        rolling_mm: current.rolling_mm,
        level: current.level,
        advisory: current.advisory,
        alerts,
        conditions,
        history,
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Sum or mean of a daily field over a trailing window.
#[utoipa::path(
    get,
    path = "/api/v1/zones/{zone}/rainfall/window",
    tag = "Rainfall",
    params(
        ("zone" = String, Path, description = "Zone name (Aba, Umuahia, Bende)"),
        WindowQuery,
    ),
    responses(
        (status = 200, description = "Window aggregate", body = RollingWindowResult),
        (status = 400, description = "Invalid window or date", body = ErrorResponse),
        (status = 404, description = "Zone not found", body = ErrorResponse),
        (status = 422, description = "No observations in the window", body = ErrorResponse),
    )
)]
pub async fn get_rainfall_window(
    State(state): State<AppState>,
    Path(zone): Path<String>,
    Query(params): Query<WindowQuery>,
) -> Result<Json<RollingWindowResult>, AppError> {
    let zone = parse_zone(&zone)?;
    let window: WindowSpan = params.window.as_deref().unwrap_or("7").parse()?;
    let requested = parse_date("as_of", params.as_of.as_deref())?;

    let series = load_zone_series(&state.pool, zone).await?;
    let as_of = resolve_as_of(&series, requested)?;

    let result = rolling_window(
        &series,
        params.field.unwrap_or(DailyField::Precipitation),
        window,
        as_of,
        params.aggregation.unwrap_or(Aggregation::Sum),
    )?;
    if result.missing_days > 0 {
        let gaps = series.gaps(result.start_date, as_of);
        tracing::warn!(
            "{}: {} unobserved day(s) in the window ending {}, earliest {:?}",
            zone,
            gaps.len(),
            as_of,
            gaps.first()
        );
    }
    tracing::debug!("{} window {:?} ending {}: {}", zone, window, as_of, result.value);
    Ok(Json(result))
}

/// Drought/waterlogging classification, advisory band and alerts.
#[utoipa::path(
    get,
    path = "/api/v1/zones/{zone}/risk",
    tag = "Risk",
    params(
        ("zone" = String, Path, description = "Zone name (Aba, Umuahia, Bende)"),
        RiskQuery,
    ),
    responses(
        (status = 200, description = "Risk assessment", body = RiskResponse),
        (status = 400, description = "Invalid date or day count", body = ErrorResponse),
        (status = 404, description = "Zone not found", body = ErrorResponse),
        (status = 422, description = "No observations", body = ErrorResponse),
    )
)]
pub async fn get_risk(
    State(state): State<AppState>,
    Path(zone): Path<String>,
    Query(params): Query<RiskQuery>,
) -> Result<Json<RiskResponse>, AppError> {
    let zone = parse_zone(&zone)?;
    let requested = parse_date("as_of", params.as_of.as_deref())?;
    let series = load_zone_series(&state.pool, zone).await?;
    let as_of = resolve_as_of(&series, requested)?;

    let response = risk_summary(
        &series,
        &state.engine,
        as_of,
        params.days.unwrap_or(DEFAULT_HISTORY_DAYS),
    )?;
    if !response.alerts.is_empty() {
        tracing::info!(
            "{}: {} risk alerts in the {} days to {}",
            zone,
            response.alerts.len(),
            response.history.len(),
            as_of
        );
    }
    Ok(Json(response))
}

/// Drought days per calendar year over the observed record.
#[utoipa::path(
    get,
    path = "/api/v1/zones/{zone}/risk/drought-frequency",
    tag = "Risk",
    params(
        ("zone" = String, Path, description = "Zone name (Aba, Umuahia, Bende)"),
    ),
    responses(
        (status = 200, description = "Drought days per year", body = Vec<DroughtFrequency>),
        (status = 404, description = "Zone not found", body = ErrorResponse),
    )
)]
pub async fn get_drought_frequency(
    State(state): State<AppState>,
    Path(zone): Path<String>,
) -> Result<Json<Vec<DroughtFrequency>>, AppError> {
    let zone = parse_zone(&zone)?;
    let series = load_zone_series(&state.pool, zone).await?;
    Ok(Json(drought_days_per_year(&series, &state.engine.risk)?))
}
