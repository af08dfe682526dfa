//! Seasonality baseline and deviation endpoints.
//!
//! - GET /api/v1/zones/:zone/baseline/:day_of_year?current_year=YYYY&smoothed=true
//! - GET /api/v1/zones/:zone/deviation?as_of=YYYY-MM-DD

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{load_zone_series, parse_date, parse_zone, resolve_as_of, AppState};
use crate::errors::{AppError, EngineError, ErrorResponse};
use crate::services::baseline::{build_baseline, deviation, BaselineDay, DeviationReport};
use crate::services::series::{DailySeries, Zone};

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, IntoParams)]
pub struct BaselineQuery {
    /// Years before this one form the baseline; defaults to the year of the latest observation
    pub current_year: Option<i32>,
    /// Apply the centred day-of-year smoothing window (default false)
    #[serde(default)]
    pub smoothed: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DeviationQuery {
    /// Compare the year up to this date (YYYY-MM-DD); defaults to the latest observed day
    pub as_of: Option<String>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, ToSchema)]
pub struct BaselineResponse {
    pub zone: Zone,
    /// Historical years averaged into the baseline
    pub baseline_years: Vec<i32>,
    /// Smoothing window in days, null for the raw daily means
    pub smoothing_days: Option<u32>,
    pub day: BaselineDay,
}

fn baseline_day(
    series: &DailySeries,
    day_of_year: u32,
    current_year: i32,
    smoothing_days: Option<u32>,
) -> Result<BaselineResponse, EngineError> {
    let mut baseline = build_baseline(series, current_year)?;
    if let Some(window) = smoothing_days {
        baseline = baseline.smoothed(window)?;
    }
    let day = baseline.baseline_for(day_of_year)?.clone();

    Ok(BaselineResponse {
        zone: series.zone(),
        baseline_years: baseline.years().to_vec(),
        smoothing_days,
        day,
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Historical mean temperature and rainfall for one day of the year.
#[utoipa::path(
    get,
    path = "/api/v1/zones/{zone}/baseline/{day_of_year}",
    tag = "Baseline",
    params(
        ("zone" = String, Path, description = "Zone name (Aba, Umuahia, Bende)"),
        ("day_of_year" = u32, Path, description = "Day of year, 1-366"),
        BaselineQuery,
    ),
    responses(
        (status = 200, description = "Baseline day", body = BaselineResponse),
        (status = 400, description = "Day of year outside 1-366", body = ErrorResponse),
        (status = 404, description = "Zone not found", body = ErrorResponse),
        (status = 422, description = "No historical samples", body = ErrorResponse),
    )
)]
pub async fn get_baseline(
    State(state): State<AppState>,
    Path((zone, day_of_year)): Path<(String, u32)>,
    Query(params): Query<BaselineQuery>,
) -> Result<Json<BaselineResponse>, AppError> {
    let zone = parse_zone(&zone)?;
    let series = load_zone_series(&state.pool, zone).await?;
    let current_year = match params.current_year {
        Some(year) => year,
        None => resolve_as_of(&series, None)?.year(),
    };
    let smoothing = params
        .smoothed
        .then_some(state.engine.baseline_smoothing_days);

    Ok(Json(baseline_day(&series, day_of_year, current_year, smoothing)?))
}

/// Year-to-date temperature and rainfall against the baseline.
///
/// No forecast source is attached to this service, so the projected figures
/// are always null here.
#[utoipa::path(
    get,
    path = "/api/v1/zones/{zone}/deviation",
    tag = "Baseline",
    params(
        ("zone" = String, Path, description = "Zone name (Aba, Umuahia, Bende)"),
        DeviationQuery,
    ),
    responses(
        (status = 200, description = "Deviation report", body = DeviationReport),
        (status = 400, description = "Invalid date", body = ErrorResponse),
        (status = 404, description = "Zone not found", body = ErrorResponse),
        (status = 422, description = "No baseline or no current-year data", body = ErrorResponse),
    )
)]
pub async fn get_deviation(
    State(state): State<AppState>,
    Path(zone): Path<String>,
    Query(params): Query<DeviationQuery>,
) -> Result<Json<DeviationReport>, AppError> {
    let zone = parse_zone(&zone)?;
    let requested = parse_date("as_of", params.as_of.as_deref())?;
    let series = load_zone_series(&state.pool, zone).await?;
    let as_of = resolve_as_of(&series, requested)?;

    let baseline = build_baseline(&series, as_of.year())?;
    let report = deviation(&series, &baseline, as_of, &[], &state.engine.deviation)?;
    tracing::debug!(
        "{} deviation to {}: {:?} rainfall, {:?} temperature over {} days",
        zone,
        as_of,
        report.rainfall_class,
        report.temp_class,
        report.aligned_days
    );
    Ok(Json(report))
}
