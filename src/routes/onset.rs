//! Rainy-season onset endpoint.
//!
//! - GET /api/v1/zones/:zone/onset

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use super::{load_zone_series, parse_zone, AppState};
use crate::errors::{AppError, EngineError, ErrorResponse};
use crate::services::onset::{onset_by_year, onset_trend, OnsetEstimate, OnsetRule, OnsetTrend};
use crate::services::series::{DailySeries, Zone};

/// Onset per observed year and the trend across years.
#[derive(Debug, Serialize, ToSchema)]
pub struct OnsetResponse {
    pub zone: Zone,
    /// Rainfall that must fall within `window_days` to mark the onset, mm
    pub threshold_mm: f64,
    pub window_days: u32,
    pub estimates: Vec<OnsetEstimate>,
    /// Null when fewer than two years have an onset
    pub trend: Option<OnsetTrend>,
    /// Why the trend is missing, when it is
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend_note: Option<String>,
}

fn onset_summary(series: &DailySeries, rule: &OnsetRule) -> Result<OnsetResponse, EngineError> {
    let estimates = onset_by_year(series, rule)?;
    let (trend, trend_note) = match onset_trend(&estimates, rule.trend_dead_zone) {
        Ok(trend) => (Some(trend), None),
        Err(EngineError::InsufficientData(note)) => (None, Some(note)),
        Err(e) => return Err(e),
    };

    Ok(OnsetResponse {
        zone: series.zone(),
        threshold_mm: rule.threshold_mm,
        window_days: rule.window_days,
        estimates,
        trend,
        trend_note,
    })
}

/// Rainy-season onset per year, with the direction it is drifting in.
#[utoipa::path(
    get,
    path = "/api/v1/zones/{zone}/onset",
    tag = "Onset",
    params(
        ("zone" = String, Path, description = "Zone name (Aba, Umuahia, Bende)"),
    ),
    responses(
        (status = 200, description = "Onset estimates and trend", body = OnsetResponse),
        (status = 404, description = "Zone not found", body = ErrorResponse),
    )
)]
pub async fn get_onset(
    State(state): State<AppState>,
    Path(zone): Path<String>,
) -> Result<Json<OnsetResponse>, AppError> {
    let zone = parse_zone(&zone)?;
    let series = load_zone_series(&state.pool, zone).await?;
    let response = onset_summary(&series, &state.engine.onset)?;

    let detected = response
        .estimates
        .iter()
        .filter(|e| e.onset_date.is_some())
        .count();
    match &response.trend {
        Some(trend) => tracing::debug!(
            "{}: onset detected in {}/{} years, trend {} ({:+.2} days/year)",
            zone,
            detected,
            response.estimates.len(),
            trend.direction,
            trend.slope_days_per_year
        ),
        None => tracing::debug!(
            "{}: onset detected in {}/{} years, no trend",
            zone,
            detected,
            response.estimates.len()
        ),
    }
    Ok(Json(response))
}
