pub mod baseline;
pub mod gdd;
pub mod health;
pub mod onset;
pub mod risk;
pub mod suitability;
pub mod zones;

use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::PgPool;

use crate::config::EngineConfig;
use crate::db::{models, queries};
use crate::errors::{AppError, EngineError};
use crate::helpers::{dec_to_f64, opt_dec_to_f64};
use crate::services::series::{DailySeries, Observation, Zone};

/// Shared application state for the analytics endpoints.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) pool: PgPool,
    pub(crate) engine: Arc<EngineConfig>,
}

/// Parse a zone path segment. Unknown zones are a 404.
pub(crate) fn parse_zone(raw: &str) -> Result<Zone, AppError> {
    raw.parse::<Zone>()
        .map_err(|_| AppError::NotFound(format!("Zone '{}' not found", raw)))
}

/// Parse an optional `YYYY-MM-DD` query parameter.
pub(crate) fn parse_date(name: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    raw.map(|s| {
        s.parse::<NaiveDate>()
            .map_err(|e| AppError::BadRequest(format!("Invalid {} '{}': {}", name, s, e)))
    })
    .transpose()
}

pub(crate) fn observation_from_row(row: &models::ObservationRow, zone: Zone) -> Observation {
    Observation {
        timestamp: row.observed_at,
        zone,
        temp_current: dec_to_f64(row.temp_current_c),
        temp_max: dec_to_f64(row.temp_max_c),
        temp_min: dec_to_f64(row.temp_min_c),
        humidity: dec_to_f64(row.humidity_pct),
        precipitation: dec_to_f64(row.precipitation_mm),
        wind_speed: dec_to_f64(row.wind_speed_ms),
        pressure: opt_dec_to_f64(row.pressure_hpa),
    }
}

/// Load a zone's observations and fold them into a daily series.
pub(crate) async fn load_zone_series(pool: &PgPool, zone: Zone) -> Result<DailySeries, AppError> {
    let rows = queries::get_zone_observations(pool, zone.as_str()).await?;
    let observations = rows
        .iter()
        .map(|row| observation_from_row(row, zone))
        .collect();
    let series = DailySeries::from_observations(zone, observations).map_err(|e| {
        // Bad stored rows are not the caller's fault, so never a 400
        tracing::error!("Stored observations for {} failed validation: {}", zone, e);
        AppError::Unprocessable(e.to_string())
    })?;
    if series.is_empty() {
        tracing::warn!("No stored observations for {}", zone);
    }
    tracing::debug!(
        "Loaded {} observations for {} into {} daily records",
        rows.len(),
        zone,
        series.len()
    );
    Ok(series)
}

/// Requested date, or the zone's latest observed date.
pub(crate) fn resolve_as_of(
    series: &DailySeries,
    requested: Option<NaiveDate>,
) -> Result<NaiveDate, AppError> {
    requested.or(series.last_date()).ok_or_else(|| {
        EngineError::InsufficientData(format!("No observations for {}", series.zone())).into()
    })
}
