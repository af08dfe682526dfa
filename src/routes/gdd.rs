//! Growing degree day endpoints.
//!
//! - GET /api/v1/zones/:zone/gdd/:crop?season_start=YYYY-MM-DD&as_of=YYYY-MM-DD
//! - GET /api/v1/zones/:zone/gdd/:crop/annual

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{load_zone_series, parse_date, parse_zone, resolve_as_of, AppState};
use crate::errors::{AppError, ErrorResponse};
use crate::services::crops::CropProfile;
use crate::services::gdd::{annual_gdd_curves, gdd_progress, AnnualGddCurve, GddProgress};
use crate::services::series::{DailySeries, Zone};

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, IntoParams)]
pub struct GddQuery {
    /// Accumulation start (YYYY-MM-DD); defaults to the detected rainy-season onset
    pub season_start: Option<String>,
    /// Evaluation date (YYYY-MM-DD); defaults to the latest observed day
    pub as_of: Option<String>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Calendar-year accumulation curves for one crop's base temperature.
#[derive(Debug, Serialize, ToSchema)]
pub struct AnnualGddResponse {
    pub zone: Zone,
    pub crop: String,
    pub crop_key: String,
    pub t_base: f64,
    pub target_gdd: f64,
    pub years: Vec<AnnualGddCurve>,
}

fn annual_response(series: &DailySeries, crop: &CropProfile) -> AnnualGddResponse {
    AnnualGddResponse {
        zone: series.zone(),
        crop: crop.name.clone(),
        crop_key: crop.key.clone(),
        t_base: crop.t_base,
        target_gdd: crop.gdd_target,
        years: annual_gdd_curves(series, crop.t_base),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Heat-unit progress of a crop towards maturity.
#[utoipa::path(
    get,
    path = "/api/v1/zones/{zone}/gdd/{crop}",
    tag = "GDD",
    params(
        ("zone" = String, Path, description = "Zone name (Aba, Umuahia, Bende)"),
        ("crop" = String, Path, description = "Crop key or name (e.g. maize)"),
        GddQuery,
    ),
    responses(
        (status = 200, description = "GDD progress", body = GddProgress),
        (status = 400, description = "Invalid date", body = ErrorResponse),
        (status = 404, description = "Zone or crop not found", body = ErrorResponse),
        (status = 422, description = "No onset or no observations", body = ErrorResponse),
    )
)]
pub async fn get_gdd_progress(
    State(state): State<AppState>,
    Path((zone, crop)): Path<(String, String)>,
    Query(params): Query<GddQuery>,
) -> Result<Json<GddProgress>, AppError> {
    let zone = parse_zone(&zone)?;
    let crop = state.engine.crops.lookup(&crop)?;
    let season_start = parse_date("season_start", params.season_start.as_deref())?;
    let requested = parse_date("as_of", params.as_of.as_deref())?;

    let series = load_zone_series(&state.pool, zone).await?;
    let as_of = resolve_as_of(&series, requested)?;

    let progress = gdd_progress(
        &series,
        crop,
        season_start,
        as_of,
        &state.engine.gdd,
        &state.engine.onset,
    )?;
    tracing::debug!(
        "{} {}: {:.1}/{} GDD since {} ({})",
        zone,
        crop.key,
        progress.cumulative_gdd,
        progress.target_gdd,
        progress.season_start,
        progress.band.display_name()
    );
    Ok(Json(progress))
}

/// Cumulative GDD per calendar year, reset on 1 January.
#[utoipa::path(
    get,
    path = "/api/v1/zones/{zone}/gdd/{crop}/annual",
    tag = "GDD",
    params(
        ("zone" = String, Path, description = "Zone name (Aba, Umuahia, Bende)"),
        ("crop" = String, Path, description = "Crop key or name (e.g. maize)"),
    ),
    responses(
        (status = 200, description = "Annual GDD curves", body = AnnualGddResponse),
        (status = 404, description = "Zone or crop not found", body = ErrorResponse),
    )
)]
pub async fn get_annual_gdd(
    State(state): State<AppState>,
    Path((zone, crop)): Path<(String, String)>,
) -> Result<Json<AnnualGddResponse>, AppError> {
    let zone = parse_zone(&zone)?;
    let crop = state.engine.crops.lookup(&crop)?;
    let series = load_zone_series(&state.pool, zone).await?;
    Ok(Json(annual_response(&series, crop)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::crops::CropTable;
    use crate::services::test_support::{date, temp_series};

    #[test]
    fn test_annual_response_uses_crop_base() {
        // 30/20 gives a mean of 25: 15 GDD/day for maize, 7 for cassava
        let series = temp_series(Zone::Umuahia, date(2023, 12, 30), &[(30.0, 20.0); 4]);
        let table = CropTable::default();

        let maize = annual_response(&series, table.lookup("maize").unwrap());
        assert_eq!(maize.crop_key, "maize");
        assert_eq!(maize.years.len(), 2);
        assert_eq!(maize.years[0].year, 2023);
        assert!((maize.years[0].total - 30.0).abs() < 1e-9);
        assert!((maize.years[1].total - 30.0).abs() < 1e-9);

        let cassava = annual_response(&series, table.lookup("cassava").unwrap());
        assert!((cassava.years[1].total - 14.0).abs() < 1e-9);
        assert_eq!(cassava.target_gdd, 3000.0);
    }
}
