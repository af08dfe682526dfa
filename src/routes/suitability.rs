//! Crop suitability endpoints.
//!
//! - GET /api/v1/zones/:zone/suitability?planting_date=YYYY-MM-DD
//! - GET /api/v1/suitability/:crop

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{Datelike, NaiveDate, Utc};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{load_zone_series, parse_date, parse_zone, AppState};
use crate::errors::{AppError, EngineError, ErrorResponse};
use crate::services::baseline::build_baseline;
use crate::services::climate::{zone_climate, ZoneClimate};
use crate::services::crops::{CropProfile, CropTable};
use crate::services::gdd::{project_harvest_from_baseline, HarvestProjection};
use crate::services::series::{DailySeries, Zone};
use crate::services::suitability::{
    rank_crops, suitability, SuitabilitySettings, SuitabilityVerdict,
};

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, IntoParams)]
pub struct SuitabilityQuery {
    /// Planting date for harvest projections (YYYY-MM-DD); defaults to today
    pub planting_date: Option<String>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Climatology-based harvest estimate for one crop.
#[derive(Debug, Serialize, ToSchema)]
pub struct CropHarvestProjection {
    pub crop: String,
    pub crop_key: String,
    pub projection: HarvestProjection,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ZoneSuitabilityResponse {
    pub climate: ZoneClimate,
    /// Every configured crop, best first
    pub verdicts: Vec<SuitabilityVerdict>,
    pub planting_date: NaiveDate,
    /// Empty when the zone has no complete year before the planting year
    pub harvest_projections: Vec<CropHarvestProjection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_note: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CropSuitabilityResponse {
    pub crop: String,
    pub crop_key: String,
    /// One verdict per zone with data, best first
    pub verdicts: Vec<SuitabilityVerdict>,
    /// Zones with no observations to score
    pub skipped_zones: Vec<Zone>,
}

/// Project harvest for every crop from the smoothed climatology of years before `start`.
fn harvest_projections(
    series: &DailySeries,
    crops: &CropTable,
    smoothing_days: u32,
    start: NaiveDate,
) -> Result<Vec<CropHarvestProjection>, EngineError> {
    let baseline = build_baseline(series, start.year())?.smoothed(smoothing_days)?;
    Ok(crops
        .iter()
        .map(|crop| CropHarvestProjection {
            crop: crop.name.clone(),
            crop_key: crop.key.clone(),
            projection: project_harvest_from_baseline(
                &baseline,
                crop.t_base,
                crop.gdd_target,
                start,
            ),
        })
        .collect())
}

fn crop_across_zones(
    all_series: &[DailySeries],
    crop: &CropProfile,
    settings: &SuitabilitySettings,
) -> Result<CropSuitabilityResponse, EngineError> {
    let mut verdicts = Vec::new();
    let mut skipped_zones = Vec::new();

    for series in all_series {
        match zone_climate(series) {
            Ok(climate) => verdicts.push(suitability(&climate, crop, settings)?),
            Err(EngineError::InsufficientData(reason)) => {
                tracing::warn!("Skipping {} for {}: {}", series.zone(), crop.key, reason);
                skipped_zones.push(series.zone());
            }
            Err(e) => return Err(e),
        }
    }

    verdicts.sort_by(|a, b| {
        a.category
            .cmp(&b.category)
            .then(b.combined_score.total_cmp(&a.combined_score))
    });

    Ok(CropSuitabilityResponse {
        crop: crop.name.clone(),
        crop_key: crop.key.clone(),
        verdicts,
        skipped_zones,
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Rank every configured crop against a zone's long-run climate.
#[utoipa::path(
    get,
    path = "/api/v1/zones/{zone}/suitability",
    tag = "Suitability",
    params(
        ("zone" = String, Path, description = "Zone name (Aba, Umuahia, Bende)"),
        SuitabilityQuery,
    ),
    responses(
        (status = 200, description = "Crop ranking for the zone", body = ZoneSuitabilityResponse),
        (status = 400, description = "Invalid date", body = ErrorResponse),
        (status = 404, description = "Zone not found", body = ErrorResponse),
        (status = 422, description = "No observations", body = ErrorResponse),
    )
)]
pub async fn get_zone_suitability(
    State(state): State<AppState>,
    Path(zone): Path<String>,
    Query(params): Query<SuitabilityQuery>,
) -> Result<Json<ZoneSuitabilityResponse>, AppError> {
    let zone = parse_zone(&zone)?;
    let planting_date = parse_date("planting_date", params.planting_date.as_deref())?
        .unwrap_or_else(|| Utc::now().date_naive());
    let series = load_zone_series(&state.pool, zone).await?;
    let engine = &state.engine;

    let climate = zone_climate(&series)?;
    let verdicts = rank_crops(&climate, &engine.crops, &engine.suitability)?;

    let (harvest_projections, projection_note) = match harvest_projections(
        &series,
        &engine.crops,
        engine.baseline_smoothing_days,
        planting_date,
    ) {
        Ok(projections) => (projections, None),
        Err(EngineError::InsufficientData(note)) => (Vec::new(), Some(note)),
        Err(e) => return Err(e.into()),
    };

    Ok(Json(ZoneSuitabilityResponse {
        climate,
        verdicts,
        planting_date,
        harvest_projections,
        projection_note,
    }))
}

/// Score one crop in every zone.
///
/// Zone series are loaded concurrently; zones without observations are
/// listed in `skipped_zones` instead of failing the request.
#[utoipa::path(
    get,
    path = "/api/v1/suitability/{crop}",
    tag = "Suitability",
    params(
        ("crop" = String, Path, description = "Crop key or name (e.g. cassava)"),
    ),
    responses(
        (status = 200, description = "Crop verdict per zone", body = CropSuitabilityResponse),
        (status = 404, description = "Crop not found", body = ErrorResponse),
    )
)]
pub async fn get_crop_suitability(
    State(state): State<AppState>,
    Path(crop): Path<String>,
) -> Result<Json<CropSuitabilityResponse>, AppError> {
    let crop = state.engine.crops.lookup(&crop)?;

    let futures: Vec<_> = Zone::all()
        .iter()
        .map(|&zone| load_zone_series(&state.pool, zone))
        .collect();
    let all_series = try_join_all(futures).await?;

    Ok(Json(crop_across_zones(
        &all_series,
        crop,
        &state.engine.suitability,
    )?))
}
