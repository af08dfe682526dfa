//! Zone and crop catalogue endpoints.
//!
//! - GET /api/v1/zones
//! - GET /api/v1/crops?month=N
//! - GET /api/v1/zones/:zone/statistics?as_of=YYYY-MM-DD

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{load_zone_series, parse_date, parse_zone, resolve_as_of, AppState};
use crate::db::{models, queries};
use crate::errors::{AppError, EngineError, ErrorResponse};
use crate::services::calendar::{planting_status, season_for_month, PlantingStatus, Season};
use crate::services::climate::{annual_metrics, zone_statistics, AnnualMetrics, ZoneStatistics};
use crate::services::crops::{CropProfile, CropTable};
use crate::services::series::Zone;

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, IntoParams)]
pub struct CropsQuery {
    /// Month (1-12) to evaluate planting status for; defaults to the current month
    pub month: Option<u32>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AsOfQuery {
    /// Evaluation date (YYYY-MM-DD); defaults to the zone's latest observed day
    pub as_of: Option<String>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// A configured zone and how much data the store holds for it.
#[derive(Debug, Serialize, ToSchema)]
pub struct ZoneSummary {
    pub zone: Zone,
    /// Number of stored observations
    pub observations: i64,
    pub first_observed: Option<DateTime<Utc>>,
    pub last_observed: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CropListing {
    pub profile: CropProfile,
    pub planting_status: PlantingStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CropsResponse {
    pub month: u32,
    pub season: Season,
    pub crops: Vec<CropListing>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatisticsResponse {
    pub statistics: ZoneStatistics,
    /// Per-year totals, ascending by year
    pub annual: Vec<AnnualMetrics>,
}

/// Every configured zone, with zero coverage for zones the store has never seen.
fn zone_summaries(coverage: &[models::ZoneCoverage]) -> Vec<ZoneSummary> {
    Zone::all()
        .iter()
        .map(|&zone| match coverage.iter().find(|c| c.zone == zone.as_str()) {
            Some(c) => ZoneSummary {
                zone,
                observations: c.observations,
                first_observed: c.first_observed,
                last_observed: c.last_observed,
            },
            None => ZoneSummary {
                zone,
                observations: 0,
                first_observed: None,
                last_observed: None,
            },
        })
        .collect()
}

fn crop_listing(table: &CropTable, month: u32) -> Result<CropsResponse, EngineError> {
    let season = season_for_month(month)?;
    let crops = table
        .iter()
        .map(|crop| {
            Ok(CropListing {
                planting_status: planting_status(crop, month)?,
                profile: crop.clone(),
            })
        })
        .collect::<Result<Vec<_>, EngineError>>()?;
    Ok(CropsResponse {
        month,
        season,
        crops,
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// List the configured zones with their observation coverage.
#[utoipa::path(
    get,
    path = "/api/v1/zones",
    tag = "Zones",
    responses(
        (status = 200, description = "Configured zones", body = Vec<ZoneSummary>),
    )
)]
pub async fn list_zones(State(state): State<AppState>) -> Result<Json<Vec<ZoneSummary>>, AppError> {
    let coverage = queries::get_zone_coverage(&state.pool).await?;
    Ok(Json(zone_summaries(&coverage)))
}

/// Crop table with the planting status for a month.
#[utoipa::path(
    get,
    path = "/api/v1/crops",
    tag = "Crops",
    params(CropsQuery),
    responses(
        (status = 200, description = "Crop profiles", body = CropsResponse),
        (status = 400, description = "Month outside 1-12", body = ErrorResponse),
    )
)]
pub async fn list_crops(
    State(state): State<AppState>,
    Query(params): Query<CropsQuery>,
) -> Result<Json<CropsResponse>, AppError> {
    let month = params.month.unwrap_or_else(|| Utc::now().month());
    Ok(Json(crop_listing(&state.engine.crops, month)?))
}

/// Zone statistics as of a date, plus per-year rainfall and temperature.
#[utoipa::path(
    get,
    path = "/api/v1/zones/{zone}/statistics",
    tag = "Zones",
    params(
        ("zone" = String, Path, description = "Zone name (Aba, Umuahia, Bende)"),
        AsOfQuery,
    ),
    responses(
        (status = 200, description = "Zone statistics", body = StatisticsResponse),
        (status = 400, description = "Invalid date", body = ErrorResponse),
        (status = 404, description = "Zone not found", body = ErrorResponse),
        (status = 422, description = "No observations", body = ErrorResponse),
    )
)]
pub async fn get_statistics(
    State(state): State<AppState>,
    Path(zone): Path<String>,
    Query(params): Query<AsOfQuery>,
) -> Result<Json<StatisticsResponse>, AppError> {
    let zone = parse_zone(&zone)?;
    let requested: Option<NaiveDate> = parse_date("as_of", params.as_of.as_deref())?;
    let series = load_zone_series(&state.pool, zone).await?;
    let as_of = resolve_as_of(&series, requested)?;

    Ok(Json(StatisticsResponse {
        statistics: zone_statistics(&series, as_of)?,
        annual: annual_metrics(&series),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_zone_summaries_fill_missing_zones() {
        let coverage = vec![models::ZoneCoverage {
            zone: "Umuahia".to_string(),
            observations: 48,
            first_observed: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            last_observed: Some(Utc.with_ymd_and_hms(2024, 1, 2, 23, 0, 0).unwrap()),
        }];

        let summaries = zone_summaries(&coverage);

        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[0].zone, Zone::Aba);
        assert_eq!(summaries[0].observations, 0);
        assert!(summaries[0].last_observed.is_none());
        assert_eq!(summaries[1].zone, Zone::Umuahia);
        assert_eq!(summaries[1].observations, 48);
    }

    #[test]
    fn test_crop_listing_statuses() {
        let listing = crop_listing(&CropTable::default(), 4).unwrap();
        assert_eq!(listing.season, Season::Wet);
        assert_eq!(listing.crops.len(), 5);

        let maize = listing
            .crops
            .iter()
            .find(|c| c.profile.key == "maize")
            .unwrap();
        assert_eq!(maize.planting_status, PlantingStatus::Optimal);
    }

    #[test]
    fn test_crop_listing_rejects_bad_month() {
        assert!(matches!(
            crop_listing(&CropTable::default(), 13),
            Err(EngineError::OutOfRangeInput(_))
        ));
    }

    #[test]
    fn test_crops_response_serializes() {
        let response = CropsResponse {
            month: 1,
            season: Season::Dry,
            crops: vec![],
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["season"], "Dry");
        assert_eq!(json["crops"].as_array().unwrap().len(), 0);
    }
}
