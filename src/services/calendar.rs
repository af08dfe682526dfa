//! Seasonal planting calendar.

use serde::Serialize;
use utoipa::ToSchema;

use super::crops::CropProfile;
use crate::errors::EngineError;

/// First and last month of the wet season (inclusive).
pub const WET_SEASON_MONTHS: (u32, u32) = (4, 10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum Season {
    Wet,
    Dry,
}

pub fn season_for_month(month: u32) -> Result<Season, EngineError> {
    check_month(month)?;
    if (WET_SEASON_MONTHS.0..=WET_SEASON_MONTHS.1).contains(&month) {
        Ok(Season::Wet)
    } else {
        Ok(Season::Dry)
    }
}

/// Whether `month` is a good time to plant a crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PlantingStatus {
    Optimal,
    Acceptable,
    OutOfSeason { next_planting_month: Option<u32> },
}

pub fn planting_status(crop: &CropProfile, month: u32) -> Result<PlantingStatus, EngineError> {
    check_month(month)?;
    if crop.optimal_planting_months.contains(&month) {
        return Ok(PlantingStatus::Optimal);
    }
    if crop.planting_months.contains(&month) {
        return Ok(PlantingStatus::Acceptable);
    }
    // Walk forward through the year, wrapping December into January
    let next_planting_month = (1..=12)
        .map(|offset| (month - 1 + offset) % 12 + 1)
        .find(|m| crop.planting_months.contains(m));
    Ok(PlantingStatus::OutOfSeason {
        next_planting_month,
    })
}

fn check_month(month: u32) -> Result<(), EngineError> {
    if (1..=12).contains(&month) {
        Ok(())
    } else {
        Err(EngineError::OutOfRangeInput(format!(
            "month {} outside 1-12",
            month
        )))
    }
}
