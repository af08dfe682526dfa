//! Crop suitability scoring
//!
//! Compares a zone's long-run climate with each crop's optimal rainfall and
//! temperature ranges. A value inside the range is a full fit; a value just
//! outside, within a tolerance band proportional to the range width, is a
//! partial fit.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::climate::ZoneClimate;
use super::crops::{CropProfile, CropTable, ValueRange};
use super::series::Zone;
use crate::errors::EngineError;

/// Tolerance band as a fraction of the optimal range width.
pub const DEFAULT_TOLERANCE: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SuitabilitySettings {
    pub tolerance: f64,
}

impl Default for SuitabilitySettings {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// How well one climate value sits in a crop's optimal range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum ComponentFit {
    /// Inside the optimal range (bounds inclusive)
    Full,
    /// Outside the range but within the tolerance band
    Partial,
    /// Beyond the tolerance band
    Zero,
}

impl ComponentFit {
    pub fn score(&self) -> f64 {
        match self {
            ComponentFit::Full => 1.0,
            ComponentFit::Partial => 0.5,
            ComponentFit::Zero => 0.0,
        }
    }
}

/// One climate value compared with one optimal range
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ComponentComparison {
    pub fit: ComponentFit,
    pub value: f64,
    pub optimal: ValueRange,
    /// Distance from the nearest bound, 0 when inside
    pub distance_from_range: f64,
    /// Distance as a fraction of the range width
    pub distance_fraction: f64,
}

pub fn compare_component(value: f64, optimal: ValueRange, tolerance: f64) -> ComponentComparison {
    let width = optimal.width();
    let distance = optimal.distance(value);
    let fit = if distance == 0.0 {
        ComponentFit::Full
    } else if distance <= tolerance * width {
        ComponentFit::Partial
    } else {
        ComponentFit::Zero
    };

    ComponentComparison {
        fit,
        value,
        optimal,
        distance_from_range: distance,
        // Zero-width ranges only ever fit exactly
        distance_fraction: if width > 0.0 { distance / width } else { distance },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, ToSchema)]
pub enum SuitabilityCategory {
    HighlySuitable,
    ModeratelySuitable,
    NotSuitable,
}

impl SuitabilityCategory {
    pub fn display_name(&self) -> &'static str {
        match self {
            SuitabilityCategory::HighlySuitable => "Highly suitable",
            SuitabilityCategory::ModeratelySuitable => "Moderately suitable",
            SuitabilityCategory::NotSuitable => "Not suitable",
        }
    }

    fn from_fits(rainfall: ComponentFit, temp: ComponentFit) -> Self {
        match (rainfall, temp) {
            (ComponentFit::Full, ComponentFit::Full) => SuitabilityCategory::HighlySuitable,
            (ComponentFit::Zero, _) | (_, ComponentFit::Zero) => SuitabilityCategory::NotSuitable,
            _ => SuitabilityCategory::ModeratelySuitable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SuitabilityVerdict {
    pub zone: Zone,
    pub crop: String,
    pub crop_key: String,
    pub category: SuitabilityCategory,
    pub rainfall_score: f64,
    pub temp_score: f64,
    /// Mean of the two component scores
    pub combined_score: f64,
    pub rainfall: ComponentComparison,
    pub temperature: ComponentComparison,
    /// Mean daily minimum reaches the crop's base temperature
    pub base_temperature_met: bool,
}

/// Score one crop against a zone's climate.
pub fn suitability(
    climate: &ZoneClimate,
    crop: &CropProfile,
    settings: &SuitabilitySettings,
) -> Result<SuitabilityVerdict, EngineError> {
    crop.validate()?;
    if !settings.tolerance.is_finite() || settings.tolerance < 0.0 {
        return Err(EngineError::OutOfRangeInput(format!(
            "suitability tolerance {} must be a non-negative fraction",
            settings.tolerance
        )));
    }

    let rainfall = compare_component(
        climate.avg_annual_rainfall,
        crop.rainfall_optimal_range,
        settings.tolerance,
    );
    let temperature = compare_component(
        climate.avg_temp,
        crop.temp_optimal_range,
        settings.tolerance,
    );
    let rainfall_score = rainfall.fit.score();
    let temp_score = temperature.fit.score();

    Ok(SuitabilityVerdict {
        zone: climate.zone,
        crop: crop.name.clone(),
        crop_key: crop.key.clone(),
        category: SuitabilityCategory::from_fits(rainfall.fit, temperature.fit),
        rainfall_score,
        temp_score,
        combined_score: (rainfall_score + temp_score) / 2.0,
        rainfall,
        temperature,
        base_temperature_met: climate.avg_temp_min >= crop.t_base,
    })
}

/// Score every configured crop, best category first, then by combined score.
pub fn rank_crops(
    climate: &ZoneClimate,
    crops: &CropTable,
    settings: &SuitabilitySettings,
) -> Result<Vec<SuitabilityVerdict>, EngineError> {
    let mut verdicts = crops
        .iter()
        .map(|crop| suitability(climate, crop, settings))
        .collect::<Result<Vec<_>, _>>()?;

    verdicts.sort_by(|a, b| {
        a.category
            .cmp(&b.category)
            .then(b.combined_score.total_cmp(&a.combined_score))
            .then_with(|| a.crop.cmp(&b.crop))
    });
    Ok(verdicts)
}
