//! Crop profiles and the lookup table the engine is configured with.
//!
//! Every crop is a plain data record. Engine code never branches on a crop
//! name; it reads the profile's base temperature, heat-unit target and
//! tolerance ranges.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::EngineError;

/// Inclusive `[min, max]` interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub fn new(min: f64, max: f64) -> Result<Self, EngineError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(EngineError::OutOfRangeInput(
                "range bounds must be finite".to_string(),
            ));
        }
        if min > max {
            return Err(EngineError::OutOfRangeInput(format!(
                "inverted range [{}, {}]",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, v: f64) -> bool {
        v >= self.min && v <= self.max
    }

    /// Distance from `v` to the nearest bound, 0 when inside.
    pub fn distance(&self, v: f64) -> f64 {
        if v < self.min {
            self.min - v
        } else if v > self.max {
            v - self.max
        } else {
            0.0
        }
    }
}

/// Tolerances and calendar for one crop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CropProfile {
    /// URL-safe lookup key, e.g. `maize`
    pub key: String,
    /// Display name, e.g. `Maize (Corn)`
    pub name: String,
    /// Base temperature below which no heat units accrue, °C
    pub t_base: f64,
    /// Heat units needed to reach maturity
    pub gdd_target: f64,
    /// Annual rainfall tolerance, mm
    pub rainfall_optimal_range: ValueRange,
    /// Mean temperature tolerance, °C
    pub temp_optimal_range: ValueRange,
    /// Typical days from planting to harvest
    pub growing_season_days: u32,
    /// Months (1–12) in which planting is acceptable
    #[serde(default)]
    pub planting_months: Vec<u32>,
    /// Subset of planting months considered ideal
    #[serde(default)]
    pub optimal_planting_months: Vec<u32>,
}

impl CropProfile {
    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |msg: String| Err(EngineError::InvalidCropProfile(msg));

        if self.key.trim().is_empty() {
            return invalid("crop key must not be empty".to_string());
        }
        if !self.t_base.is_finite() {
            return invalid(format!("{}: t_base must be finite", self.key));
        }
        if !self.gdd_target.is_finite() || self.gdd_target <= 0.0 {
            return invalid(format!(
                "{}: gdd_target must be positive, got {}",
                self.key, self.gdd_target
            ));
        }
        for (label, range) in [
            ("rainfall_optimal_range", &self.rainfall_optimal_range),
            ("temp_optimal_range", &self.temp_optimal_range),
        ] {
            if ValueRange::new(range.min, range.max).is_err() {
                return invalid(format!(
                    "{}: {} [{}, {}] is not a valid range",
                    self.key, label, range.min, range.max
                ));
            }
        }
        if self.rainfall_optimal_range.min < 0.0 {
            return invalid(format!("{}: negative rainfall bound", self.key));
        }
        if let Some(m) = self
            .planting_months
            .iter()
            .chain(self.optimal_planting_months.iter())
            .find(|m| !(1..=12).contains(*m))
        {
            return invalid(format!("{}: month {} outside 1-12", self.key, m));
        }
        if let Some(m) = self
            .optimal_planting_months
            .iter()
            .find(|m| !self.planting_months.contains(m))
        {
            return invalid(format!(
                "{}: optimal month {} is not a planting month",
                self.key, m
            ));
        }
        Ok(())
    }
}

/// Immutable crop lookup table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CropTable {
    crops: Vec<CropProfile>,
}

impl CropTable {
    /// Build a table, validating every profile and rejecting duplicate keys.
    pub fn new(crops: Vec<CropProfile>) -> Result<Self, EngineError> {
        if crops.is_empty() {
            return Err(EngineError::InvalidCropProfile(
                "crop table is empty".to_string(),
            ));
        }
        for (i, crop) in crops.iter().enumerate() {
            crop.validate()?;
            if crops[..i]
                .iter()
                .any(|c| c.key.eq_ignore_ascii_case(&crop.key))
            {
                return Err(EngineError::InvalidCropProfile(format!(
                    "duplicate crop key '{}'",
                    crop.key
                )));
            }
        }
        Ok(Self { crops })
    }

    /// Parse a JSON array of profiles.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let crops: Vec<CropProfile> = serde_json::from_str(json)
            .map_err(|e| EngineError::InvalidCropProfile(format!("crop table JSON: {}", e)))?;
        Self::new(crops)
    }

    /// Case-insensitive lookup by key or display name.
    pub fn lookup(&self, name: &str) -> Result<&CropProfile, EngineError> {
        let wanted = name.trim();
        self.crops
            .iter()
            .find(|c| c.key.eq_ignore_ascii_case(wanted) || c.name.eq_ignore_ascii_case(wanted))
            .ok_or_else(|| EngineError::InvalidCropProfile(format!("unknown crop '{}'", name)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &CropProfile> {
        self.crops.iter()
    }

    pub fn len(&self) -> usize {
        self.crops.len()
    }
}

#[allow(clippy::too_many_arguments)]
fn profile(
    key: &str,
    name: &str,
    t_base: f64,
    gdd_target: f64,
    rainfall: (f64, f64),
    temp: (f64, f64),
    growing_season_days: u32,
    planting_months: &[u32],
    optimal_planting_months: &[u32],
) -> CropProfile {
    CropProfile {
        key: key.to_string(),
        name: name.to_string(),
        t_base,
        gdd_target,
        rainfall_optimal_range: ValueRange {
            min: rainfall.0,
            max: rainfall.1,
        },
        temp_optimal_range: ValueRange {
            min: temp.0,
            max: temp.1,
        },
        growing_season_days,
        planting_months: planting_months.to_vec(),
        optimal_planting_months: optimal_planting_months.to_vec(),
    }
}

impl Default for CropTable {
    /// Built-in profiles for the staple crops of the covered zones.
    fn default() -> Self {
        Self {
            crops: vec![
                profile(
                    "maize",
                    "Maize (Corn)",
                    10.0,
                    1200.0,
                    (600.0, 900.0),
                    (20.0, 30.0),
                    90,
                    &[3, 4, 5, 6, 7],
                    &[3, 4],
                ),
                profile(
                    "cassava",
                    "Cassava",
                    18.0,
                    3000.0,
                    (1000.0, 1500.0),
                    (25.0, 29.0),
                    240,
                    &[3, 4, 5, 6, 7, 8],
                    &[4, 5],
                ),
                profile(
                    "yam",
                    "Yam",
                    20.0,
                    2500.0,
                    (1500.0, 2500.0),
                    (25.0, 30.0),
                    210,
                    &[12, 1, 2, 3, 4, 5, 6, 7],
                    &[3, 4, 5],
                ),
                profile(
                    "rice",
                    "Rice",
                    12.0,
                    1800.0,
                    (1200.0, 2000.0),
                    (22.0, 32.0),
                    120,
                    &[4, 5, 6, 7, 8],
                    &[4, 5, 6],
                ),
                profile(
                    "cowpea",
                    "Cowpea",
                    8.0,
                    900.0,
                    (500.0, 1200.0),
                    (21.0, 30.0),
                    75,
                    &[11, 12, 1, 2, 3, 7, 8],
                    &[12, 1, 2],
                ),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_is_valid() {
        let table = CropTable::default();
        assert_eq!(table.len(), 5);
        assert!(CropTable::new(table.iter().cloned().collect()).is_ok());
    }

    #[test]
    fn test_lookup_by_key_and_name() {
        let table = CropTable::default();
        assert_eq!(table.lookup("MAIZE").unwrap().t_base, 10.0);
        assert_eq!(table.lookup("Maize (Corn)").unwrap().key, "maize");
        assert_eq!(table.lookup("cassava").unwrap().gdd_target, 3000.0);
    }

    #[test]
    fn test_unknown_crop_is_invalid_profile() {
        let table = CropTable::default();
        assert!(matches!(
            table.lookup("millet"),
            Err(EngineError::InvalidCropProfile(_))
        ));
    }

    #[test]
    fn test_zero_target_rejected() {
        let mut crop = CropTable::default().lookup("rice").unwrap().clone();
        crop.gdd_target = 0.0;
        assert!(matches!(
            crop.validate(),
            Err(EngineError::InvalidCropProfile(_))
        ));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let mut crop = CropTable::default().lookup("yam").unwrap().clone();
        crop.temp_optimal_range = ValueRange { min: 30.0, max: 25.0 };
        assert!(crop.validate().is_err());
        assert!(matches!(
            ValueRange::new(30.0, 25.0),
            Err(EngineError::OutOfRangeInput(_))
        ));
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let maize = CropTable::default().lookup("maize").unwrap().clone();
        assert!(CropTable::new(vec![maize.clone(), maize]).is_err());
    }

    #[test]
    fn test_from_json_override() {
        let json = r#"[{
            "key": "sorghum",
            "name": "Sorghum",
            "t_base": 10.0,
            "gdd_target": 1500.0,
            "rainfall_optimal_range": {"min": 450.0, "max": 650.0},
            "temp_optimal_range": {"min": 25.0, "max": 32.0},
            "growing_season_days": 110,
            "planting_months": [5, 6],
            "optimal_planting_months": [6]
        }]"#;
        let table = CropTable::from_json(json).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup("Sorghum").unwrap().growing_season_days, 110);
        assert!(CropTable::from_json("not json").is_err());
    }

    #[test]
    fn test_value_range_distance() {
        let r = ValueRange::new(20.0, 30.0).unwrap();
        assert_eq!(r.distance(25.0), 0.0);
        assert_eq!(r.distance(31.0), 1.0);
        assert_eq!(r.distance(18.0), 2.0);
        assert!(r.contains(30.0));
        assert_eq!(r.width(), 10.0);
    }
}
