use std::path::PathBuf;

use crate::errors::EngineError;
use crate::services::baseline::DeviationThresholds;
use crate::services::crops::CropTable;
use crate::services::gdd::GddSettings;
use crate::services::onset::OnsetRule;
use crate::services::risk::{ConditionLimits, RiskThresholds};
use crate::services::suitability::SuitabilitySettings;

/// Smallest and largest trailing window for the average daily GDD rate.
pub const GDD_TRAILING_DAYS_RANGE: (u32, u32) = (14, 30);

/// Default centred smoothing window for the seasonality baseline (days).
pub const DEFAULT_BASELINE_SMOOTHING_DAYS: u32 = 7;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has invalid value '{value}'")]
    Invalid { name: &'static str, value: String },

    #[error("Failed to read crop profiles from {path}: {source}")]
    CropFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid engine configuration: {0}")]
    Engine(#[from] EngineError),
}

/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    /// Optional JSON file replacing the built-in crop table.
    pub crop_profiles_path: Option<PathBuf>,
    /// Recent observed days averaged for the daily GDD rate.
    pub gdd_trailing_days: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = var("PORT").unwrap_or_else(|| "8080".to_string());
        let trailing = var("GDD_TRAILING_DAYS")
            .unwrap_or_else(|| crate::services::gdd::DEFAULT_TRAILING_DAYS.to_string());

        Ok(Self {
            database_url: var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            port: port.parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: port.clone(),
            })?,
            crop_profiles_path: var("CROP_PROFILES_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            gdd_trailing_days: trailing.parse().map_err(|_| ConfigError::Invalid {
                name: "GDD_TRAILING_DAYS",
                value: trailing.clone(),
            })?,
        })
    }
}

/// Thresholds, settings and crop table shared by every engine call.
///
/// Built once at startup and handed to the HTTP layer behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub risk: RiskThresholds,
    pub conditions: ConditionLimits,
    pub gdd: GddSettings,
    pub onset: OnsetRule,
    pub deviation: DeviationThresholds,
    pub suitability: SuitabilitySettings,
    pub baseline_smoothing_days: u32,
    pub crops: CropTable,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            risk: RiskThresholds::default(),
            conditions: ConditionLimits::default(),
            gdd: GddSettings::default(),
            onset: OnsetRule::default(),
            deviation: DeviationThresholds::default(),
            suitability: SuitabilitySettings::default(),
            baseline_smoothing_days: DEFAULT_BASELINE_SMOOTHING_DAYS,
            crops: CropTable::default(),
        }
    }
}

impl EngineConfig {
    /// Build from the application config: crop table override and GDD window.
    pub fn load(app: &AppConfig) -> Result<Self, ConfigError> {
        let crops = match &app.crop_profiles_path {
            Some(path) => {
                let json = std::fs::read_to_string(path).map_err(|source| ConfigError::CropFile {
                    path: path.clone(),
                    source,
                })?;
                let table = CropTable::from_json(&json)?;
                tracing::info!("Loaded {} crop profiles from {}", table.len(), path.display());
                table
            }
            None => CropTable::default(),
        };

        let config = Self {
            gdd: GddSettings {
                trailing_days: app.gdd_trailing_days,
            },
            crops,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let out_of_range = |msg: String| Err(EngineError::OutOfRangeInput(msg));

        let (lo, hi) = GDD_TRAILING_DAYS_RANGE;
        if !(lo..=hi).contains(&self.gdd.trailing_days) {
            return out_of_range(format!(
                "GDD trailing window {} outside {}-{} days",
                self.gdd.trailing_days, lo, hi
            ));
        }

        let r = &self.risk;
        if r.window_days == 0 {
            return out_of_range("risk window must be at least one day".to_string());
        }
        if !(0.0 <= r.drought_below_mm && r.drought_below_mm < r.waterlogging_above_mm) {
            return out_of_range(format!(
                "drought threshold {} must be below waterlogging threshold {}",
                r.drought_below_mm, r.waterlogging_above_mm
            ));
        }
        if r.advisory_dry_below_mm < r.drought_below_mm {
            return out_of_range(format!(
                "advisory band {} must not be below the drought threshold {}",
                r.advisory_dry_below_mm, r.drought_below_mm
            ));
        }

        let o = &self.onset;
        if o.window_days == 0 || o.threshold_mm.is_nan() || o.threshold_mm <= 0.0 {
            return out_of_range(format!(
                "onset rule needs a window and a positive threshold, got {} days / {} mm",
                o.window_days, o.threshold_mm
            ));
        }
        if o.trend_dead_zone < 0.0 {
            return out_of_range("onset trend dead zone must be non-negative".to_string());
        }
        if chrono::NaiveDate::from_ymd_opt(2001, o.start_month, o.start_day).is_none() {
            return out_of_range(format!(
                "onset scan start {}-{} is not a calendar date",
                o.start_month, o.start_day
            ));
        }

        if self.deviation.rainfall_pct < 0.0 || self.deviation.temp_delta_c < 0.0 {
            return out_of_range("deviation thresholds must be non-negative".to_string());
        }
        if !self.suitability.tolerance.is_finite() || self.suitability.tolerance < 0.0 {
            return out_of_range(format!(
                "suitability tolerance {} must be non-negative",
                self.suitability.tolerance
            ));
        }
        if self.baseline_smoothing_days == 0 {
            return out_of_range("baseline smoothing window must be at least one day".to_string());
        }
        Ok(())
    }
}
