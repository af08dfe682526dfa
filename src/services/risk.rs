//! Rainfall risk classification and daily condition advisories.
//!
//! The alert classifier works on a trailing rainfall sum (7 days by default)
//! with fixed thresholds. The advisory band is a softer, display-only reading
//! of the same sum and never changes what raises an alert.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

use super::series::{DailyField, DailyRecord, DailySeries, Zone};
use super::window::rolling_sums;
use crate::errors::EngineError;

/// Rolling sum below this is a drought alert (mm).
pub const DROUGHT_THRESHOLD_MM: f64 = 5.0;

/// Rolling sum above this is a waterlogging alert (mm).
pub const WATERLOGGING_THRESHOLD_MM: f64 = 150.0;

/// Rolling sum below this is shown as "drought watch" (mm).
pub const ADVISORY_DRY_MM: f64 = 20.0;

/// Default trailing window for risk classification (days).
pub const RISK_WINDOW_DAYS: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum RiskLevel {
    Drought,
    Normal,
    Waterlogging,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Drought => "drought",
            RiskLevel::Normal => "normal",
            RiskLevel::Waterlogging => "waterlogging",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Alert thresholds and window for risk classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub window_days: u32,
    pub drought_below_mm: f64,
    pub waterlogging_above_mm: f64,
    pub advisory_dry_below_mm: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            window_days: RISK_WINDOW_DAYS,
            drought_below_mm: DROUGHT_THRESHOLD_MM,
            waterlogging_above_mm: WATERLOGGING_THRESHOLD_MM,
            advisory_dry_below_mm: ADVISORY_DRY_MM,
        }
    }
}

impl RiskThresholds {
    /// Strict on the risk side: exactly 5.0 and exactly 150.0 are Normal.
    pub fn classify(&self, rolling_mm: f64) -> RiskLevel {
        if rolling_mm < self.drought_below_mm {
            RiskLevel::Drought
        } else if rolling_mm > self.waterlogging_above_mm {
            RiskLevel::Waterlogging
        } else {
            RiskLevel::Normal
        }
    }

    pub fn advisory_band(&self, rolling_mm: f64) -> AdvisoryBand {
        if rolling_mm < self.advisory_dry_below_mm {
            AdvisoryBand::DroughtWatch
        } else if rolling_mm > self.waterlogging_above_mm {
            AdvisoryBand::FloodWatch
        } else {
            AdvisoryBand::Favourable
        }
    }
}

/// Classify a rolling rainfall sum with the default thresholds.
pub fn classify_risk(rolling_mm: f64) -> RiskLevel {
    RiskThresholds::default().classify(rolling_mm)
}

/// Display band for a rolling rainfall sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum AdvisoryBand {
    DroughtWatch,
    Favourable,
    FloodWatch,
}

pub fn advisory_band(rolling_mm: f64) -> AdvisoryBand {
    RiskThresholds::default().advisory_band(rolling_mm)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum AlertKind {
    Drought,
    Waterlogging,
}

/// A day whose rolling rainfall crossed an alert threshold.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RiskAlert {
    pub kind: AlertKind,
    pub zone: Zone,
    pub as_of_date: NaiveDate,
    /// Rolling rainfall sum that triggered the alert, mm
    pub window_value: f64,
}

/// Rolling sum and classification for one day.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DailyRisk {
    pub date: NaiveDate,
    pub rolling_mm: f64,
    pub level: RiskLevel,
    pub advisory: AdvisoryBand,
}

/// Classify every calendar day in `[from, to]`.
pub fn daily_risk(
    series: &DailySeries,
    thresholds: &RiskThresholds,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<DailyRisk>, EngineError> {
    let points = rolling_sums(
        series,
        DailyField::Precipitation,
        thresholds.window_days,
        from,
        to,
    )?;
    Ok(points
        .into_iter()
        .map(|p| DailyRisk {
            date: p.date,
            rolling_mm: p.value,
            level: thresholds.classify(p.value),
            advisory: thresholds.advisory_band(p.value),
        })
        .collect())
}

/// One alert per qualifying day in `[from, to]`. No deduplication.
pub fn risk_alerts(
    series: &DailySeries,
    thresholds: &RiskThresholds,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<RiskAlert>, EngineError> {
    let zone = series.zone();
    Ok(daily_risk(series, thresholds, from, to)?
        .into_iter()
        .filter_map(|d| {
            let kind = match d.level {
                RiskLevel::Drought => AlertKind::Drought,
                RiskLevel::Waterlogging => AlertKind::Waterlogging,
                RiskLevel::Normal => return None,
            };
            Some(RiskAlert {
                kind,
                zone,
                as_of_date: d.date,
                window_value: d.rolling_mm,
            })
        })
        .collect())
}

/// Number of drought days in one calendar year.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DroughtFrequency {
    pub year: i32,
    pub drought_days: u32,
    /// Calendar days of the year covered by the record
    pub days_evaluated: u32,
}

/// Days per year whose rolling sum classifies as Drought, over the observed span.
pub fn drought_days_per_year(
    series: &DailySeries,
    thresholds: &RiskThresholds,
) -> Result<Vec<DroughtFrequency>, EngineError> {
    let (Some(first), Some(last)) = (series.first_date(), series.last_date()) else {
        return Ok(Vec::new());
    };

    let mut per_year: BTreeMap<i32, (u32, u32)> = BTreeMap::new();
    for day in daily_risk(series, thresholds, first, last)? {
        let entry = per_year.entry(day.date.year()).or_insert((0, 0));
        entry.1 += 1;
        if day.level == RiskLevel::Drought {
            entry.0 += 1;
        }
    }

    Ok(per_year
        .into_iter()
        .map(|(year, (drought_days, days_evaluated))| DroughtFrequency {
            year,
            drought_days,
            days_evaluated,
        })
        .collect())
}

/// Daily extremes that are worth flagging to a grower.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConditionLimits {
    pub heat_stress_above_c: f64,
    pub cold_stress_below_c: f64,
    pub low_humidity_below_pct: f64,
    pub high_humidity_above_pct: f64,
}

impl Default for ConditionLimits {
    fn default() -> Self {
        Self {
            heat_stress_above_c: 38.0,
            cold_stress_below_c: 10.0,
            low_humidity_below_pct: 30.0,
            high_humidity_above_pct: 95.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum ConditionAdvisory {
    HeatStress,
    ColdStress,
    LowHumidity,
    HighHumidity,
}

pub fn condition_advisories(
    record: &DailyRecord,
    limits: &ConditionLimits,
) -> Vec<ConditionAdvisory> {
    let mut flags = Vec::new();
    if record.temp_max > limits.heat_stress_above_c {
        flags.push(ConditionAdvisory::HeatStress);
    }
    if record.temp_min < limits.cold_stress_below_c {
        flags.push(ConditionAdvisory::ColdStress);
    }
    if record.humidity_avg < limits.low_humidity_below_pct {
        flags.push(ConditionAdvisory::LowHumidity);
    }
    if record.humidity_avg > limits.high_humidity_above_pct {
        flags.push(ConditionAdvisory::HighHumidity);
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{date, day, rain_series};

    #[test]
    fn test_classify_risk_boundaries() {
        assert_eq!(classify_risk(4.9), RiskLevel::Drought);
        assert_eq!(classify_risk(5.0), RiskLevel::Normal);
        assert_eq!(classify_risk(150.0), RiskLevel::Normal);
        assert_eq!(classify_risk(150.1), RiskLevel::Waterlogging);
        assert_eq!(classify_risk(0.0), RiskLevel::Drought);
    }

    #[test]
    fn test_advisory_band_is_separate_from_alert() {
        // 12 mm is a drought watch on the gauge but not a drought alert
        assert_eq!(advisory_band(12.0), AdvisoryBand::DroughtWatch);
        assert_eq!(classify_risk(12.0), RiskLevel::Normal);
        assert_eq!(advisory_band(20.0), AdvisoryBand::Favourable);
        assert_eq!(advisory_band(151.0), AdvisoryBand::FloodWatch);
    }

    #[test]
    fn test_risk_alerts_one_per_day() {
        // Seven dry days then a downpour
        let mut rain = vec![0.0; 10];
        rain.extend([200.0, 0.0]);
        let series = rain_series(Zone::Aba, date(2024, 6, 1), &rain);
        let alerts = risk_alerts(
            &series,
            &RiskThresholds::default(),
            date(2024, 6, 7),
            date(2024, 6, 12),
        )
        .unwrap();

        let drought: Vec<_> = alerts.iter().filter(|a| a.kind == AlertKind::Drought).collect();
        let wet: Vec<_> = alerts.iter().filter(|a| a.kind == AlertKind::Waterlogging).collect();
        assert_eq!(drought.len(), 4);
        assert_eq!(wet.len(), 2);
        assert_eq!(wet[0].as_of_date, date(2024, 6, 11));
        assert_eq!(wet[0].window_value, 200.0);
        assert_eq!(wet[0].zone, Zone::Aba);
    }

    #[test]
    fn test_exact_threshold_sum_raises_no_alert() {
        let series = rain_series(Zone::Umuahia, date(2024, 6, 1), &[5.0 / 7.0; 7]);
        let alerts = risk_alerts(
            &series,
            &RiskThresholds::default(),
            date(2024, 6, 7),
            date(2024, 6, 7),
        )
        .unwrap();
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_drought_days_per_year() {
        let series = rain_series(Zone::Bende, date(2023, 12, 29), &[10.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let freq = drought_days_per_year(&series, &RiskThresholds::default()).unwrap();
        assert_eq!(freq.len(), 2);
        assert_eq!(freq[0].year, 2023);
        assert_eq!(freq[0].drought_days, 0);
        assert_eq!(freq[0].days_evaluated, 3);
        assert_eq!(freq[1].year, 2024);
        assert_eq!(freq[1].drought_days, 0);
        assert_eq!(freq[1].days_evaluated, 3);
    }

    #[test]
    fn test_drought_days_counted_after_rain_leaves_window() {
        let mut rain = vec![10.0];
        rain.extend(vec![0.0; 9]);
        let series = rain_series(Zone::Bende, date(2024, 1, 1), &rain);
        let freq = drought_days_per_year(&series, &RiskThresholds::default()).unwrap();
        // Jan 8..=10 no longer see the 10 mm on Jan 1
        assert_eq!(freq[0].drought_days, 3);
    }

    #[test]
    fn test_drought_frequency_empty_series() {
        let series = rain_series(Zone::Aba, date(2024, 1, 1), &[]);
        assert!(drought_days_per_year(&series, &RiskThresholds::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_condition_advisories() {
        let limits = ConditionLimits::default();
        let mut hot = day(Zone::Aba, date(2024, 2, 1), 39.0, 24.0, 0.0);
        hot.humidity_avg = 25.0;
        assert_eq!(
            condition_advisories(&hot, &limits),
            vec![ConditionAdvisory::HeatStress, ConditionAdvisory::LowHumidity]
        );

        let mut damp = day(Zone::Aba, date(2024, 8, 1), 26.0, 9.0, 30.0);
        damp.humidity_avg = 97.0;
        assert_eq!(
            condition_advisories(&damp, &limits),
            vec![ConditionAdvisory::ColdStress, ConditionAdvisory::HighHumidity]
        );

        let mild = day(Zone::Aba, date(2024, 8, 1), 30.0, 22.0, 3.0);
        assert!(condition_advisories(&mild, &limits).is_empty());
    }
}
