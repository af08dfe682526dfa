//! Rainy-season onset detection.
//!
//! Onset is the first day `d` on or after the scan start (1 March) whose
//! rainfall over `[d, d + window - 1]` reaches the threshold. The scan is a
//! forward pass over calendar days with the window held in a `SlidingSum`;
//! missing days contribute zero.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::series::{DailySeries, Zone};
use super::window::SlidingSum;
use crate::errors::EngineError;
use crate::helpers::{days_between, window_start};

/// Slopes within ±this many days/year count as no trend.
pub const TREND_DEAD_ZONE_DAYS_PER_YEAR: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OnsetRule {
    pub start_month: u32,
    pub start_day: u32,
    pub window_days: u32,
    /// Minimum rainfall over the window, mm (inclusive)
    pub threshold_mm: f64,
    pub trend_dead_zone: f64,
}

impl Default for OnsetRule {
    fn default() -> Self {
        Self {
            start_month: 3,
            start_day: 1,
            window_days: 3,
            threshold_mm: 20.0,
            trend_dead_zone: TREND_DEAD_ZONE_DAYS_PER_YEAR,
        }
    }
}

impl OnsetRule {
    fn scan_start(&self, year: i32) -> Result<NaiveDate, EngineError> {
        NaiveDate::from_ymd_opt(year, self.start_month, self.start_day).ok_or_else(|| {
            EngineError::OutOfRangeInput(format!(
                "invalid onset scan start {}-{}",
                self.start_month, self.start_day
            ))
        })
    }
}

/// Detected onset for one year. Both fields are null when no window qualified.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct OnsetEstimate {
    pub year: i32,
    pub zone: Zone,
    pub onset_day_of_year: Option<u32>,
    pub onset_date: Option<NaiveDate>,
}

/// Onset date for `year` using every record of that year.
pub fn detect_onset(
    series: &DailySeries,
    year: i32,
    rule: &OnsetRule,
) -> Result<Option<NaiveDate>, EngineError> {
    detect_onset_until(series, year, rule, None)
}

/// Onset date for `year` using only records dated on or before `as_of`.
pub fn detect_onset_until(
    series: &DailySeries,
    year: i32,
    rule: &OnsetRule,
    as_of: Option<NaiveDate>,
) -> Result<Option<NaiveDate>, EngineError> {
    if rule.window_days == 0 {
        return Err(EngineError::OutOfRangeInput(
            "onset window must be at least one day".to_string(),
        ));
    }
    let start = rule.scan_start(year)?;

    let mut records = series.year(year);
    if let Some(limit) = as_of {
        let end = records.partition_point(|r| r.date <= limit);
        records = &records[..end];
    }
    // The window has to end on an observed date, never beyond the data
    let Some(last) = records.last().map(|r| r.date) else {
        return Ok(None);
    };
    if last < start {
        return Ok(None);
    }

    let mut window = SlidingSum::new(rule.window_days as usize);
    let mut rest = records[records.partition_point(|r| r.date < start)..].iter().peekable();

    for day in days_between(start, last) {
        let rain = match rest.peek() {
            Some(r) if r.date == day => rest.next().map_or(0.0, |r| r.precipitation_total),
            _ => 0.0,
        };
        let sum = window.push(rain);
        if window.is_full() && sum >= rule.threshold_mm {
            return Ok(window_start(day, rule.window_days));
        }
    }
    Ok(None)
}

/// One estimate per year present in the series, nulls included.
pub fn onset_by_year(
    series: &DailySeries,
    rule: &OnsetRule,
) -> Result<Vec<OnsetEstimate>, EngineError> {
    series
        .years()
        .into_iter()
        .map(|year| {
            let onset = detect_onset(series, year, rule)?;
            Ok(OnsetEstimate {
                year,
                zone: series.zone(),
                onset_day_of_year: onset.map(|d| d.ordinal()),
                onset_date: onset,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum TrendDirection {
    Earlier,
    Flat,
    Later,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Earlier => "earlier",
            TrendDirection::Flat => "flat",
            TrendDirection::Later => "later",
        }
    }
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Least-squares trend of onset day against year.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct OnsetTrend {
    pub direction: TrendDirection,
    /// Days per year; negative means onset is arriving earlier
    pub slope_days_per_year: f64,
    pub mean_onset_day: f64,
    pub years_used: u32,
}

/// Fit `day_of_year = a + b * year` over the non-null estimates.
///
/// b = Σ(x - x̄)(y - ȳ) / Σ(x - x̄)²
pub fn onset_trend(
    estimates: &[OnsetEstimate],
    dead_zone: f64,
) -> Result<OnsetTrend, EngineError> {
    let points: Vec<(f64, f64)> = estimates
        .iter()
        .filter_map(|e| e.onset_day_of_year.map(|d| (f64::from(e.year), f64::from(d))))
        .collect();

    if points.len() < 2 {
        return Err(EngineError::InsufficientData(format!(
            "onset trend needs at least two years with an onset, got {}",
            points.len()
        )));
    }

    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;
    let sxx: f64 = points.iter().map(|p| (p.0 - mean_x).powi(2)).sum();
    let sxy: f64 = points
        .iter()
        .map(|p| (p.0 - mean_x) * (p.1 - mean_y))
        .sum();

    if sxx <= 0.0 {
        return Err(EngineError::DivisionUndefined(
            "onset estimates all belong to the same year".to_string(),
        ));
    }
    let slope = sxy / sxx;

    let direction = if slope < -dead_zone {
        TrendDirection::Earlier
    } else if slope > dead_zone {
        TrendDirection::Later
    } else {
        TrendDirection::Flat
    };

    Ok(OnsetTrend {
        direction,
        slope_days_per_year: slope,
        mean_onset_day: mean_y,
        years_used: points.len() as u32,
    })
}
