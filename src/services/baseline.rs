//! Day-of-year climatology and current-year deviation.
//!
//! The baseline groups every record from years before the current one by
//! day of year (31 December of a leap year folded onto day 365) and averages
//! temperature and rainfall per day. The deviation analysis lines the current
//! year up against it day by day.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

use super::series::{DailyRecord, DailySeries, Zone};
use crate::errors::EngineError;
use crate::helpers::{folded_day_of_year, MAX_DAY_OF_YEAR};

/// Rainfall deviation beyond ±this percentage is Drier/Wetter.
pub const RAINFALL_DEVIATION_PCT: f64 = 20.0;

/// Mean temperature delta beyond ±this is Cooler/Warmer (°C).
pub const TEMP_DEVIATION_C: f64 = 1.5;

/// Averages for one day of the year.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BaselineDay {
    pub day_of_year: u32,
    /// Mean of (t_max + t_min) / 2, °C
    pub mean_temp: f64,
    pub mean_temp_max: f64,
    pub mean_temp_min: f64,
    /// Mean daily rainfall, mm
    pub mean_rainfall: f64,
    /// Number of historical records averaged
    pub samples: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Baseline {
    zone: Zone,
    years: Vec<i32>,
    days: BTreeMap<u32, BaselineDay>,
}

#[derive(Default)]
struct DaySums {
    temp: f64,
    temp_max: f64,
    temp_min: f64,
    rain: f64,
    n: u32,
}

/// Build the climatology from records of years strictly before `current_year`.
pub fn build_baseline(series: &DailySeries, current_year: i32) -> Result<Baseline, EngineError> {
    let history: Vec<&DailyRecord> = series
        .records()
        .iter()
        .filter(|r| r.date.year() < current_year)
        .collect();

    if history.is_empty() {
        return Err(EngineError::InsufficientData(format!(
            "{}: no historical records before {}",
            series.zone(),
            current_year
        )));
    }

    let mut sums: BTreeMap<u32, DaySums> = BTreeMap::new();
    for r in &history {
        let s = sums.entry(folded_day_of_year(r.date)).or_default();
        s.temp += r.temp_avg();
        s.temp_max += r.temp_max;
        s.temp_min += r.temp_min;
        s.rain += r.precipitation_total;
        s.n += 1;
    }

    let days = sums
        .into_iter()
        .map(|(doy, s)| {
            let n = f64::from(s.n);
            (
                doy,
                BaselineDay {
                    day_of_year: doy,
                    mean_temp: s.temp / n,
                    mean_temp_max: s.temp_max / n,
                    mean_temp_min: s.temp_min / n,
                    mean_rainfall: s.rain / n,
                    samples: s.n,
                },
            )
        })
        .collect();

    let mut years: Vec<i32> = history.iter().map(|r| r.date.year()).collect();
    years.dedup();

    Ok(Baseline {
        zone: series.zone(),
        years,
        days,
    })
}

impl Baseline {
    pub fn zone(&self) -> Zone {
        self.zone
    }

    /// Historical years that contributed, ascending.
    pub fn years(&self) -> &[i32] {
        &self.years
    }

    /// Day entry without range checks (day 366 folds onto 365).
    pub fn day(&self, day_of_year: u32) -> Option<&BaselineDay> {
        self.days.get(&day_of_year.min(MAX_DAY_OF_YEAR))
    }

    /// Baseline mean temperature and rainfall for a day of year.
    pub fn baseline_for(&self, day_of_year: u32) -> Result<&BaselineDay, EngineError> {
        if !(1..=366).contains(&day_of_year) {
            return Err(EngineError::OutOfRangeInput(format!(
                "day of year {} outside 1-366",
                day_of_year
            )));
        }
        self.day(day_of_year).ok_or_else(|| {
            EngineError::InsufficientData(format!(
                "{}: no historical samples for day {}",
                self.zone, day_of_year
            ))
        })
    }

    /// Centred rolling mean over day of year.
    ///
    /// Each day averages the present days within `window / 2` either side, so
    /// windows at the edges of the year are partial.
    pub fn smoothed(&self, window: u32) -> Result<Baseline, EngineError> {
        if window == 0 {
            return Err(EngineError::OutOfRangeInput(
                "smoothing window must be at least one day".to_string(),
            ));
        }
        let half = window / 2;
        let days = self
            .days
            .keys()
            .map(|&doy| {
                let neighbours: Vec<&BaselineDay> = self
                    .days
                    .range(doy.saturating_sub(half)..=doy + half)
                    .map(|(_, d)| d)
                    .collect();
                let n = neighbours.len() as f64;
                let mean = |f: fn(&BaselineDay) -> f64| {
                    neighbours.iter().map(|d| f(d)).sum::<f64>() / n
                };
                (
                    doy,
                    BaselineDay {
                        day_of_year: doy,
                        mean_temp: mean(|d| d.mean_temp),
                        mean_temp_max: mean(|d| d.mean_temp_max),
                        mean_temp_min: mean(|d| d.mean_temp_min),
                        mean_rainfall: mean(|d| d.mean_rainfall),
                        samples: self.days[&doy].samples,
                    },
                )
            })
            .collect();

        Ok(Baseline {
            zone: self.zone,
            years: self.years.clone(),
            days,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviationThresholds {
    pub rainfall_pct: f64,
    pub temp_delta_c: f64,
}

impl Default for DeviationThresholds {
    fn default() -> Self {
        Self {
            rainfall_pct: RAINFALL_DEVIATION_PCT,
            temp_delta_c: TEMP_DEVIATION_C,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum RainfallDeviation {
    Drier,
    Normal,
    Wetter,
    /// The baseline rainfall over the aligned days is zero
    Undefined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum TempDeviation {
    Cooler,
    Normal,
    Warmer,
}

/// Classify a rainfall percentage deviation. Boundaries are Normal.
pub fn classify_rainfall_deviation(pct: Option<f64>, threshold_pct: f64) -> RainfallDeviation {
    match pct {
        None => RainfallDeviation::Undefined,
        Some(p) if p < -threshold_pct => RainfallDeviation::Drier,
        Some(p) if p > threshold_pct => RainfallDeviation::Wetter,
        Some(_) => RainfallDeviation::Normal,
    }
}

pub fn classify_temp_deviation(delta: f64, threshold_c: f64) -> TempDeviation {
    if delta < -threshold_c {
        TempDeviation::Cooler
    } else if delta > threshold_c {
        TempDeviation::Warmer
    } else {
        TempDeviation::Normal
    }
}

/// 100 · (current − baseline) / baseline, or None for a zero baseline.
pub fn rainfall_pct_deviation(cum_current: f64, cum_baseline: f64) -> Option<f64> {
    if cum_baseline == 0.0 {
        None
    } else {
        Some(100.0 * (cum_current - cum_baseline) / cum_baseline)
    }
}

/// One current-year (or forecast) day against its baseline day.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DayDeviation {
    pub date: NaiveDate,
    pub day_of_year: u32,
    pub temp_current: f64,
    pub temp_baseline: f64,
    pub temp_delta: f64,
    pub rainfall_current: f64,
    pub rainfall_baseline: f64,
    pub is_forecast: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DeviationReport {
    pub zone: Zone,
    pub as_of: NaiveDate,
    pub baseline_years: Vec<i32>,
    /// Observed days matched to a baseline day
    pub aligned_days: u32,
    pub mean_temp_delta: f64,
    pub temp_class: TempDeviation,
    pub cumulative_rainfall_current: f64,
    pub cumulative_rainfall_baseline: f64,
    /// Null when the baseline rainfall is zero
    pub rainfall_pct_deviation: Option<f64>,
    pub rainfall_class: RainfallDeviation,
    /// Deviation with forecast days appended, null without forecast
    pub projected_rainfall_pct_deviation: Option<f64>,
    pub projected_rainfall_class: Option<RainfallDeviation>,
    pub days: Vec<DayDeviation>,
}

fn align(record: &DailyRecord, baseline: &Baseline, is_forecast: bool) -> Option<DayDeviation> {
    let doy = folded_day_of_year(record.date);
    baseline.day(doy).map(|b| DayDeviation {
        date: record.date,
        day_of_year: doy,
        temp_current: record.temp_avg(),
        temp_baseline: b.mean_temp,
        temp_delta: record.temp_avg() - b.mean_temp,
        rainfall_current: record.precipitation_total,
        rainfall_baseline: b.mean_rainfall,
        is_forecast,
    })
}

/// Compare `as_of`'s year up to `as_of` with the baseline.
///
/// Forecast days dated after `as_of` only feed the projected rainfall figure.
pub fn deviation(
    current: &DailySeries,
    baseline: &Baseline,
    as_of: NaiveDate,
    forecast: &[DailyRecord],
    thresholds: &DeviationThresholds,
) -> Result<DeviationReport, EngineError> {
    if baseline.zone() != current.zone() {
        return Err(EngineError::OutOfRangeInput(format!(
            "{} series compared with a {} baseline",
            current.zone(),
            baseline.zone()
        )));
    }
    let year_start = NaiveDate::from_ymd_opt(as_of.year(), 1, 1)
        .ok_or_else(|| EngineError::OutOfRangeInput(format!("invalid date {}", as_of)))?;

    let actual: Vec<DayDeviation> = current
        .range(year_start, as_of)
        .iter()
        .filter_map(|r| align(r, baseline, false))
        .collect();

    if actual.is_empty() {
        return Err(EngineError::InsufficientData(format!(
            "{}: no {} observations up to {} line up with the baseline",
            current.zone(),
            as_of.year(),
            as_of
        )));
    }

    let projected: Vec<DayDeviation> = forecast
        .iter()
        .filter(|r| r.date > as_of)
        .filter_map(|r| align(r, baseline, true))
        .collect();

    let n = actual.len() as f64;
    let mean_temp_delta = actual.iter().map(|d| d.temp_delta).sum::<f64>() / n;
    let cum_current: f64 = actual.iter().map(|d| d.rainfall_current).sum();
    let cum_baseline: f64 = actual.iter().map(|d| d.rainfall_baseline).sum();
    let pct = rainfall_pct_deviation(cum_current, cum_baseline);

    let (projected_pct, projected_class) = if projected.is_empty() {
        (None, None)
    } else {
        let fc_current: f64 = projected.iter().map(|d| d.rainfall_current).sum();
        let fc_baseline: f64 = projected.iter().map(|d| d.rainfall_baseline).sum();
        let p = rainfall_pct_deviation(cum_current + fc_current, cum_baseline + fc_baseline);
        (p, Some(classify_rainfall_deviation(p, thresholds.rainfall_pct)))
    };

    let mut days = actual;
    let aligned_days = days.len() as u32;
    days.extend(projected);

    Ok(DeviationReport {
        zone: current.zone(),
        as_of,
        baseline_years: baseline.years().to_vec(),
        aligned_days,
        mean_temp_delta,
        temp_class: classify_temp_deviation(mean_temp_delta, thresholds.temp_delta_c),
        cumulative_rainfall_current: cum_current,
        cumulative_rainfall_baseline: cum_baseline,
        rainfall_pct_deviation: pct,
        rainfall_class: classify_rainfall_deviation(pct, thresholds.rainfall_pct),
        projected_rainfall_pct_deviation: projected_pct,
        projected_rainfall_class: projected_class,
        days,
    })
}
