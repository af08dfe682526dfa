//! Growing degree days: heat-unit accumulation and maturity progress.
//!
//! A crop accrues `max(0, (t_max + t_min) / 2 - t_base)` heat units per day.
//! Progress towards the crop's target drives the projected harvest date while
//! the crop is growing, and the overdue count once it has matured.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::baseline::Baseline;
use super::crops::CropProfile;
use super::onset::{detect_onset_until, OnsetRule};
use super::series::{DailySeries, Zone};
use crate::errors::EngineError;
use crate::helpers::{days_between, folded_day_of_year, offset_date, round_days};

/// Default number of recent observed days averaged for the daily GDD rate.
pub const DEFAULT_TRAILING_DAYS: u32 = 14;

/// Upper limit of days walked when projecting from the climatology.
pub const MAX_PROJECTION_DAYS: u32 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GddSettings {
    /// Recent observed days used for the average daily rate (14–30)
    pub trailing_days: u32,
}

impl Default for GddSettings {
    fn default() -> Self {
        Self {
            trailing_days: DEFAULT_TRAILING_DAYS,
        }
    }
}

/// Heat units for one day.
///
/// GDD = max(0, (T_max + T_min) / 2 − T_base)
pub fn daily_gdd(t_max: f64, t_min: f64, t_base: f64) -> f64 {
    ((t_max + t_min) / 2.0 - t_base).max(0.0)
}

/// One calendar day of a cumulative GDD run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct GddPoint {
    pub date: NaiveDate,
    pub daily: f64,
    pub cumulative: f64,
    /// False when no record exists for the date (contributes 0)
    pub observed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CumulativeGdd {
    pub total: f64,
    pub gap_days: u32,
    pub points: Vec<GddPoint>,
}

/// Running GDD sum over every calendar day in `[season_start, as_of]`.
pub fn cumulative_gdd(
    series: &DailySeries,
    t_base: f64,
    season_start: NaiveDate,
    as_of: NaiveDate,
) -> Result<CumulativeGdd, EngineError> {
    if season_start > as_of {
        return Err(EngineError::OutOfRangeInput(format!(
            "season start {} is after {}",
            season_start, as_of
        )));
    }

    let mut total = 0.0;
    let mut gap_days = 0;
    let mut records = series.range(season_start, as_of).iter().peekable();
    let mut points = Vec::new();

    for date in days_between(season_start, as_of) {
        let daily = match records.peek() {
            Some(r) if r.date == date => records
                .next()
                .map(|r| daily_gdd(r.temp_max, r.temp_min, t_base)),
            _ => None,
        };
        if daily.is_none() {
            gap_days += 1;
        }
        total += daily.unwrap_or(0.0);
        points.push(GddPoint {
            date,
            daily: daily.unwrap_or(0.0),
            cumulative: total,
            observed: daily.is_some(),
        });
    }

    if gap_days > 0 {
        tracing::warn!(
            "{}: {} day(s) without observations between {} and {}",
            series.zone(),
            gap_days,
            season_start,
            as_of
        );
    }

    Ok(CumulativeGdd {
        total,
        gap_days,
        points,
    })
}

/// Qualitative reading of maturity progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum ProgressBand {
    JustStarted,
    EarlyGrowth,
    GoodProgress,
    AlmostReady,
    Mature,
    SlightlyOverdue,
    Overdue,
    SeverelyOverdue,
}

impl ProgressBand {
    pub fn from_pct(pct: f64) -> Self {
        match pct {
            p if p < 25.0 => ProgressBand::JustStarted,
            p if p < 50.0 => ProgressBand::EarlyGrowth,
            p if p < 80.0 => ProgressBand::GoodProgress,
            p if p < 100.0 => ProgressBand::AlmostReady,
            p if p < 105.0 => ProgressBand::Mature,
            p if p < 120.0 => ProgressBand::SlightlyOverdue,
            p if p < 150.0 => ProgressBand::Overdue,
            _ => ProgressBand::SeverelyOverdue,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProgressBand::JustStarted => "Just started",
            ProgressBand::EarlyGrowth => "Early growth",
            ProgressBand::GoodProgress => "Good progress",
            ProgressBand::AlmostReady => "Almost ready",
            ProgressBand::Mature => "Ready for harvest",
            ProgressBand::SlightlyOverdue => "Slightly overdue",
            ProgressBand::Overdue => "Overdue",
            ProgressBand::SeverelyOverdue => "Severely overdue",
        }
    }
}

/// Maturity progress of one crop in one zone.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct GddProgress {
    pub zone: Zone,
    pub crop: String,
    pub season_start: NaiveDate,
    pub as_of: NaiveDate,
    pub cumulative_gdd: f64,
    pub target_gdd: f64,
    /// 100 · cumulative / target, not capped
    pub progress_pct: f64,
    pub band: ProgressBand,
    /// Mean daily GDD over the most recent observed days
    pub avg_daily_gdd: Option<f64>,
    /// as_of minus cumulative / avg_daily_gdd; null when the rate is not positive
    pub estimated_planting_date: Option<NaiveDate>,
    /// Projected harvest while growing, or the day the target was reached once mature
    pub estimated_maturity_or_harvest_date: Option<NaiveDate>,
    /// Days since the target was reached, null while growing
    pub days_overdue: Option<i64>,
    pub gap_days: u32,
}

/// Mean daily GDD of the last `n` observed days on or before `as_of`.
fn trailing_rate(
    series: &DailySeries,
    t_base: f64,
    as_of: NaiveDate,
    n: u32,
) -> Result<f64, EngineError> {
    let history = series.up_to(as_of);
    let recent = &history[history.len().saturating_sub(n as usize)..];
    if recent.is_empty() {
        return Err(EngineError::InsufficientData(format!(
            "{}: no observations on or before {}",
            series.zone(),
            as_of
        )));
    }
    let sum: f64 = recent
        .iter()
        .map(|r| daily_gdd(r.temp_max, r.temp_min, t_base))
        .sum();
    Ok(sum / recent.len() as f64)
}

fn days_at_rate(gdd: f64, rate: f64) -> Result<i64, EngineError> {
    if rate <= 0.0 {
        return Err(EngineError::DivisionUndefined(format!(
            "average daily GDD is {}",
            rate
        )));
    }
    round_days(gdd / rate).ok_or_else(|| {
        EngineError::OutOfRangeInput(format!("{} GDD at {} per day is not a day count", gdd, rate))
    })
}

/// Date `gdd / rate` days after `as_of`, before it when `gdd` is negative.
fn date_at_rate(as_of: NaiveDate, gdd: f64, rate: f64) -> Result<NaiveDate, EngineError> {
    let days = days_at_rate(gdd, rate)?;
    offset_date(as_of, days).ok_or_else(|| {
        EngineError::OutOfRangeInput(format!("{} days from {} is out of range", days, as_of))
    })
}

/// Heat-unit progress of `crop` at `as_of`.
///
/// `season_start` defaults to the rainy-season onset of `as_of`'s year,
/// detected from data up to `as_of`.
pub fn gdd_progress(
    series: &DailySeries,
    crop: &CropProfile,
    season_start: Option<NaiveDate>,
    as_of: NaiveDate,
    settings: &GddSettings,
    onset_rule: &OnsetRule,
) -> Result<GddProgress, EngineError> {
    crop.validate()?;

    let season_start = match season_start {
        Some(start) => start,
        None => detect_onset_until(series, as_of.year(), onset_rule, Some(as_of))?.ok_or_else(
            || {
                EngineError::InsufficientData(format!(
                    "{}: no rainy-season onset detected in {} up to {}; pass a season start",
                    series.zone(),
                    as_of.year(),
                    as_of
                ))
            },
        )?,
    };

    let run = cumulative_gdd(series, crop.t_base, season_start, as_of)?;
    let cumulative = run.total;
    let target = crop.gdd_target;
    let progress_pct = 100.0 * cumulative / target;

    let avg = trailing_rate(series, crop.t_base, as_of, settings.trailing_days)?;

    let estimated_planting_date = match date_at_rate(as_of, -cumulative, avg) {
        Ok(date) => Some(date),
        Err(err) => {
            tracing::debug!("{}: planting date not estimated: {}", crop.key, err);
            None
        }
    };

    let (estimated_maturity_or_harvest_date, days_overdue) = if progress_pct < 100.0 {
        let harvest = match date_at_rate(as_of, target - cumulative, avg) {
            Ok(date) => Some(date),
            Err(err) => {
                tracing::debug!("{}: harvest date not estimated: {}", crop.key, err);
                None
            }
        };
        (harvest, None)
    } else {
        let matured = run
            .points
            .iter()
            .find(|p| p.cumulative >= target)
            .map(|p| p.date);
        (matured, matured.map(|d| (as_of - d).num_days()))
    };

    Ok(GddProgress {
        zone: series.zone(),
        crop: crop.name.clone(),
        season_start,
        as_of,
        cumulative_gdd: cumulative,
        target_gdd: target,
        progress_pct,
        band: ProgressBand::from_pct(progress_pct),
        avg_daily_gdd: Some(avg),
        estimated_planting_date,
        estimated_maturity_or_harvest_date,
        days_overdue,
        gap_days: run.gap_days,
    })
}

/// Cumulative GDD at one day of a year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct CurvePoint {
    pub day_of_year: u32,
    pub cumulative: f64,
}

/// One calendar year of heat-unit accumulation, reset on 1 January.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AnnualGddCurve {
    pub year: i32,
    pub total: f64,
    pub points: Vec<CurvePoint>,
}

pub fn annual_gdd_curves(series: &DailySeries, t_base: f64) -> Vec<AnnualGddCurve> {
    series
        .years()
        .into_iter()
        .map(|year| {
            let mut total = 0.0;
            let points = series
                .year(year)
                .iter()
                .map(|r| {
                    total += daily_gdd(r.temp_max, r.temp_min, t_base);
                    CurvePoint {
                        day_of_year: r.date.ordinal(),
                        cumulative: total,
                    }
                })
                .collect();
            AnnualGddCurve {
                year,
                total,
                points,
            }
        })
        .collect()
}

/// Harvest date projected from day-of-year mean temperatures.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct HarvestProjection {
    pub start: NaiveDate,
    /// Null when the target is not reached within a year
    pub projected_date: Option<NaiveDate>,
    pub days_to_target: Option<u32>,
    pub projected_gdd: f64,
    /// Days walked with no baseline sample (contributed 0)
    pub missing_baseline_days: u32,
}

/// Walk the baseline forward from `start` until `target` heat units accrue.
pub fn project_harvest_from_baseline(
    baseline: &Baseline,
    t_base: f64,
    target: f64,
    start: NaiveDate,
) -> HarvestProjection {
    let mut projected_gdd = 0.0;
    let mut missing_baseline_days = 0;

    for (offset, date) in start
        .iter_days()
        .take(MAX_PROJECTION_DAYS as usize)
        .enumerate()
    {
        match baseline.day(folded_day_of_year(date)) {
            Some(day) => projected_gdd += (day.mean_temp - t_base).max(0.0),
            None => missing_baseline_days += 1,
        }
        if projected_gdd >= target {
            return HarvestProjection {
                start,
                projected_date: Some(date),
                days_to_target: Some(offset as u32 + 1),
                projected_gdd,
                missing_baseline_days,
            };
        }
    }

    HarvestProjection {
        start,
        projected_date: None,
        days_to_target: None,
        projected_gdd,
        missing_baseline_days,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::baseline::build_baseline;
    use crate::services::crops::{CropTable, ValueRange};
    use crate::services::test_support::{date, day, full_years, temp_series};
    use proptest::prelude::*;

    fn test_crop(t_base: f64, target: f64) -> CropProfile {
        CropProfile {
            key: "test".to_string(),
            name: "Test crop".to_string(),
            t_base,
            gdd_target: target,
            rainfall_optimal_range: ValueRange { min: 500.0, max: 900.0 },
            temp_optimal_range: ValueRange { min: 20.0, max: 30.0 },
            growing_season_days: 90,
            planting_months: vec![4],
            optimal_planting_months: vec![4],
        }
    }

    #[test]
    fn test_daily_gdd_basic() {
        assert!((daily_gdd(30.0, 20.0, 10.0) - 15.0).abs() < 1e-10);
    }

    #[test]
    fn test_daily_gdd_clamped_at_zero() {
        assert_eq!(daily_gdd(12.0, 6.0, 10.0), 0.0);
    }

    #[test]
    fn test_cumulative_gdd_flags_gaps() {
        let records = vec![
            day(Zone::Aba, date(2024, 4, 1), 30.0, 20.0, 0.0),
            day(Zone::Aba, date(2024, 4, 3), 30.0, 20.0, 0.0),
        ];
        let series = DailySeries::from_daily(Zone::Aba, records).unwrap();
        let run = cumulative_gdd(&series, 10.0, date(2024, 4, 1), date(2024, 4, 4)).unwrap();
        assert_eq!(run.total, 30.0);
        assert_eq!(run.gap_days, 2);
        assert_eq!(run.points.len(), 4);
        assert!(!run.points[1].observed);
        assert_eq!(run.points[1].cumulative, 15.0);
    }

    #[test]
    fn test_cumulative_gdd_rejects_reversed_range() {
        let series = temp_series(Zone::Aba, date(2024, 4, 1), &[(30.0, 20.0)]);
        assert!(matches!(
            cumulative_gdd(&series, 10.0, date(2024, 4, 2), date(2024, 4, 1)),
            Err(EngineError::OutOfRangeInput(_))
        ));
    }

    #[test]
    fn test_progress_at_target_is_mature() {
        let series = temp_series(Zone::Aba, date(2024, 4, 1), &[(30.0, 20.0); 10]);
        let p = gdd_progress(
            &series,
            &test_crop(10.0, 150.0),
            Some(date(2024, 4, 1)),
            date(2024, 4, 10),
            &GddSettings::default(),
            &OnsetRule::default(),
        )
        .unwrap();
        assert_eq!(p.progress_pct, 100.0);
        assert_eq!(p.band, ProgressBand::Mature);
        assert_eq!(p.estimated_maturity_or_harvest_date, Some(date(2024, 4, 10)));
        assert_eq!(p.days_overdue, Some(0));
    }

    #[test]
    fn test_progress_at_130_pct_is_overdue() {
        let series = temp_series(Zone::Aba, date(2024, 4, 1), &[(30.0, 20.0); 13]);
        let p = gdd_progress(
            &series,
            &test_crop(10.0, 150.0),
            Some(date(2024, 4, 1)),
            date(2024, 4, 13),
            &GddSettings::default(),
            &OnsetRule::default(),
        )
        .unwrap();
        assert!((p.progress_pct - 130.0).abs() < 1e-9);
        assert_eq!(p.band, ProgressBand::Overdue);
        assert_eq!(p.estimated_maturity_or_harvest_date, Some(date(2024, 4, 10)));
        assert_eq!(p.days_overdue, Some(3));
    }

    #[test]
    fn test_progress_growing_projects_harvest() {
        let series = temp_series(Zone::Umuahia, date(2024, 4, 1), &[(30.0, 20.0); 4]);
        let p = gdd_progress(
            &series,
            &test_crop(10.0, 150.0),
            Some(date(2024, 4, 1)),
            date(2024, 4, 4),
            &GddSettings::default(),
            &OnsetRule::default(),
        )
        .unwrap();
        assert_eq!(p.cumulative_gdd, 60.0);
        assert_eq!(p.avg_daily_gdd, Some(15.0));
        assert_eq!(p.band, ProgressBand::EarlyGrowth);
        // (150 - 60) / 15 = 6 days after as_of
        assert_eq!(p.estimated_maturity_or_harvest_date, Some(date(2024, 4, 10)));
        // 60 / 15 = 4 days before as_of
        assert_eq!(p.estimated_planting_date, Some(date(2024, 3, 31)));
        assert_eq!(p.days_overdue, None);
    }

    #[test]
    fn test_zero_rate_gives_null_dates() {
        let series = temp_series(Zone::Bende, date(2024, 4, 1), &[(12.0, 6.0); 5]);
        let p = gdd_progress(
            &series,
            &test_crop(10.0, 150.0),
            Some(date(2024, 4, 1)),
            date(2024, 4, 5),
            &GddSettings::default(),
            &OnsetRule::default(),
        )
        .unwrap();
        assert_eq!(p.cumulative_gdd, 0.0);
        assert_eq!(p.estimated_planting_date, None);
        assert_eq!(p.estimated_maturity_or_harvest_date, None);
        assert_eq!(p.band, ProgressBand::JustStarted);
    }

    #[test]
    fn test_near_zero_rate_leaves_harvest_unprojected() {
        // 1e-7 GDD per day puts maturity billions of days away
        let series = temp_series(Zone::Aba, date(2024, 4, 1), &[(10.0000002, 10.0); 10]);
        let p = gdd_progress(
            &series,
            &test_crop(10.0, 1200.0),
            Some(date(2024, 4, 1)),
            date(2024, 4, 10),
            &GddSettings::default(),
            &OnsetRule::default(),
        )
        .unwrap();
        assert!(p.avg_daily_gdd.unwrap() > 0.0);
        assert_eq!(p.estimated_maturity_or_harvest_date, None);
        assert_eq!(p.days_overdue, None);
        assert_eq!(p.band, ProgressBand::JustStarted);
        assert!(p.estimated_planting_date.unwrap() <= date(2024, 4, 10));
    }

    #[test]
    fn test_days_at_rate_rejects_unrepresentable_counts() {
        assert_eq!(days_at_rate(100.0, 10.0).unwrap(), 10);
        assert!(matches!(
            days_at_rate(100.0, 0.0),
            Err(EngineError::DivisionUndefined(_))
        ));
        assert!(matches!(
            days_at_rate(1200.0, 1e-300),
            Err(EngineError::OutOfRangeInput(_))
        ));
        assert!(date_at_rate(date(2024, 4, 10), 1200.0, 1e-7).is_err());
        assert_eq!(
            date_at_rate(date(2024, 4, 10), -30.0, 10.0).unwrap(),
            date(2024, 4, 7)
        );
    }

    #[test]
    fn test_season_start_defaults_to_onset() {
        // 70 dry days, then a 3-day soaking starting on day 71 (12 March 2023)
        let records: Vec<_> = date(2023, 1, 1)
            .iter_days()
            .take(100)
            .enumerate()
            .map(|(i, d)| {
                let rain = if (70..73).contains(&i) { 8.0 } else { 0.0 };
                day(Zone::Aba, d, 30.0, 20.0, rain)
            })
            .collect();
        let series = DailySeries::from_daily(Zone::Aba, records).unwrap();
        let p = gdd_progress(
            &series,
            &test_crop(10.0, 1000.0),
            None,
            date(2023, 3, 21),
            &GddSettings::default(),
            &OnsetRule::default(),
        )
        .unwrap();
        assert_eq!(p.season_start, date(2023, 3, 12));
        assert_eq!(p.cumulative_gdd, 150.0);
    }

    #[test]
    fn test_no_onset_and_no_start_is_insufficient_data() {
        let series = temp_series(Zone::Aba, date(2023, 3, 1), &[(30.0, 20.0); 30]);
        let result = gdd_progress(
            &series,
            &test_crop(10.0, 1000.0),
            None,
            date(2023, 3, 30),
            &GddSettings::default(),
            &OnsetRule::default(),
        );
        assert!(matches!(result, Err(EngineError::InsufficientData(_))));
    }

    #[test]
    fn test_trailing_rate_uses_recent_days_only() {
        // 20 cool days then 14 warm days; the rate reflects the warm spell
        let mut temps = vec![(15.0, 5.0); 20];
        temps.extend(vec![(30.0, 20.0); 14]);
        let series = temp_series(Zone::Aba, date(2024, 4, 1), &temps);
        let p = gdd_progress(
            &series,
            &CropTable::default().lookup("maize").unwrap().clone(),
            Some(date(2024, 4, 1)),
            date(2024, 5, 4),
            &GddSettings::default(),
            &OnsetRule::default(),
        )
        .unwrap();
        assert_eq!(p.avg_daily_gdd, Some(15.0));
    }

    #[test]
    fn test_annual_curves_reset_each_year() {
        let series = full_years(Zone::Aba, &[2022, 2023], |_| (30.0, 20.0, 0.0));
        let curves = annual_gdd_curves(&series, 10.0);
        assert_eq!(curves.len(), 2);
        assert_eq!(curves[0].points[0].cumulative, 15.0);
        assert_eq!(curves[1].points[0].cumulative, 15.0);
        assert_eq!(curves[1].points[0].day_of_year, 1);
        assert_eq!(curves[0].total, 365.0 * 15.0);
    }

    #[test]
    fn test_project_harvest_from_baseline() {
        let series = full_years(Zone::Aba, &[2021, 2022], |_| (30.0, 20.0, 1.0));
        let baseline = build_baseline(&series, 2023).unwrap();
        let projection = project_harvest_from_baseline(&baseline, 10.0, 150.0, date(2023, 12, 28));
        // 15 GDD per day, wrapping into the new year
        assert_eq!(projection.days_to_target, Some(10));
        assert_eq!(projection.projected_date, Some(date(2024, 1, 6)));
        assert_eq!(projection.missing_baseline_days, 0);
    }

    #[test]
    fn test_project_harvest_unreachable_target() {
        let series = full_years(Zone::Aba, &[2021], |_| (14.0, 10.0, 1.0));
        let baseline = build_baseline(&series, 2023).unwrap();
        let projection = project_harvest_from_baseline(&baseline, 12.0, 1e6, date(2023, 1, 1));
        assert_eq!(projection.projected_date, None);
        assert_eq!(projection.projected_gdd, 0.0);
    }

    proptest! {
        #[test]
        fn prop_daily_gdd_non_negative(
            t_max in -20.0f64..50.0,
            spread in 0.0f64..25.0,
            t_base in 0.0f64..25.0,
        ) {
            let t_min = t_max - spread;
            let g = daily_gdd(t_max, t_min, t_base);
            prop_assert!(g >= 0.0);
            let raw = (t_max + t_min) / 2.0 - t_base;
            if raw >= 0.0 {
                prop_assert!((g - raw).abs() < 1e-12);
            } else {
                prop_assert_eq!(g, 0.0);
            }
        }
    }
}
