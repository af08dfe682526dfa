//! Trailing-window aggregation over a daily series.
//!
//! A window of `w` days ending at `d` covers the calendar dates
//! `[d - w + 1, d]`. Missing dates count as zero for sums and are left out
//! of means, so a rainfall sum over a gappy window is a lower bound.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::str::FromStr;
use utoipa::ToSchema;

use super::series::{DailyField, DailySeries, Zone};
use crate::errors::EngineError;
use crate::helpers::{days_between, snap_micro, window_start};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Sum,
    Mean,
}

/// Window length: a fixed number of days, or everything since the first record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSpan {
    Days(u32),
    All,
}

impl FromStr for WindowSpan {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(WindowSpan::All);
        }
        let days: u32 = s
            .trim_end_matches(['d', 'D'])
            .parse()
            .map_err(|_| EngineError::OutOfRangeInput(format!("invalid window '{}'", s)))?;
        Ok(WindowSpan::Days(days))
    }
}

/// Aggregate of one field over a trailing window.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RollingWindowResult {
    pub zone: Zone,
    /// Window length in days, null for an all-history window
    pub window_days: Option<u32>,
    /// First calendar date covered
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub field: DailyField,
    pub aggregation: Aggregation,
    pub value: f64,
    /// Dates in the window with a daily record
    pub observed_days: u32,
    /// Dates in the window with no daily record
    pub missing_days: u32,
}

/// Start of a `w`-day window ending at `end`, or an error when it would
/// begin before the earliest representable date.
fn checked_window_start(w: u32, end: NaiveDate) -> Result<NaiveDate, EngineError> {
    window_start(end, w).ok_or_else(|| {
        EngineError::OutOfRangeInput(format!("a {}-day window ending {} is out of range", w, end))
    })
}

/// Sum or mean of `field` over the window ending at `as_of`.
pub fn rolling_window(
    series: &DailySeries,
    field: DailyField,
    window: WindowSpan,
    as_of: NaiveDate,
    aggregation: Aggregation,
) -> Result<RollingWindowResult, EngineError> {
    let (start_date, window_days) = match window {
        WindowSpan::Days(0) => {
            return Err(EngineError::OutOfRangeInput(
                "window length must be at least one day".to_string(),
            ))
        }
        WindowSpan::Days(w) => (checked_window_start(w, as_of)?, Some(w)),
        WindowSpan::All => (
            series.first_date().map_or(as_of, |first| first.min(as_of)),
            None,
        ),
    };

    let records = series.range(start_date, as_of);
    let calendar_days = ((as_of - start_date).num_days() + 1) as u32;
    let observed_days = records.len() as u32;
    let total: f64 = records.iter().map(|r| field.value(r)).sum();

    let value = match aggregation {
        Aggregation::Sum => snap_micro(total),
        Aggregation::Mean => {
            if records.is_empty() {
                return Err(EngineError::InsufficientData(format!(
                    "no observations for {} between {} and {}",
                    series.zone(),
                    start_date,
                    as_of
                )));
            }
            total / records.len() as f64
        }
    };

    Ok(RollingWindowResult {
        zone: series.zone(),
        window_days,
        start_date,
        end_date: as_of,
        field,
        aggregation,
        value,
        observed_days,
        missing_days: calendar_days - observed_days,
    })
}

/// Fixed-length running sum fed one value per calendar day.
#[derive(Debug, Clone)]
pub struct SlidingSum {
    capacity: usize,
    values: VecDeque<f64>,
    sum: f64,
}

impl SlidingSum {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            values: VecDeque::new(),
            sum: 0.0,
        }
    }

    /// Push the next day's value, evicting the oldest once full. Returns the snapped sum.
    pub fn push(&mut self, value: f64) -> f64 {
        if self.values.len() == self.capacity {
            if let Some(old) = self.values.pop_front() {
                self.sum -= old;
            }
        }
        self.values.push_back(value);
        self.sum += value;
        self.sum()
    }

    /// Current window sum, snapped to 1e-6.
    pub fn sum(&self) -> f64 {
        snap_micro(self.sum)
    }

    /// True once `capacity` values have been pushed.
    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }
}

/// One day of a rolling series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct WindowPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Rolling `window_days` sum for every calendar day in `[from, to]`.
///
/// Days before `from` are used to fill the first windows, so the value at
/// `from` equals `rolling_window(.., Days(window_days), from, Sum)`.
pub fn rolling_sums(
    series: &DailySeries,
    field: DailyField,
    window_days: u32,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<WindowPoint>, EngineError> {
    if window_days == 0 {
        return Err(EngineError::OutOfRangeInput(
            "window length must be at least one day".to_string(),
        ));
    }
    if from > to {
        return Err(EngineError::OutOfRangeInput(format!(
            "range start {} is after end {}",
            from, to
        )));
    }

    // Days before the first record only ever add zero
    let earliest = series.first_date().map_or(from, |first| first.min(from));
    let lead_in = checked_window_start(window_days, from)?.max(earliest);
    let records = series.range(lead_in, to);
    let mut next = records.iter().peekable();
    let mut window = SlidingSum::new(window_days as usize);
    let mut points = Vec::new();

    for day in days_between(lead_in, to) {
        let value = match next.peek() {
            Some(r) if r.date == day => next.next().map_or(0.0, |r| field.value(r)),
            _ => 0.0,
        };
        let sum = window.push(value);
        if day >= from {
            points.push(WindowPoint { date: day, value: sum });
        }
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{date, rain_series};
    use proptest::prelude::*;

    #[test]
    fn test_sum_over_seven_days() {
        let series = rain_series(
            Zone::Aba,
            date(2024, 5, 1),
            &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
        );
        let r = rolling_window(
            &series,
            DailyField::Precipitation,
            WindowSpan::Days(7),
            date(2024, 5, 8),
            Aggregation::Sum,
        )
        .unwrap();
        assert_eq!(r.value, 35.0);
        assert_eq!(r.start_date, date(2024, 5, 2));
        assert_eq!(r.observed_days, 7);
        assert_eq!(r.missing_days, 0);
    }

    #[test]
    fn test_missing_days_count_as_zero_for_sum() {
        let series = rain_series(Zone::Aba, date(2024, 5, 1), &[4.0, 4.0]);
        let r = rolling_window(
            &series,
            DailyField::Precipitation,
            WindowSpan::Days(7),
            date(2024, 5, 7),
            Aggregation::Sum,
        )
        .unwrap();
        assert_eq!(r.value, 8.0);
        assert_eq!(r.observed_days, 2);
        assert_eq!(r.missing_days, 5);
    }

    #[test]
    fn test_mean_excludes_missing_days() {
        let series = rain_series(Zone::Aba, date(2024, 5, 1), &[4.0, 8.0]);
        let r = rolling_window(
            &series,
            DailyField::Precipitation,
            WindowSpan::Days(30),
            date(2024, 5, 20),
            Aggregation::Mean,
        )
        .unwrap();
        assert!((r.value - 6.0).abs() < 1e-10);
    }

    #[test]
    fn test_mean_of_empty_window_is_insufficient_data() {
        let series = rain_series(Zone::Aba, date(2024, 5, 1), &[4.0]);
        let r = rolling_window(
            &series,
            DailyField::TempMax,
            WindowSpan::Days(7),
            date(2024, 6, 30),
            Aggregation::Mean,
        );
        assert!(matches!(r, Err(EngineError::InsufficientData(_))));
    }

    #[test]
    fn test_zero_window_rejected() {
        let series = rain_series(Zone::Aba, date(2024, 5, 1), &[4.0]);
        let r = rolling_window(
            &series,
            DailyField::Precipitation,
            WindowSpan::Days(0),
            date(2024, 5, 1),
            Aggregation::Sum,
        );
        assert!(matches!(r, Err(EngineError::OutOfRangeInput(_))));
    }

    #[test]
    fn test_all_window_starts_at_first_record() {
        let series = rain_series(Zone::Umuahia, date(2024, 1, 1), &[1.0; 40]);
        let r = rolling_window(
            &series,
            DailyField::Precipitation,
            WindowSpan::All,
            date(2024, 2, 9),
            Aggregation::Sum,
        )
        .unwrap();
        assert_eq!(r.window_days, None);
        assert_eq!(r.start_date, date(2024, 1, 1));
        assert_eq!(r.value, 40.0);
    }

    #[test]
    fn test_window_reaching_past_calendar_is_rejected() {
        let series = rain_series(Zone::Aba, date(2024, 5, 1), &[4.0]);
        for window in ["999999999", "4294967295"] {
            let r = rolling_window(
                &series,
                DailyField::Precipitation,
                window.parse().unwrap(),
                date(2024, 5, 1),
                Aggregation::Sum,
            );
            assert!(matches!(r, Err(EngineError::OutOfRangeInput(_))), "window {}", window);
        }
    }

    #[test]
    fn test_long_window_covers_whole_record() {
        let series = rain_series(Zone::Aba, date(2024, 5, 1), &[4.0, 6.0]);
        let r = rolling_window(
            &series,
            DailyField::Precipitation,
            WindowSpan::Days(1_000_000),
            date(2024, 5, 2),
            Aggregation::Sum,
        )
        .unwrap();
        assert_eq!(r.value, 10.0);
        assert_eq!(r.window_days, Some(1_000_000));
        assert_eq!(r.observed_days, 2);
        assert_eq!(r.missing_days, 999_998);
    }

    #[test]
    fn test_window_at_calendar_minimum() {
        let series = rain_series(Zone::Aba, date(2024, 5, 1), &[4.0]);
        let at_min = |w: u32| {
            rolling_window(
                &series,
                DailyField::Precipitation,
                WindowSpan::Days(w),
                NaiveDate::MIN,
                Aggregation::Sum,
            )
        };
        assert_eq!(at_min(1).unwrap().value, 0.0);
        assert!(matches!(at_min(2), Err(EngineError::OutOfRangeInput(_))));
    }

    #[test]
    fn test_window_span_parse() {
        assert_eq!("7".parse::<WindowSpan>().unwrap(), WindowSpan::Days(7));
        assert_eq!("30d".parse::<WindowSpan>().unwrap(), WindowSpan::Days(30));
        assert_eq!("ALL".parse::<WindowSpan>().unwrap(), WindowSpan::All);
        assert!("week".parse::<WindowSpan>().is_err());
    }

    #[test]
    fn test_sliding_sum_evicts_oldest() {
        let mut s = SlidingSum::new(3);
        s.push(1.0);
        s.push(2.0);
        assert!(!s.is_full());
        assert_eq!(s.push(3.0), 6.0);
        assert!(s.is_full());
        assert_eq!(s.push(4.0), 9.0);
        assert_eq!(s.sum(), 9.0);
    }

    #[test]
    fn test_sliding_sum_has_no_drift_at_thresholds() {
        let mut s = SlidingSum::new(7);
        for _ in 0..1000 {
            s.push(0.1);
        }
        for _ in 0..7 {
            s.push(5.0 / 7.0);
        }
        assert_eq!(s.sum(), 5.0);
    }

    #[test]
    fn test_rolling_sums_match_rolling_window() {
        let rain: Vec<f64> = (0..60).map(|i| (i % 5) as f64 * 1.3).collect();
        let series = rain_series(Zone::Bende, date(2024, 3, 1), &rain);
        let points = rolling_sums(
            &series,
            DailyField::Precipitation,
            7,
            date(2024, 3, 10),
            date(2024, 4, 29),
        )
        .unwrap();
        assert_eq!(points.len(), 51);
        for p in &points {
            let direct = rolling_window(
                &series,
                DailyField::Precipitation,
                WindowSpan::Days(7),
                p.date,
                Aggregation::Sum,
            )
            .unwrap();
            assert!((p.value - direct.value).abs() < 1e-6, "mismatch on {}", p.date);
        }
    }

    #[test]
    fn test_rolling_sums_rejects_reversed_range() {
        let series = rain_series(Zone::Aba, date(2024, 3, 1), &[1.0]);
        assert!(rolling_sums(
            &series,
            DailyField::Precipitation,
            7,
            date(2024, 3, 2),
            date(2024, 3, 1)
        )
        .is_err());
    }

    #[test]
    fn test_rolling_sums_with_huge_window() {
        let series = rain_series(Zone::Aba, date(2024, 3, 1), &[2.0, 3.0, 5.0]);
        let points = rolling_sums(
            &series,
            DailyField::Precipitation,
            50_000_000,
            date(2024, 3, 2),
            date(2024, 3, 4),
        )
        .unwrap();
        let values: Vec<f64> = points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![5.0, 10.0, 10.0]);

        let r = rolling_sums(
            &series,
            DailyField::Precipitation,
            u32::MAX,
            date(2024, 3, 1),
            date(2024, 3, 3),
        );
        assert!(matches!(r, Err(EngineError::OutOfRangeInput(_))));
    }

    #[test]
    fn test_repeated_query_is_identical() {
        let series = rain_series(Zone::Aba, date(2024, 5, 1), &[3.0, 0.0, 7.5]);
        let run = || {
            rolling_window(
                &series,
                DailyField::Precipitation,
                WindowSpan::Days(7),
                date(2024, 5, 3),
                Aggregation::Sum,
            )
            .unwrap()
        };
        assert_eq!(run(), run());
    }

    proptest! {
        #[test]
        fn prop_rolling_sum_monotone_in_window_length(
            rain in proptest::collection::vec(0.0f64..80.0, 1..120),
            short in 1u32..60,
            extra in 0u32..60,
        ) {
            let series = rain_series(Zone::Aba, date(2023, 1, 1), &rain);
            let end = series.last_date().unwrap();
            let sum = |w: u32| {
                rolling_window(
                    &series,
                    DailyField::Precipitation,
                    WindowSpan::Days(w),
                    end,
                    Aggregation::Sum,
                )
                .unwrap()
                .value
            };
            prop_assert!(sum(short) <= sum(short + extra));
        }
    }
}
