//! Shared helpers for Decimal ↔ f64 conversions and calendar arithmetic.
//!
//! Observation rows store NUMERIC columns as `Decimal`; the engine works in
//! `f64`. Day-of-year handling is shared by the baseline, onset and GDD code
//! so that every component folds leap days the same way.

use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Highest day-of-year used for baselines. Day 366 is folded onto it.
pub(crate) const MAX_DAY_OF_YEAR: u32 = 365;

/// Convert a Decimal to f64, defaulting to 0.0 for values that can't be represented.
pub(crate) fn dec_to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

/// Convert an Option<Decimal> to Option<f64>.
pub(crate) fn opt_dec_to_f64(d: Option<Decimal>) -> Option<f64> {
    d.and_then(|v| v.to_f64())
}

/// Day of year in 1..=365, with 31 December of a leap year folded onto 365.
pub(crate) fn folded_day_of_year(date: NaiveDate) -> u32 {
    date.ordinal().min(MAX_DAY_OF_YEAR)
}

/// Round a fractional day count to whole days (half away from zero).
/// `None` when the count is not finite or does not fit an `i64`.
pub(crate) fn round_days(days: f64) -> Option<i64> {
    let rounded = days.round();
    (rounded.is_finite() && rounded.abs() < i64::MAX as f64).then_some(rounded as i64)
}

/// `date` moved by `days`, or `None` past the representable calendar.
pub(crate) fn offset_date(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    Duration::try_days(days).and_then(|d| date.checked_add_signed(d))
}

/// First day of the `window_days` window ending at `end`, if representable.
pub(crate) fn window_start(end: NaiveDate, window_days: u32) -> Option<NaiveDate> {
    offset_date(end, 1 - i64::from(window_days))
}

/// Snap a running sum to 1e-6 so subtraction drift in sliding sums cannot
/// move a value across a classification threshold.
pub(crate) fn snap_micro(v: f64) -> f64 {
    (v * 1_000_000.0).round() / 1_000_000.0
}

/// Inclusive calendar-day iterator from `from` to `to`.
pub(crate) fn days_between(from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    from.iter_days().take_while(move |d| *d <= to)
}
