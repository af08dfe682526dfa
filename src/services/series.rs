//! Observation and daily-record model for a single zone.
//!
//! Hourly observations come from the series store unsorted as far as the
//! engine is concerned. `DailySeries::from_observations` validates them,
//! sorts by timestamp, rejects duplicate `(zone, timestamp)` keys and folds
//! them into one `DailyRecord` per calendar day. Every other engine component
//! works on a `DailySeries`.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

use crate::errors::EngineError;

/// Agricultural zones covered by the acquisition layer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
pub enum Zone {
    Aba,
    Umuahia,
    Bende,
}

impl Zone {
    pub fn all() -> &'static [Zone] {
        &[Zone::Aba, Zone::Umuahia, Zone::Bende]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Aba => "Aba",
            Zone::Umuahia => "Umuahia",
            Zone::Bende => "Bende",
        }
    }
}

impl std::fmt::Display for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Zone {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Zone::all()
            .iter()
            .copied()
            .find(|z| z.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| EngineError::OutOfRangeInput(format!("unknown zone '{}'", s)))
    }
}

/// One weather reading for a zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub zone: Zone,
    pub temp_current: f64,
    pub temp_max: f64,
    pub temp_min: f64,
    /// Relative humidity, 0–100 %
    pub humidity: f64,
    /// Rainfall for the observation's period, mm
    pub precipitation: f64,
    /// m/s
    pub wind_speed: f64,
    /// hPa
    pub pressure: Option<f64>,
}

impl Observation {
    /// Check physical ranges. Errors name the offending timestamp.
    pub fn validate(&self) -> Result<(), EngineError> {
        let at = self.timestamp.to_rfc3339();
        let finite = [
            self.temp_current,
            self.temp_max,
            self.temp_min,
            self.humidity,
            self.precipitation,
            self.wind_speed,
        ];
        if finite.iter().any(|v| !v.is_finite()) || self.pressure.is_some_and(|p| !p.is_finite()) {
            return Err(EngineError::OutOfRangeInput(format!(
                "non-finite value in observation at {}",
                at
            )));
        }
        if self.precipitation < 0.0 {
            return Err(EngineError::OutOfRangeInput(format!(
                "negative precipitation {} mm at {}",
                self.precipitation, at
            )));
        }
        if self.wind_speed < 0.0 {
            return Err(EngineError::OutOfRangeInput(format!(
                "negative wind speed {} m/s at {}",
                self.wind_speed, at
            )));
        }
        if !(0.0..=100.0).contains(&self.humidity) {
            return Err(EngineError::OutOfRangeInput(format!(
                "humidity {} % outside 0-100 at {}",
                self.humidity, at
            )));
        }
        Ok(())
    }
}

/// One zone-day aggregate, always recomputed from observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub zone: Zone,
    /// Highest hourly maximum of the day, °C
    pub temp_max: f64,
    /// Lowest hourly minimum of the day, °C
    pub temp_min: f64,
    /// Mean of the hourly current temperatures, °C
    pub temp_mean: f64,
    pub precipitation_total: f64,
    pub humidity_avg: f64,
    pub observation_count: u32,
}

impl DailyRecord {
    /// Daily average temperature as used for heat units and baselines.
    pub fn temp_avg(&self) -> f64 {
        (self.temp_max + self.temp_min) / 2.0
    }
}

/// Scalar field of a daily record that the window aggregator can summarise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DailyField {
    Precipitation,
    TempMax,
    TempMin,
    TempAvg,
    Humidity,
}

impl DailyField {
    pub fn value(&self, record: &DailyRecord) -> f64 {
        match self {
            DailyField::Precipitation => record.precipitation_total,
            DailyField::TempMax => record.temp_max,
            DailyField::TempMin => record.temp_min,
            DailyField::TempAvg => record.temp_avg(),
            DailyField::Humidity => record.humidity_avg,
        }
    }
}

/// Date-ordered daily records for one zone, at most one per date.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySeries {
    zone: Zone,
    records: Vec<DailyRecord>,
}

/// Running accumulator for one calendar day while folding observations.
struct DayAccumulator {
    date: NaiveDate,
    temp_max: f64,
    temp_min: f64,
    temp_sum: f64,
    precipitation: f64,
    humidity_sum: f64,
    count: u32,
}

impl DayAccumulator {
    fn start(obs: &Observation) -> Self {
        Self {
            date: obs.timestamp.date_naive(),
            temp_max: obs.temp_max,
            temp_min: obs.temp_min,
            temp_sum: obs.temp_current,
            precipitation: obs.precipitation,
            humidity_sum: obs.humidity,
            count: 1,
        }
    }

    fn add(&mut self, obs: &Observation) {
        self.temp_max = self.temp_max.max(obs.temp_max);
        self.temp_min = self.temp_min.min(obs.temp_min);
        self.temp_sum += obs.temp_current;
        self.precipitation += obs.precipitation;
        self.humidity_sum += obs.humidity;
        self.count += 1;
    }

    fn finish(self, zone: Zone) -> DailyRecord {
        let n = self.count as f64;
        DailyRecord {
            date: self.date,
            zone,
            temp_max: self.temp_max,
            temp_min: self.temp_min,
            temp_mean: self.temp_sum / n,
            precipitation_total: self.precipitation,
            humidity_avg: self.humidity_sum / n,
            observation_count: self.count,
        }
    }
}

impl DailySeries {
    /// Validate, sort and aggregate one zone's observations into daily records.
    pub fn from_observations(
        zone: Zone,
        mut observations: Vec<Observation>,
    ) -> Result<Self, EngineError> {
        for obs in &observations {
            if obs.zone != zone {
                return Err(EngineError::OutOfRangeInput(format!(
                    "observation for zone {} in a {} series",
                    obs.zone, zone
                )));
            }
            obs.validate()?;
        }

        observations.sort_by_key(|o| o.timestamp);
        if let Some(pair) = observations
            .windows(2)
            .find(|w| w[0].timestamp == w[1].timestamp)
        {
            return Err(EngineError::OutOfRangeInput(format!(
                "duplicate observation for {} at {}",
                zone,
                pair[0].timestamp.to_rfc3339()
            )));
        }

        let mut records = Vec::new();
        let mut current: Option<DayAccumulator> = None;
        for obs in &observations {
            match current.as_mut() {
                Some(acc) if acc.date == obs.timestamp.date_naive() => acc.add(obs),
                _ => {
                    if let Some(done) = current.replace(DayAccumulator::start(obs)) {
                        records.push(done.finish(zone));
                    }
                }
            }
        }
        if let Some(done) = current {
            records.push(done.finish(zone));
        }

        Ok(Self { zone, records })
    }

    /// Build from already-aggregated daily records (any order).
    ///
    /// Used for forecast days and by callers that hold daily data already.
    pub fn from_daily(zone: Zone, mut records: Vec<DailyRecord>) -> Result<Self, EngineError> {
        records.sort_by_key(|r| r.date);
        if let Some(pair) = records.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(EngineError::OutOfRangeInput(format!(
                "duplicate daily record for {} on {}",
                zone, pair[0].date
            )));
        }
        if let Some(bad) = records.iter().find(|r| r.zone != zone) {
            return Err(EngineError::OutOfRangeInput(format!(
                "daily record for zone {} in a {} series",
                bad.zone, zone
            )));
        }
        if let Some(bad) = records.iter().find(|r| r.precipitation_total < 0.0) {
            return Err(EngineError::OutOfRangeInput(format!(
                "negative precipitation on {}",
                bad.date
            )));
        }
        Ok(Self { zone, records })
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }

    pub fn records(&self) -> &[DailyRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.records.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.last().map(|r| r.date)
    }

    /// Record for an exact date, if observed.
    pub fn get(&self, date: NaiveDate) -> Option<&DailyRecord> {
        self.records
            .binary_search_by_key(&date, |r| r.date)
            .ok()
            .map(|i| &self.records[i])
    }

    /// Records with `from <= date <= to`.
    pub fn range(&self, from: NaiveDate, to: NaiveDate) -> &[DailyRecord] {
        let start = self.records.partition_point(|r| r.date < from);
        let end = self.records.partition_point(|r| r.date <= to);
        if start >= end {
            &[]
        } else {
            &self.records[start..end]
        }
    }

    /// Records dated on or before `date`.
    pub fn up_to(&self, date: NaiveDate) -> &[DailyRecord] {
        let end = self.records.partition_point(|r| r.date <= date);
        &self.records[..end]
    }

    /// Records belonging to one calendar year.
    pub fn year(&self, year: i32) -> &[DailyRecord] {
        let start = self.records.partition_point(|r| r.date.year() < year);
        let end = self.records.partition_point(|r| r.date.year() <= year);
        &self.records[start..end]
    }

    /// Distinct years present, ascending.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.records.iter().map(|r| r.date.year()).collect();
        years.dedup();
        years
    }

    /// Calendar dates between `from` and `to` with no daily record.
    pub fn gaps(&self, from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
        crate::helpers::days_between(from, to)
            .filter(|d| self.get(*d).is_none())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn obs(day: u32, hour: u32, temp: f64, rain: f64) -> Observation {
        Observation {
            timestamp: Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap(),
            zone: Zone::Aba,
            temp_current: temp,
            temp_max: temp + 1.0,
            temp_min: temp - 1.0,
            humidity: 80.0,
            precipitation: rain,
            wind_speed: 2.0,
            pressure: Some(1012.0),
        }
    }

    #[test]
    fn test_zone_parse_case_insensitive() {
        assert_eq!("umuahia".parse::<Zone>().unwrap(), Zone::Umuahia);
        assert_eq!(" BENDE ".parse::<Zone>().unwrap(), Zone::Bende);
        assert!(matches!(
            "Lagos".parse::<Zone>(),
            Err(EngineError::OutOfRangeInput(_))
        ));
    }

    #[test]
    fn test_daily_aggregation_sorts_and_folds() {
        // Deliberately out of order
        let series = DailySeries::from_observations(
            Zone::Aba,
            vec![
                obs(2, 9, 26.0, 0.5),
                obs(1, 15, 30.0, 2.0),
                obs(1, 9, 24.0, 1.0),
            ],
        )
        .unwrap();

        assert_eq!(series.len(), 2);
        let day1 = &series.records()[0];
        assert_eq!(day1.date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(day1.temp_max, 31.0);
        assert_eq!(day1.temp_min, 23.0);
        assert!((day1.temp_mean - 27.0).abs() < 1e-10);
        assert!((day1.precipitation_total - 3.0).abs() < 1e-10);
        assert_eq!(day1.observation_count, 2);
        assert!((day1.temp_avg() - 27.0).abs() < 1e-10);
    }

    #[test]
    fn test_duplicate_timestamp_rejected() {
        let result = DailySeries::from_observations(
            Zone::Aba,
            vec![obs(1, 9, 24.0, 0.0), obs(1, 9, 25.0, 0.0)],
        );
        assert!(matches!(result, Err(EngineError::OutOfRangeInput(m)) if m.contains("duplicate")));
    }

    #[test]
    fn test_negative_rain_rejected() {
        let result = DailySeries::from_observations(Zone::Aba, vec![obs(1, 9, 24.0, -0.1)]);
        assert!(matches!(result, Err(EngineError::OutOfRangeInput(_))));
    }

    #[test]
    fn test_humidity_out_of_range_rejected() {
        let mut bad = obs(1, 9, 24.0, 0.0);
        bad.humidity = 101.0;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_negative_wind_rejected() {
        let mut bad = obs(1, 9, 24.0, 0.0);
        bad.wind_speed = -1.0;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_mixed_zone_rejected() {
        let mut other = obs(1, 9, 24.0, 0.0);
        other.zone = Zone::Bende;
        let result = DailySeries::from_observations(Zone::Aba, vec![other]);
        assert!(result.is_err());
    }

    #[test]
    fn test_range_and_gaps() {
        let series = DailySeries::from_observations(
            Zone::Aba,
            vec![obs(1, 9, 24.0, 0.0), obs(4, 9, 24.0, 0.0), obs(5, 9, 24.0, 0.0)],
        )
        .unwrap();
        let from = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 5, 4).unwrap();
        assert_eq!(series.range(from, to).len(), 2);
        assert_eq!(series.gaps(from, to).len(), 2);
        assert_eq!(series.up_to(to).len(), 2);
        assert_eq!(series.years(), vec![2024]);
    }

    #[test]
    fn test_empty_series() {
        let series = DailySeries::from_observations(Zone::Bende, vec![]).unwrap();
        assert!(series.is_empty());
        assert_eq!(series.first_date(), None);
    }
}
