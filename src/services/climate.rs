//! Long-run climate summaries for a zone.

use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use super::series::{DailyField, DailySeries, Zone};
use super::window::{rolling_window, Aggregation, WindowSpan};
use crate::errors::EngineError;

/// Long-run climate of a zone, as scored against crop tolerances.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ZoneClimate {
    pub zone: Zone,
    /// Mean of the daily (t_max + t_min) / 2, °C
    pub avg_temp: f64,
    pub avg_temp_max: f64,
    pub avg_temp_min: f64,
    /// Total rainfall scaled to 365 days over the record's calendar span, mm
    pub avg_annual_rainfall: f64,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub span_days: u32,
    pub days_observed: u32,
}

pub fn zone_climate(series: &DailySeries) -> Result<ZoneClimate, EngineError> {
    let (Some(first_date), Some(last_date)) = (series.first_date(), series.last_date()) else {
        return Err(EngineError::InsufficientData(format!(
            "{}: no observations",
            series.zone()
        )));
    };

    let records = series.records();
    let n = records.len() as f64;
    let span_days = ((last_date - first_date).num_days() + 1) as u32;
    let total_rain: f64 = records.iter().map(|r| r.precipitation_total).sum();

    Ok(ZoneClimate {
        zone: series.zone(),
        avg_temp: records.iter().map(|r| r.temp_avg()).sum::<f64>() / n,
        avg_temp_max: records.iter().map(|r| r.temp_max).sum::<f64>() / n,
        avg_temp_min: records.iter().map(|r| r.temp_min).sum::<f64>() / n,
        avg_annual_rainfall: total_rain * 365.0 / f64::from(span_days),
        first_date,
        last_date,
        span_days,
        days_observed: records.len() as u32,
    })
}

/// Summary panel for a zone as of a date.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ZoneStatistics {
    pub zone: Zone,
    pub as_of: NaiveDate,
    pub avg_temp: f64,
    /// Highest daily maximum on record, °C
    pub max_temp: f64,
    /// Lowest daily minimum on record, °C
    pub min_temp: f64,
    pub avg_humidity: f64,
    /// Rainfall over the 30 calendar days ending at as_of, mm
    pub rainfall_30d: f64,
    /// Rainfall over the 90 calendar days ending at as_of, mm
    pub rainfall_90d: f64,
    pub avg_daily_rainfall: f64,
    pub days_observed: u32,
}

/// Statistics over every record on or before `as_of`.
pub fn zone_statistics(
    series: &DailySeries,
    as_of: NaiveDate,
) -> Result<ZoneStatistics, EngineError> {
    let records = series.up_to(as_of);
    if records.is_empty() {
        return Err(EngineError::InsufficientData(format!(
            "{}: no observations on or before {}",
            series.zone(),
            as_of
        )));
    }
    let n = records.len() as f64;
    let rain_sum = |days| {
        rolling_window(
            series,
            DailyField::Precipitation,
            WindowSpan::Days(days),
            as_of,
            Aggregation::Sum,
        )
        .map(|r| r.value)
    };

    Ok(ZoneStatistics {
        zone: series.zone(),
        as_of,
        avg_temp: records.iter().map(|r| r.temp_avg()).sum::<f64>() / n,
        max_temp: records
            .iter()
            .map(|r| r.temp_max)
            .fold(f64::NEG_INFINITY, f64::max),
        min_temp: records
            .iter()
            .map(|r| r.temp_min)
            .fold(f64::INFINITY, f64::min),
        avg_humidity: records.iter().map(|r| r.humidity_avg).sum::<f64>() / n,
        rainfall_30d: rain_sum(30)?,
        rainfall_90d: rain_sum(90)?,
        avg_daily_rainfall: records.iter().map(|r| r.precipitation_total).sum::<f64>() / n,
        days_observed: records.len() as u32,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AnnualMetrics {
    pub year: i32,
    pub total_rainfall: f64,
    pub mean_temp: f64,
    pub days_observed: u32,
}

/// Rainfall total and mean temperature per calendar year.
pub fn annual_metrics(series: &DailySeries) -> Vec<AnnualMetrics> {
    series
        .years()
        .into_iter()
        .map(|year| {
            let records = series.year(year);
            let n = records.len() as f64;
            AnnualMetrics {
                year,
                total_rainfall: records.iter().map(|r| r.precipitation_total).sum(),
                mean_temp: records.iter().map(|r| r.temp_avg()).sum::<f64>() / n,
                days_observed: records.len() as u32,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use crate::services::test_support::{date, day, full_years, rain_series};

    #[test]
    fn test_zone_climate_scales_rainfall_to_a_year() {
        let series = rain_series(Zone::Aba, date(2024, 1, 1), &[2.0; 73]);
        let climate = zone_climate(&series).unwrap();
        assert_eq!(climate.span_days, 73);
        // 146 mm over 73 days = 730 mm/year
        assert!((climate.avg_annual_rainfall - 730.0).abs() < 1e-9);
        assert!((climate.avg_temp - 26.0).abs() < 1e-10);
    }

    #[test]
    fn test_zone_climate_uses_calendar_span_with_gaps() {
        let records = vec![
            day(Zone::Bende, date(2024, 1, 1), 30.0, 20.0, 100.0),
            day(Zone::Bende, date(2024, 12, 30), 30.0, 20.0, 100.0),
        ];
        let series = DailySeries::from_daily(Zone::Bende, records).unwrap();
        let climate = zone_climate(&series).unwrap();
        assert_eq!(climate.span_days, 365);
        assert!((climate.avg_annual_rainfall - 200.0).abs() < 1e-9);
        assert_eq!(climate.days_observed, 2);
    }

    #[test]
    fn test_zone_climate_empty() {
        let series = rain_series(Zone::Aba, date(2024, 1, 1), &[]);
        assert!(matches!(
            zone_climate(&series),
            Err(EngineError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_zone_statistics() {
        let mut rain = vec![1.0; 60];
        rain.extend(vec![2.0; 30]);
        let series = rain_series(Zone::Umuahia, date(2024, 1, 1), &rain);
        let stats = zone_statistics(&series, date(2024, 3, 30)).unwrap();
        assert_eq!(stats.days_observed, 90);
        assert!((stats.rainfall_30d - 60.0).abs() < 1e-9);
        assert!((stats.rainfall_90d - 120.0).abs() < 1e-9);
        assert_eq!(stats.max_temp, 30.0);
        assert_eq!(stats.min_temp, 22.0);
        assert!((stats.avg_daily_rainfall - 120.0 / 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_zone_statistics_before_data() {
        let series = rain_series(Zone::Aba, date(2024, 1, 1), &[1.0]);
        assert!(zone_statistics(&series, date(2023, 1, 1)).is_err());
    }

    #[test]
    fn test_annual_metrics() {
        let series = full_years(Zone::Aba, &[2022, 2023], |d| {
            if d.year() == 2022 {
                (30.0, 20.0, 1.0)
            } else {
                (32.0, 22.0, 2.0)
            }
        });
        let metrics = annual_metrics(&series);
        assert_eq!(metrics.len(), 2);
        assert!((metrics[0].total_rainfall - 365.0).abs() < 1e-9);
        assert!((metrics[1].total_rainfall - 730.0).abs() < 1e-9);
        assert!((metrics[1].mean_temp - 27.0).abs() < 1e-10);
    }
}
