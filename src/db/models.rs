use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

/// One stored hourly observation, as written by the acquisition job.
#[derive(Debug, Clone, FromRow)]
#[allow(dead_code)] // All fields populated by FromRow; id and created_at are not used by the engine
pub struct ObservationRow {
    pub id: Uuid,
    pub zone: String,
    pub observed_at: DateTime<Utc>,
    pub temp_current_c: Decimal,
    pub temp_max_c: Decimal,
    pub temp_min_c: Decimal,
    pub humidity_pct: Decimal,
    pub precipitation_mm: Decimal,
    pub wind_speed_ms: Decimal,
    pub pressure_hpa: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

/// Observation count and coverage for one zone.
#[derive(Debug, Clone, FromRow)]
pub struct ZoneCoverage {
    pub zone: String,
    pub observations: i64,
    pub first_observed: Option<DateTime<Utc>>,
    pub last_observed: Option<DateTime<Utc>>,
}
