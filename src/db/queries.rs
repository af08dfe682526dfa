use sqlx::PgPool;

use super::models::{ObservationRow, ZoneCoverage};

/// All observations for a zone, oldest first.
pub async fn get_zone_observations(
    pool: &PgPool,
    zone: &str,
) -> Result<Vec<ObservationRow>, sqlx::Error> {
    sqlx::query_as::<_, ObservationRow>(
        "SELECT id, zone, observed_at, temp_current_c, temp_max_c, temp_min_c,
                humidity_pct, precipitation_mm, wind_speed_ms, pressure_hpa, created_at
         FROM observations
         WHERE zone = $1
         ORDER BY observed_at",
    )
    .bind(zone)
    .fetch_all(pool)
    .await
}

/// Observation counts and date coverage per zone.
pub async fn get_zone_coverage(pool: &PgPool) -> Result<Vec<ZoneCoverage>, sqlx::Error> {
    sqlx::query_as::<_, ZoneCoverage>(
        "SELECT zone,
                COUNT(*) AS observations,
                MIN(observed_at) AS first_observed,
                MAX(observed_at) AS last_observed
         FROM observations
         GROUP BY zone
         ORDER BY zone",
    )
    .fetch_all(pool)
    .await
}
