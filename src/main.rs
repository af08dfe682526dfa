// Agroweather API v0.1
use axum::{routing::get, Router};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod db;
mod errors;
mod helpers;
mod routes;
mod services;

use config::{AppConfig, EngineConfig};
use routes::AppState;

/// Maximum number of connections in the database pool.
const DB_POOL_MAX_CONNECTIONS: u32 = 5;
/// Minimum number of connections kept alive in the database pool.
const DB_POOL_MIN_CONNECTIONS: u32 = 2;

/// OpenAPI document for the Agroweather API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Agroweather API",
        version = "0.1.0",
        description = "Agronomic analytics over stored weather observations for the \
            Aba, Umuahia and Bende zones: rolling rainfall windows, drought and \
            waterlogging risk, growing degree day progress, rainy-season onset, \
            seasonal baselines and crop suitability.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Zones", description = "Zone coverage and statistics"),
        (name = "Crops", description = "Crop profiles and planting calendar"),
        (name = "Rainfall", description = "Rolling window aggregates"),
        (name = "Risk", description = "Drought and waterlogging risk"),
        (name = "GDD", description = "Growing degree days and maturity progress"),
        (name = "Onset", description = "Rainy-season onset detection"),
        (name = "Baseline", description = "Seasonality baseline and deviation"),
        (name = "Suitability", description = "Crop suitability scoring"),
    ),
    paths(
        routes::health::health_check,
        routes::zones::list_zones,
        routes::zones::list_crops,
        routes::zones::get_statistics,
        routes::risk::get_rainfall_window,
        routes::risk::get_risk,
        routes::risk::get_drought_frequency,
        routes::gdd::get_gdd_progress,
        routes::gdd::get_annual_gdd,
        routes::onset::get_onset,
        routes::baseline::get_baseline,
        routes::baseline::get_deviation,
        routes::suitability::get_zone_suitability,
        routes::suitability::get_crop_suitability,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::zones::ZoneSummary,
            routes::zones::CropListing,
            routes::zones::CropsResponse,
            routes::zones::StatisticsResponse,
            routes::risk::RiskResponse,
            routes::gdd::AnnualGddResponse,
            routes::onset::OnsetResponse,
            routes::baseline::BaselineResponse,
            routes::suitability::CropHarvestProjection,
            routes::suitability::ZoneSuitabilityResponse,
            routes::suitability::CropSuitabilityResponse,
            services::series::Zone,
            services::series::DailyField,
            services::window::Aggregation,
            services::window::RollingWindowResult,
            services::crops::CropProfile,
            services::crops::ValueRange,
            services::calendar::Season,
            services::calendar::PlantingStatus,
            services::climate::ZoneClimate,
            services::climate::ZoneStatistics,
            services::climate::AnnualMetrics,
            services::risk::RiskLevel,
            services::risk::AdvisoryBand,
            services::risk::AlertKind,
            services::risk::RiskAlert,
            services::risk::DailyRisk,
            services::risk::DroughtFrequency,
            services::risk::ConditionAdvisory,
            services::gdd::ProgressBand,
            services::gdd::GddProgress,
            services::gdd::CurvePoint,
            services::gdd::AnnualGddCurve,
            services::gdd::HarvestProjection,
            services::onset::OnsetEstimate,
            services::onset::TrendDirection,
            services::onset::OnsetTrend,
            services::baseline::BaselineDay,
            services::baseline::RainfallDeviation,
            services::baseline::TempDeviation,
            services::baseline::DayDeviation,
            services::baseline::DeviationReport,
            services::suitability::ComponentFit,
            services::suitability::ComponentComparison,
            services::suitability::SuitabilityCategory,
            services::suitability::SuitabilityVerdict,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing; LOG_FORMAT=json emits one JSON object per line
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agroweather_api=debug,tower_http=debug".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    let config = AppConfig::from_env().expect("Invalid application configuration");
    let engine = EngineConfig::load(&config).expect("Invalid engine configuration");
    tracing::info!(
        "Engine configured with {} crop profiles, {}-day GDD rate window",
        engine.crops.len(),
        engine.gdd.trailing_days
    );

    // Set up database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(DB_POOL_MAX_CONNECTIONS)
        .min_connections(DB_POOL_MIN_CONNECTIONS)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations completed");

    let app_state = AppState {
        pool: pool.clone(),
        engine: Arc::new(engine),
    };

    // CORS: read-only API, GET only
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET])
        .allow_headers(Any);

    let catalogue_routes = Router::new()
        .route("/api/v1/zones", get(routes::zones::list_zones))
        .route("/api/v1/crops", get(routes::zones::list_crops))
        .route(
            "/api/v1/zones/:zone/statistics",
            get(routes::zones::get_statistics),
        )
        .with_state(app_state.clone());

    let risk_routes = Router::new()
        .route(
            "/api/v1/zones/:zone/rainfall/window",
            get(routes::risk::get_rainfall_window),
        )
        .route("/api/v1/zones/:zone/risk", get(routes::risk::get_risk))
        .route(
            "/api/v1/zones/:zone/risk/drought-frequency",
            get(routes::risk::get_drought_frequency),
        )
        .with_state(app_state.clone());

    let season_routes = Router::new()
        .route(
            "/api/v1/zones/:zone/gdd/:crop",
            get(routes::gdd::get_gdd_progress),
        )
        .route(
            "/api/v1/zones/:zone/gdd/:crop/annual",
            get(routes::gdd::get_annual_gdd),
        )
        .route("/api/v1/zones/:zone/onset", get(routes::onset::get_onset))
        .route(
            "/api/v1/zones/:zone/baseline/:day_of_year",
            get(routes::baseline::get_baseline),
        )
        .route(
            "/api/v1/zones/:zone/deviation",
            get(routes::baseline::get_deviation),
        )
        .with_state(app_state.clone());

    let suitability_routes = Router::new()
        .route(
            "/api/v1/zones/:zone/suitability",
            get(routes::suitability::get_zone_suitability),
        )
        .route(
            "/api/v1/suitability/:crop",
            get(routes::suitability::get_crop_suitability),
        )
        .with_state(app_state);

    // Health check uses PgPool to verify DB connectivity
    let health_routes = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .with_state(pool);

    let app = Router::new()
        .merge(health_routes)
        .merge(catalogue_routes)
        .merge(risk_routes)
        .merge(season_routes)
        .merge(suitability_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
