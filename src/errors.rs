use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Standard error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
}

/// Recoverable failures of the analytics engine.
///
/// Every engine operation reports these as values; none of them is fatal and
/// data gaps are never raised as errors on their own.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// Too few observations in the requested window or range.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// A rate computation hit a zero or negative denominator.
    #[error("Division undefined: {0}")]
    DivisionUndefined(String),

    /// Unknown crop name, or a profile whose values cannot be used.
    #[error("Invalid crop profile: {0}")]
    InvalidCropProfile(String),

    /// Input outside its physical domain or badly ordered.
    #[error("Out of range input: {0}")]
    OutOfRangeInput(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::DatabaseError(err) => {
                tracing::error!("Database error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal database error".to_string(),
                )
            }
        };

        (status, axum::Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidCropProfile(_) => AppError::NotFound(err.to_string()),
            EngineError::OutOfRangeInput(_) => AppError::BadRequest(err.to_string()),
            EngineError::InsufficientData(_) | EngineError::DivisionUndefined(_) => {
                AppError::Unprocessable(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_crop_maps_to_not_found() {
        let err: AppError = EngineError::InvalidCropProfile("millet".to_string()).into();
        assert!(matches!(err, AppError::NotFound(ref m) if m.contains("millet")));
    }

    #[test]
    fn test_out_of_range_maps_to_bad_request() {
        let err: AppError = EngineError::OutOfRangeInput("humidity 140".to_string()).into();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_insufficient_data_maps_to_unprocessable() {
        let err: AppError = EngineError::InsufficientData("empty window".to_string()).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_division_undefined_maps_to_unprocessable() {
        let err: AppError = EngineError::DivisionUndefined("zero rate".to_string()).into();
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
