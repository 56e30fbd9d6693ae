pub mod harvest;
pub mod price;
pub mod report;

use axum::{extract::rejection::QueryRejection, http::StatusCode, Json};
use tracing::error;

use crate::error::ServiceError;
use crate::models::error::ErrorResponse;

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(message, "VALIDATION_ERROR")),
    )
}

/// Malformed or missing query parameters, in the error envelope
pub fn query_rejection(rejection: QueryRejection) -> ApiError {
    bad_request(rejection.body_text())
}

/// Maps a service failure to status and error envelope
pub fn service_error(err: ServiceError) -> ApiError {
    match err {
        ServiceError::NotFound(_) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(err.to_string(), "NOT_FOUND")),
        ),
        ServiceError::AlreadyExists(_) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse::new(err.to_string(), "ALREADY_EXISTS")),
        ),
        ServiceError::Validation(message) => bad_request(message),
        ServiceError::Database(ref e) => {
            error!(error = %e, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(
                    format!("Database error: {}", e),
                    "INTERNAL_ERROR",
                )),
            )
        }
        ServiceError::CacheInvalidation { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(
                err.to_string(),
                "CACHE_INVALIDATION_FAILED",
            )),
        ),
    }
}
