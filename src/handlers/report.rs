//! Shared plumbing of the report download endpoints
//!
//! Every report kind exposes the same pair of routes: `.../download` queues a
//! render and answers with the polling URL, `.../download/file` returns the
//! newest finished render back.

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    Json,
};
use tracing::{error, info};

use crate::handlers::{bad_request, ApiError};
use crate::models::error::ErrorResponse;
use crate::models::report::{ReportRequest, ReportTicket, XLSX_CONTENT_TYPE};
use crate::services::report_dispatcher::DispatchError;
use crate::services::report_resolver::ResolveError;
use crate::AppState;

pub async fn request_report(
    state: &AppState,
    request: ReportRequest,
) -> Result<Json<ReportTicket>, ApiError> {
    let ticket = state
        .dispatcher
        .request_report(&request)
        .await
        .map_err(|e| match e {
            DispatchError::Validation(message) => bad_request(message),
            other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(
                    format!("Failed to queue report: {}", other),
                    "INTERNAL_ERROR",
                )),
            ),
        })?;

    Ok(Json(ticket))
}

pub async fn download_report(
    state: &AppState,
    request: ReportRequest,
) -> Result<(HeaderMap, Vec<u8>), ApiError> {
    request.range.validate().map_err(bad_request)?;

    let resolved = state.resolver.resolve(&request).await.map_err(|e| match e {
        ResolveError::NotFound => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(
                "Report not found, it may still be generating",
                "REPORT_NOT_READY",
            )),
        ),
        ResolveError::Io(e) => internal_error("Failed to look up report", e),
    })?;

    let bytes = tokio::fs::read(&resolved.path)
        .await
        .map_err(|e| internal_error("Failed to read report", e))?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(XLSX_CONTENT_TYPE));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", resolved.file_name))
            .map_err(|e| internal_error("Invalid report file name", e))?,
    );

    info!(file_name = %resolved.file_name, size = bytes.len(), "Serving report");

    Ok((headers, bytes))
}

fn internal_error(context: &str, e: impl std::fmt::Display) -> ApiError {
    error!(error = %e, "{}", context);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(
            format!("{}: {}", context, e),
            "INTERNAL_ERROR",
        )),
    )
}
