//! Harvest handlers

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::handlers::{bad_request, query_rejection, report, service_error, ApiError};
use crate::models::harvest::{CreateHarvestRequest, HarvestPage, HarvestResponse};
use crate::models::price::PaginationQuery;
use crate::models::report::{DownloadQuery, ReportRequest, ReportTarget, ReportTicket};
use crate::AppState;

/// POST /api/harvests
pub async fn create_harvest(
    State(state): State<AppState>,
    Json(body): Json<CreateHarvestRequest>,
) -> Result<(StatusCode, Json<HarvestResponse>), ApiError> {
    let created = state
        .harvests
        .create_harvest(body)
        .await
        .map_err(service_error)?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// DELETE /api/harvests/{id}
pub async fn delete_harvest(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.harvests.delete_harvest(id).await.map_err(service_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/land-commodities/{land_commodity_id}/harvests
pub async fn list_harvests(
    State(state): State<AppState>,
    Path(land_commodity_id): Path<Uuid>,
    query: Result<Query<PaginationQuery>, QueryRejection>,
) -> Result<Json<HarvestPage>, ApiError> {
    let Query(query) = query.map_err(query_rejection)?;
    let (page, limit) = query.validate().map_err(bad_request)?;

    let result = state
        .harvests
        .list_harvests(land_commodity_id, page, limit)
        .await
        .map_err(service_error)?;

    Ok(Json(result))
}

/// GET /api/land-commodities/{land_commodity_id}/harvests/download
pub async fn request_harvest_report(
    State(state): State<AppState>,
    Path(land_commodity_id): Path<Uuid>,
    query: Result<Query<DownloadQuery>, QueryRejection>,
) -> Result<Json<ReportTicket>, ApiError> {
    let Query(range) = query.map_err(query_rejection)?;
    report::request_report(&state, harvest_request(land_commodity_id, range)).await
}

/// GET /api/land-commodities/{land_commodity_id}/harvests/download/file
pub async fn download_harvest_report(
    State(state): State<AppState>,
    Path(land_commodity_id): Path<Uuid>,
    query: Result<Query<DownloadQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(range) = query.map_err(query_rejection)?;
    report::download_report(&state, harvest_request(land_commodity_id, range)).await
}

fn harvest_request(land_commodity_id: Uuid, range: DownloadQuery) -> ReportRequest {
    ReportRequest::new(ReportTarget::Harvest { land_commodity_id }, range)
}
