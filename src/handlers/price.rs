//! Price handlers
//!
//! CRUD over live prices, the revision history of a commodity/location pair
//! and the price history report download.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::info;
use uuid::Uuid;

use crate::handlers::{bad_request, query_rejection, report, service_error, ApiError};
use crate::models::price::{
    CreatePriceRequest, PaginationQuery, PriceHistoryResponse, PricePage, PriceResponse,
    UpdatePriceRequest,
};
use crate::models::report::{DownloadQuery, ReportRequest, ReportTarget, ReportTicket};
use crate::AppState;

/// GET /api/prices
pub async fn list_prices(
    State(state): State<AppState>,
    query: Result<Query<PaginationQuery>, QueryRejection>,
) -> Result<Json<PricePage>, ApiError> {
    let Query(query) = query.map_err(query_rejection)?;
    let (page, limit) = query.validate().map_err(bad_request)?;

    let result = state
        .prices
        .list_prices(page, limit)
        .await
        .map_err(service_error)?;

    Ok(Json(result))
}

/// POST /api/prices
///
/// # Response
/// - 201: Created price
/// - 409: A live price already exists for the pair
pub async fn create_price(
    State(state): State<AppState>,
    Json(body): Json<CreatePriceRequest>,
) -> Result<(StatusCode, Json<PriceResponse>), ApiError> {
    let created = state
        .prices
        .create_price(body.commodity_id, body.location_id, body.value)
        .await
        .map_err(service_error)?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// GET /api/prices/{id}
pub async fn get_price(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PriceResponse>, ApiError> {
    let price = state.prices.get_price(id).await.map_err(service_error)?;
    Ok(Json(price))
}

/// PUT /api/prices/{id}
///
/// Archives the current value before applying the new one.
pub async fn update_price(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdatePriceRequest>,
) -> Result<Json<PriceResponse>, ApiError> {
    info!(price_id = %id, value = %body.value, "Updating price");

    let updated = state
        .prices
        .update_price(id, body.value)
        .await
        .map_err(service_error)?;

    Ok(Json(updated.into()))
}

/// DELETE /api/prices/{id}
pub async fn delete_price(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.prices.delete_price(id).await.map_err(service_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/prices/{id}/restore
pub async fn restore_price(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PriceResponse>, ApiError> {
    let restored = state.prices.restore_price(id).await.map_err(service_error)?;
    Ok(Json(restored.into()))
}

/// GET /api/prices/history/{commodity_id}/{location_id}
///
/// Archived snapshots oldest first; the live price is the last entry.
pub async fn get_price_history(
    State(state): State<AppState>,
    Path((commodity_id, location_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<PriceHistoryResponse>, ApiError> {
    let data = state
        .prices
        .get_price_history(commodity_id, location_id)
        .await
        .map_err(service_error)?;

    Ok(Json(PriceHistoryResponse {
        commodity_id,
        location_id,
        data,
    }))
}

/// GET /api/prices/history/{commodity_id}/{location_id}/download
pub async fn request_price_history_report(
    State(state): State<AppState>,
    Path((commodity_id, location_id)): Path<(Uuid, Uuid)>,
    query: Result<Query<DownloadQuery>, QueryRejection>,
) -> Result<Json<ReportTicket>, ApiError> {
    let Query(range) = query.map_err(query_rejection)?;
    report::request_report(&state, price_history_request(commodity_id, location_id, range)).await
}

/// GET /api/prices/history/{commodity_id}/{location_id}/download/file
///
/// # Response
/// - 200: The newest rendered workbook
/// - 404: Not rendered yet, or never requested
pub async fn download_price_history_report(
    State(state): State<AppState>,
    Path((commodity_id, location_id)): Path<(Uuid, Uuid)>,
    query: Result<Query<DownloadQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(range) = query.map_err(query_rejection)?;
    report::download_report(&state, price_history_request(commodity_id, location_id, range)).await
}

fn price_history_request(
    commodity_id: Uuid,
    location_id: Uuid,
    range: DownloadQuery,
) -> ReportRequest {
    ReportRequest::new(
        ReportTarget::PriceHistory {
            commodity_id,
            location_id,
        },
        range,
    )
}
