// src/lib.rs

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use services::{
    harvest::HarvestService, price_revision::PriceService, report_dispatcher::ReportDispatcher,
    report_resolver::ReportResolver,
};

#[derive(Clone)]
pub struct AppState {
    pub prices: PriceService,
    pub harvests: HarvestService,
    pub dispatcher: Arc<ReportDispatcher>,
    pub resolver: Arc<ReportResolver>,
}

pub mod entities {
    pub mod prelude;
    pub mod harvests;
    pub mod price_histories;
    pub mod prices;
}

pub mod services {
    pub mod amqp;
    pub mod cache;
    pub mod harvest;
    pub mod price_revision;
    pub mod report_dispatcher;
    pub mod report_renderer;
    pub mod report_resolver;
    pub mod report_worker;
    pub mod unit_of_work;
}

pub mod config;
pub mod error;
pub mod models;
pub mod handlers;
pub mod jobs;

/// API routes, without middleware
pub fn router(state: AppState) -> Router {
    use handlers::{harvest, price};

    Router::new()
        .route("/api/prices", get(price::list_prices).post(price::create_price))
        .route(
            "/api/prices/{id}",
            get(price::get_price)
                .put(price::update_price)
                .delete(price::delete_price),
        )
        .route("/api/prices/{id}/restore", post(price::restore_price))
        .route(
            "/api/prices/history/{commodity_id}/{location_id}",
            get(price::get_price_history),
        )
        .route(
            "/api/prices/history/{commodity_id}/{location_id}/download",
            get(price::request_price_history_report),
        )
        .route(
            "/api/prices/history/{commodity_id}/{location_id}/download/file",
            get(price::download_price_history_report),
        )
        .route("/api/harvests", post(harvest::create_harvest))
        .route("/api/harvests/{id}", delete(harvest::delete_harvest))
        .route(
            "/api/land-commodities/{land_commodity_id}/harvests",
            get(harvest::list_harvests),
        )
        .route(
            "/api/land-commodities/{land_commodity_id}/harvests/download",
            get(harvest::request_harvest_report),
        )
        .route(
            "/api/land-commodities/{land_commodity_id}/harvests/download/file",
            get(harvest::download_harvest_report),
        )
        .with_state(state)
}
