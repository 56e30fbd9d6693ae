mod common;

use agrimarket_backend::models::report::XLSX_CONTENT_TYPE;
use agrimarket_backend::router;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use crate::common::TestApp;

const COMMODITY: &str = "00000000-0000-0000-0000-0000000000c1";
const LOCATION: &str = "00000000-0000-0000-0000-000000000011";

fn app_router(app: &TestApp) -> Router {
    router(app.state.clone())
}

async fn send(app: &TestApp, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app_router(app).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, json)
}

async fn create_price(app: &TestApp, value: f64) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/prices",
        Some(json!({
            "commodity_id": COMMODITY,
            "location_id": LOCATION,
            "value": value,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

#[tokio::test]
async fn test_create_and_get_price() {
    let app = TestApp::new().await;
    let created = create_price(&app, 12500.25).await;
    let id = created["id"].as_str().unwrap();

    let (status, body) = send(&app, Method::GET, &format!("/api/prices/{}", id), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["commodity_id"], COMMODITY);
    assert_eq!(body["location_id"], LOCATION);
}

#[tokio::test]
async fn test_update_price_extends_history() {
    let app = TestApp::new().await;
    let created = create_price(&app, 12500.25).await;
    let id = created["id"].as_str().unwrap();

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/prices/{}", id),
        Some(json!({ "value": 13000.75 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/prices/history/{}/{}", COMMODITY, LOCATION),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["current"], false);
    assert_eq!(data[1]["current"], true);
}

#[tokio::test]
async fn test_update_unknown_price_is_not_found() {
    let app = TestApp::new().await;

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/prices/{}", Uuid::new_v4()),
        Some(json!({ "value": 10.5 })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_duplicate_price_conflicts() {
    let app = TestApp::new().await;
    create_price(&app, 12500.25).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/prices",
        Some(json!({
            "commodity_id": COMMODITY,
            "location_id": LOCATION,
            "value": 99.5,
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_EXISTS");
}

#[tokio::test]
async fn test_delete_and_restore_price() {
    let app = TestApp::new().await;
    let created = create_price(&app, 12500.25).await;
    let id = created["id"].as_str().unwrap();

    let (status, _) = send(&app, Method::DELETE, &format!("/api/prices/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, &format!("/api/prices/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::POST, &format!("/api/prices/{}/restore", id), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::GET, &format!("/api/prices/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_list_prices_rejects_oversized_limit() {
    let app = TestApp::new().await;

    let (status, body) = send(&app, Method::GET, "/api/prices?page=1&limit=500", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_list_prices_defaults() {
    let app = TestApp::new().await;
    create_price(&app, 12500.25).await;

    let (status, body) = send(&app, Method::GET, "/api/prices", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], 1);
    assert_eq!(body["limit"], 10);
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn test_download_request_returns_polling_url() {
    let app = TestApp::new().await;

    let (status, body) = send(
        &app,
        Method::GET,
        &format!(
            "/api/prices/history/{}/{}/download?start_date=2023-10-26&end_date=2023-10-27",
            COMMODITY, LOCATION
        ),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("check back later"));
    assert!(body["download_url"]
        .as_str()
        .unwrap()
        .ends_with("/download/file?start_date=2023-10-26&end_date=2023-10-27"));
    assert_eq!(app.publisher.published().len(), 1);
}

#[tokio::test]
async fn test_download_request_with_inverted_range() {
    let app = TestApp::new().await;

    let (status, body) = send(
        &app,
        Method::GET,
        &format!(
            "/api/prices/history/{}/{}/download?start_date=2023-10-27&end_date=2023-10-26",
            COMMODITY, LOCATION
        ),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(app.publisher.published().is_empty());
}

#[tokio::test]
async fn test_download_request_broker_down() {
    let app = TestApp::with_failing_publisher().await;

    let (status, body) = send(
        &app,
        Method::GET,
        &format!(
            "/api/prices/history/{}/{}/download?start_date=2023-10-26&end_date=2023-10-27",
            COMMODITY, LOCATION
        ),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "INTERNAL_ERROR");
}

#[tokio::test]
async fn test_file_not_ready_then_served() {
    let app = TestApp::new().await;
    create_price(&app, 12500.25).await;

    let file_uri = format!(
        "/api/prices/history/{}/{}/download/file?start_date=2023-10-26&end_date=2023-10-27",
        COMMODITY, LOCATION
    );

    let (status, body) = send(&app, Method::GET, &file_uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "REPORT_NOT_READY");

    send(
        &app,
        Method::GET,
        &file_uri.replace("/download/file", "/download"),
        None,
    )
    .await;
    app.run_published_jobs().await;

    let response = app_router(&app)
        .oneshot(Request::builder().uri(&file_uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], XLSX_CONTENT_TYPE);

    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"price_history_"));
    assert!(disposition.ends_with(".xlsx\""));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(bytes.starts_with(b"PK"));
}

#[tokio::test]
async fn test_harvest_endpoints() {
    let app = TestApp::new().await;
    let land_commodity = Uuid::new_v4();

    let (status, created) = send(
        &app,
        Method::POST,
        "/api/harvests",
        Some(json!({
            "land_commodity_id": land_commodity,
            "harvest_date": "2023-03-15",
            "quantity": 1250.5,
            "unit": "kg",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let list_uri = format!("/api/land-commodities/{}/harvests", land_commodity);
    let (status, body) = send(&app, Method::GET, &list_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("{}/download?start_date=2023-01-01&end_date=2023-06-30", list_uri),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["download_url"]
        .as_str()
        .unwrap()
        .contains("/harvests/download/file?"));

    let id = created["id"].as_str().unwrap();
    let (status, _) = send(&app, Method::DELETE, &format!("/api/harvests/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send(&app, Method::GET, &list_uri, None).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_invalid_harvest_is_rejected() {
    let app = TestApp::new().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/harvests",
        Some(json!({
            "land_commodity_id": Uuid::new_v4(),
            "harvest_date": "2023-03-15",
            "quantity": 0,
            "unit": "kg",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_download_with_missing_or_malformed_dates() {
    let app = TestApp::new().await;
    let base = format!("/api/prices/history/{}/{}", COMMODITY, LOCATION);

    for uri in [
        format!("{}/download?start_date=2023-10-26", base),
        format!("{}/download?start_date=2023-13-45&end_date=2023-10-27", base),
        format!("{}/download/file?start_date=yesterday&end_date=2023-10-27", base),
        format!(
            "/api/land-commodities/{}/harvests/download",
            Uuid::new_v4()
        ),
    ] {
        let (status, body) = send(&app, Method::GET, &uri, None).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["code"], "VALIDATION_ERROR", "{}", uri);
        assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
    }

    assert!(app.publisher.published().is_empty());
}

#[tokio::test]
async fn test_list_with_malformed_pagination() {
    let app = TestApp::new().await;

    let (status, body) = send(&app, Method::GET, "/api/prices?page=first", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}
