//! Integration tests for the health check endpoint and general HTTP behaviour.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{body_json, get};
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Test: GET /health returns 200 with expected JSON fields
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_returns_ok_with_json() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = common::build_test_app(dir.path());
    let response = get(app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["store_healthy"], true);
}

// ---------------------------------------------------------------------------
// Test: Unknown route returns 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_route_returns_404() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = common::build_test_app(dir.path());
    let response = get(app, "/this-route-does-not-exist").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: x-request-id header is present in response
// ---------------------------------------------------------------------------

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = common::build_test_app(dir.path());
    let response = get(app, "/health").await;

    let request_id = response
        .headers()
        .get("x-request-id")
        .expect("Response must contain an x-request-id header");
    let id_str = request_id.to_str().unwrap();
    assert!(uuid::Uuid::parse_str(id_str).is_ok());
}

// ---------------------------------------------------------------------------
// Test: CORS preflight from the configured origin is allowed
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cors_preflight_allows_configured_origin() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = common::build_test_app(dir.path());
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/v1/processing/tasks")
        .header("origin", "http://localhost:3001")
        .header("access-control-request-method", "GET")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "http://localhost:3001"
    );
    // Subscribers are anonymous; credentials are never allowed.
    assert!(response
        .headers()
        .get("access-control-allow-credentials")
        .is_none());
    let allowed = response
        .headers()
        .get("access-control-allow-headers")
        .unwrap()
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    assert!(allowed.contains("content-type"));
    assert!(!allowed.contains("authorization"));
}

// ---------------------------------------------------------------------------
// Test: cross-origin responses expose the download filename and request id
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cors_exposes_download_and_request_id_headers() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = common::build_test_app(dir.path());
    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/v1/export/schemas")
        .header("origin", "http://localhost:3001")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    let exposed = response
        .headers()
        .get("access-control-expose-headers")
        .unwrap()
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    assert!(exposed.contains("content-disposition"));
    assert!(exposed.contains("x-request-id"));
}

// ---------------------------------------------------------------------------
// Test: connection stats start empty
// ---------------------------------------------------------------------------

#[tokio::test]
async fn connection_stats_start_empty() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = common::build_test_app(dir.path());
    let json = body_json(get(app, "/api/v1/ws/connections").await).await;

    assert_eq!(json["data"]["total_connections"], 0);
    assert_eq!(json["data"]["task_subscriptions"], serde_json::json!({}));
}
