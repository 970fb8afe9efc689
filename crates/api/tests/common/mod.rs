#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use smartrag_api::config::{LogFormat, ServerConfig};
use smartrag_api::router::build_app_router;
use smartrag_api::state::AppState;
use smartrag_db::MemoryStore;
use tower::ServiceExt;

pub const BOUNDARY: &str = "smartrag-test-boundary";

/// Build a test `ServerConfig` with safe defaults.
///
/// Uploads go to `upload_dir`; simulated chunking runs with a 5 ms pause
/// per unit so jobs finish quickly but still overlap with test actions.
pub fn test_config(upload_dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:3001".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        database_url: None,
        upload_dir: upload_dir.to_path_buf(),
        max_file_size: 1024,
        max_chunk_size: 1000,
        ws_outbound_buffer: 256,
        ws_heartbeat_secs: 30,
        chunk_unit_delay_ms: 5,
        log_format: LogFormat::Text,
    }
}

/// State and router over a fresh in-memory store.
pub fn build_test_app(upload_dir: &Path) -> (Router, AppState) {
    build_app_with_config(test_config(upload_dir))
}

pub fn build_app_with_config(config: ServerConfig) -> (Router, AppState) {
    let state = AppState::new(config.clone(), Arc::new(MemoryStore::new()));
    let app = build_app_router(state.clone(), &config);
    (app, state)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// One file part: (form field name, file name, content type, bytes).
pub type Part<'a> = (&'a str, &'a str, &'a str, &'a [u8]);

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for (field, filename, content_type, data) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn post_multipart(app: Router, uri: &str, parts: &[Part<'_>]) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Upload one text file and return its id.
pub async fn upload_text(app: Router, filename: &str, text: &str) -> String {
    let response = post_multipart(
        app,
        "/api/v1/upload/file",
        &[("file", filename, "text/plain", text.as_bytes())],
    )
    .await;
    assert_eq!(response.status(), 201);
    let json = body_json(response).await;
    json["data"]["id"].as_str().unwrap().to_string()
}

/// Poll a task until it reaches a terminal status and return its JSON.
pub async fn wait_for_terminal(app: Router, task_id: &str) -> serde_json::Value {
    let uri = format!("/api/v1/processing/task/{task_id}");
    for _ in 0..500 {
        let json = body_json(get(app.clone(), &uri).await).await;
        let status = json["data"]["status"].as_str().unwrap_or_default().to_string();
        if matches!(status.as_str(), "completed" | "failed" | "cancelled") {
            return json["data"].clone();
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("task {task_id} did not finish");
}

/// Poll a file record until it leaves `processing`.
pub async fn wait_for_file(app: Router, file_id: &str) -> serde_json::Value {
    let uri = format!("/api/v1/upload/files/{file_id}");
    for _ in 0..500 {
        let json = body_json(get(app.clone(), &uri).await).await;
        let status = json["data"]["status"].as_str().unwrap_or_default().to_string();
        if status != "processing" {
            return json["data"].clone();
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("file {file_id} stayed processing");
}
