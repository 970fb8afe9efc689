//! Integration tests for the `/processing` endpoints.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, delete, get, post_json, post_multipart, upload_text, wait_for_file,
    wait_for_terminal,
};
use serde_json::json;
use smartrag_api::state::AppState;

const TWO_PAGES: &str = "Page one text\u{000C}Page two text";

async fn start(app: axum::Router, file_id: &str, config: serde_json::Value) -> serde_json::Value {
    let response = post_json(
        app,
        &format!("/api/v1/processing/chunk?file_id={file_id}"),
        config,
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    body_json(response).await["data"].clone()
}

async fn upload_pdf(app: axum::Router) -> String {
    let response = post_multipart(
        app,
        "/api/v1/upload/file",
        &[("file", "scan.pdf", "application/pdf", b"%PDF-1.4")],
    )
    .await;
    body_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn wait_released(state: &AppState, file_id: &str) {
    for _ in 0..500 {
        if !state.jobs.is_active(file_id).await {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    panic!("file {file_id} was not released");
}

// ---------------------------------------------------------------------------
// Test: chunking a text file completes and the chunks can be previewed
// ---------------------------------------------------------------------------

#[tokio::test]
async fn chunk_text_file_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = common::build_test_app(dir.path());
    let file_id = upload_text(app.clone(), "doc.txt", TWO_PAGES).await;

    let started = start(app.clone(), &file_id, json!({"chunk_method": "page"})).await;
    assert_eq!(started["file_id"], file_id.as_str());
    assert_eq!(started["status"], "processing");
    assert_eq!(started["message"], "Processing started");
    assert_eq!(started["config"]["chunk_size"], 500);
    assert_eq!(started["config"]["chunk_overlap"], 50);
    assert_eq!(started["config"]["chunk_method"], "page");

    let task_id = started["task_id"].as_str().unwrap();
    let task = wait_for_terminal(app.clone(), task_id).await;
    assert_eq!(task["status"], "completed");
    assert_eq!(task["progress"], 100.0);
    assert_eq!(task["subject_id"], file_id.as_str());
    assert!(task["started_at"].is_string());
    assert!(task["completed_at"].is_string());

    let file = wait_for_file(app.clone(), &file_id).await;
    assert_eq!(file["status"], "completed");
    assert_eq!(file["chunks_count"], 2);

    let preview = body_json(get(app, &format!("/api/v1/processing/preview/{file_id}")).await).await;
    let data = &preview["data"];
    assert_eq!(data["total_chunks"], 2);
    assert_eq!(data["chunks"][0]["chunk_index"], 0);
    assert_eq!(data["chunks"][0]["content"], "Page one text");
    assert_eq!(data["chunks"][1]["chunk_index"], 1);
    assert_eq!(data["chunks"][1]["content"], "Page two text");
    assert_eq!(data["chunks"][1]["html_content"], "<p>Page two text</p>");
}

// ---------------------------------------------------------------------------
// Test: re-chunking replaces the previous chunks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rechunking_replaces_previous_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let (app, state) = common::build_test_app(dir.path());
    let file_id = upload_text(app.clone(), "doc.txt", TWO_PAGES).await;

    let first = start(app.clone(), &file_id, json!({"chunk_method": "page"})).await;
    wait_for_terminal(app.clone(), first["task_id"].as_str().unwrap()).await;
    wait_released(&state, &file_id).await;

    let second = start(app.clone(), &file_id, json!({"chunk_method": "page"})).await;
    let task = wait_for_terminal(app.clone(), second["task_id"].as_str().unwrap()).await;
    assert_eq!(task["status"], "completed");

    let preview = body_json(get(app, &format!("/api/v1/processing/preview/{file_id}")).await).await;
    assert_eq!(preview["data"]["total_chunks"], 2);
}

// ---------------------------------------------------------------------------
// Test: request validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn chunking_unknown_file_returns_404() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = common::build_test_app(dir.path());
    let uri = format!("/api/v1/processing/chunk?file_id={}", uuid::Uuid::new_v4());

    let response = post_json(app, &uri, json!({})).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_chunk_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = common::build_test_app(dir.path());
    let file_id = upload_text(app.clone(), "doc.txt", TWO_PAGES).await;
    let uri = format!("/api/v1/processing/chunk?file_id={file_id}");

    let overlap = post_json(
        app.clone(),
        &uri,
        json!({"chunk_size": 100, "chunk_overlap": 100}),
    )
    .await;
    assert_eq!(overlap.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(overlap).await["code"], "VALIDATION_ERROR");

    let too_big = post_json(app.clone(), &uri, json!({"chunk_size": 5000})).await;
    assert_eq!(too_big.status(), StatusCode::BAD_REQUEST);

    // Nothing was started, so the file is untouched.
    let file = body_json(get(app, &format!("/api/v1/upload/files/{file_id}")).await).await;
    assert_eq!(file["data"]["status"], "uploaded");
}

#[tokio::test]
async fn second_start_while_running_is_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = common::build_test_app(dir.path());
    let file_id = upload_pdf(app.clone()).await;

    let started = start(app.clone(), &file_id, json!({})).await;
    let response = post_json(
        app.clone(),
        &format!("/api/v1/processing/chunk?file_id={file_id}"),
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    wait_for_terminal(app, started["task_id"].as_str().unwrap()).await;
}

// ---------------------------------------------------------------------------
// Test: task lookup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_task_returns_404() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = common::build_test_app(dir.path());
    let uri = format!("/api/v1/processing/task/{}", uuid::Uuid::new_v4());

    let response = get(app.clone(), &uri).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = delete(app, &uri).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_tasks_is_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = common::build_test_app(dir.path());
    let a = upload_text(app.clone(), "a.txt", "alpha").await;
    let b = upload_text(app.clone(), "b.txt", "beta").await;

    let first = start(app.clone(), &a, json!({})).await;
    let second = start(app.clone(), &b, json!({})).await;
    wait_for_terminal(app.clone(), first["task_id"].as_str().unwrap()).await;
    wait_for_terminal(app.clone(), second["task_id"].as_str().unwrap()).await;

    let json = body_json(get(app, "/api/v1/processing/tasks").await).await;
    let ids: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap())
        .collect();
    assert_eq!(
        ids,
        vec![
            second["task_id"].as_str().unwrap(),
            first["task_id"].as_str().unwrap()
        ]
    );
}

// ---------------------------------------------------------------------------
// Test: cancelling a running task
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancel_running_task_marks_task_and_file() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = common::build_test_app(dir.path());
    let file_id = upload_pdf(app.clone()).await;

    let started = start(app.clone(), &file_id, json!({})).await;
    let task_id = started["task_id"].as_str().unwrap();

    let response = delete(app.clone(), &format!("/api/v1/processing/task/{task_id}")).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(body_json(response).await["data"]["id"], task_id);

    let task = wait_for_terminal(app.clone(), task_id).await;
    assert_eq!(task["status"], "cancelled");

    let file = wait_for_file(app, &file_id).await;
    assert_eq!(file["status"], "failed");
    assert_eq!(file["error_message"], "Processing cancelled");
}

#[tokio::test]
async fn cancel_completed_task_is_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = common::build_test_app(dir.path());
    let file_id = upload_text(app.clone(), "doc.txt", TWO_PAGES).await;

    let started = start(app.clone(), &file_id, json!({})).await;
    let task_id = started["task_id"].as_str().unwrap();
    wait_for_terminal(app.clone(), task_id).await;

    let response = delete(app, &format!("/api/v1/processing/task/{task_id}")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "INVALID_TRANSITION");
}
