//! Integration tests for the `/export` endpoints.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, post_json, upload_text, wait_for_terminal};
use serde_json::json;

/// Upload a three-page text file, chunk it and wait for completion.
async fn chunked_file(app: axum::Router) -> String {
    let file_id = upload_text(app.clone(), "guide.txt", "One\u{000C}Two\u{000C}Three").await;
    let response = post_json(
        app.clone(),
        &format!("/api/v1/processing/chunk?file_id={file_id}"),
        json!({"chunk_method": "page"}),
    )
    .await;
    let task_id = body_json(response).await["data"]["task_id"]
        .as_str()
        .unwrap()
        .to_string();
    assert_eq!(wait_for_terminal(app, &task_id).await["status"], "completed");
    file_id
}

// ---------------------------------------------------------------------------
// Test: standard export lists every chunk in order
// ---------------------------------------------------------------------------

#[tokio::test]
async fn standard_export_contains_all_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = common::build_test_app(dir.path());
    let file_id = chunked_file(app.clone()).await;

    let response = post_json(
        app,
        &format!("/api/v1/export/json?file_id={file_id}"),
        json!({}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let data = &json["data"];
    assert_eq!(data["status"], "ready");
    assert_eq!(data["total_chunks"], 3);
    assert_eq!(data["config"]["schema_type"], "standard");
    assert_eq!(data["config"]["include_metadata"], true);

    let export = &data["export_data"];
    assert_eq!(export["filename"], "guide.txt");
    assert_eq!(export["total_chunks"], 3);
    let contents: Vec<&str> = export["chunks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["One", "Two", "Three"]);
    assert!(export["chunks"][0]["metadata"].is_object());
}

// ---------------------------------------------------------------------------
// Test: dify and elasticsearch layouts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dify_export_without_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = common::build_test_app(dir.path());
    let file_id = chunked_file(app.clone()).await;

    let response = post_json(
        app,
        &format!("/api/v1/export/json?file_id={file_id}"),
        json!({"schema_type": "dify", "include_metadata": false}),
    )
    .await;

    let json = body_json(response).await;
    let export = &json["data"]["export_data"];
    assert_eq!(export["file_info"]["filename"], "guide.txt");
    assert_eq!(export["chunks"][0]["text"], "One");
    assert_eq!(export["chunks"][0]["source"], "guide.txt");
    assert!(export["chunks"][0].get("metadata").is_none());
}

#[tokio::test]
async fn elasticsearch_export_titles_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = common::build_test_app(dir.path());
    let file_id = chunked_file(app.clone()).await;

    let response = post_json(
        app,
        &format!("/api/v1/export/json?file_id={file_id}"),
        json!({"schema_type": "elasticsearch"}),
    )
    .await;

    let json = body_json(response).await;
    let export = &json["data"]["export_data"];
    assert_eq!(export["index_name"], "smartrag_docs");
    assert_eq!(export["documents"][1]["title"], "guide.txt - Chunk 2");
    assert_eq!(export["documents"][1]["source_file"], "guide.txt");
}

#[tokio::test]
async fn unknown_schema_type_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = common::build_test_app(dir.path());
    let file_id = upload_text(app.clone(), "a.txt", "a").await;

    let response = post_json(
        app,
        &format!("/api/v1/export/json?file_id={file_id}"),
        json!({"schema_type": "parquet"}),
    )
    .await;

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn export_unknown_file_returns_404() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = common::build_test_app(dir.path());
    let uri = format!("/api/v1/export/json?file_id={}", uuid::Uuid::new_v4());

    let response = post_json(app, &uri, json!({})).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: download is served as an attachment
// ---------------------------------------------------------------------------

#[tokio::test]
async fn download_sets_attachment_header() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = common::build_test_app(dir.path());
    let file_id = chunked_file(app.clone()).await;

    let response = get(app, &format!("/api/v1/export/download/{file_id}")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-disposition").unwrap(),
        "attachment; filename=\"guide.txt_chunks.json\""
    );
    let json = body_json(response).await;
    assert_eq!(json["total_chunks"], 3);
    assert_eq!(json["file_id"], file_id.as_str());
}

// ---------------------------------------------------------------------------
// Test: schema listing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn schemas_lists_three_layouts() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = common::build_test_app(dir.path());

    let json = body_json(get(app, "/api/v1/export/schemas").await).await;
    let names: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["standard", "dify", "elasticsearch"]);
    assert!(json["data"][1]["fields"]
        .as_array()
        .unwrap()
        .contains(&json!("text")));
}
