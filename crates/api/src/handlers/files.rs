//! Handlers for the `/upload` resource.
//!
//! Uploaded bytes go to [`UploadStorage`](crate::storage::UploadStorage);
//! the metadata record goes to the file store.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use smartrag_core::error::CoreError;
use smartrag_core::file::{is_allowed_content_type, FileRecord};
use smartrag_core::types::FileId;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Used when the client sends a part without a `Content-Type`.
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// One file part read from a multipart body.
struct UploadPart {
    filename: String,
    content_type: String,
    data: axum::body::Bytes,
}

/// Outcome of one file in a batch upload.
#[derive(Debug, Serialize)]
pub struct BatchUploadItem {
    pub filename: String,
    /// `uploaded` or `failed`.
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<FileRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Read the next part that carries a file name. Plain form fields are skipped.
async fn next_file_part(multipart: &mut Multipart) -> AppResult<Option<UploadPart>> {
    while let Some(field) = multipart.next_field().await? {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field
            .content_type()
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string();
        let data = field.bytes().await?;
        return Ok(Some(UploadPart {
            filename,
            content_type,
            data,
        }));
    }
    Ok(None)
}

/// Validate and persist one uploaded file.
async fn store_upload(state: &AppState, part: UploadPart) -> AppResult<FileRecord> {
    if part.filename.trim().is_empty() {
        return Err(AppError::BadRequest("No file selected".into()));
    }
    if part.data.len() > state.config.max_file_size {
        return Err(AppError::PayloadTooLarge(format!(
            "File {} exceeds the limit of {} bytes",
            part.filename, state.config.max_file_size
        )));
    }
    if !is_allowed_content_type(&part.content_type) {
        return Err(CoreError::Validation(format!(
            "File type {} not supported",
            part.content_type
        ))
        .into());
    }

    let id = uuid::Uuid::new_v4();
    let stored = state.storage.save(id, &part.filename, &part.data).await?;
    let record = FileRecord::new(
        id,
        stored.filename,
        part.filename,
        stored.path.to_string_lossy(),
        i64::try_from(part.data.len()).unwrap_or(i64::MAX),
        part.content_type,
    );

    if let Err(e) = state.files.save_file(&record).await {
        if let Err(cleanup) = state.storage.remove(&record.file_path).await {
            tracing::warn!(file_id = %id, error = %cleanup, "Failed to remove orphaned upload");
        }
        return Err(e.into());
    }

    tracing::info!(
        file_id = %id,
        filename = %record.original_filename,
        size = record.file_size,
        "File uploaded",
    );
    Ok(record)
}

async fn find_file(state: &AppState, id: FileId) -> AppResult<FileRecord> {
    state
        .files
        .load_file(id)
        .await?
        .ok_or_else(|| CoreError::not_found("File", id).into())
}

/// Message of an upload error as the client sees it.
fn client_message(err: &AppError) -> String {
    match err {
        AppError::Core(
            CoreError::Transport(_) | CoreError::Upstream(_) | CoreError::Internal(_),
        )
        | AppError::InternalError(_) => "File upload failed".to_string(),
        AppError::Core(CoreError::Validation(msg))
        | AppError::BadRequest(msg)
        | AppError::PayloadTooLarge(msg) => msg.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

/// POST /api/v1/upload/file
///
/// Upload one document. Returns 201 with the new file record.
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let part = next_file_part(&mut multipart)
        .await?
        .ok_or_else(|| AppError::BadRequest("No file selected".into()))?;
    let record = store_upload(&state, part).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: record })))
}

/// POST /api/v1/upload/files
///
/// Upload several documents. Each file succeeds or fails on its own; the
/// response lists one outcome per file part.
pub async fn upload_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut results = Vec::new();

    while let Some(part) = next_file_part(&mut multipart).await? {
        let filename = part.filename.clone();
        let item = match store_upload(&state, part).await {
            Ok(record) => BatchUploadItem {
                filename,
                status: "uploaded",
                file: Some(record),
                error: None,
            },
            Err(e) => {
                tracing::debug!(filename = %filename, error = %e, "Batch item rejected");
                BatchUploadItem {
                    filename,
                    status: "failed",
                    file: None,
                    error: Some(client_message(&e)),
                }
            }
        };
        results.push(item);
    }

    if results.is_empty() {
        return Err(AppError::BadRequest("No file selected".into()));
    }
    Ok(Json(DataResponse { data: results }))
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

/// GET /api/v1/upload/files
pub async fn list_files(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let files = state.files.list_files().await?;
    Ok(Json(DataResponse { data: files }))
}

/// GET /api/v1/upload/files/{id}
pub async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<FileId>,
) -> AppResult<impl IntoResponse> {
    let file = find_file(&state, id).await?;
    Ok(Json(DataResponse { data: file }))
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

/// DELETE /api/v1/upload/files/{id}
///
/// Remove the record, its chunks and the stored bytes. Returns 204.
/// A file with a job in progress cannot be deleted (409).
pub async fn delete_file(
    State(state): State<AppState>,
    Path(id): Path<FileId>,
) -> AppResult<StatusCode> {
    let file = find_file(&state, id).await?;
    let subject_id = id.to_string();

    if state.jobs.is_active(&subject_id).await {
        return Err(CoreError::Conflict(format!("File {id} is being processed")).into());
    }

    let removed_chunks = state.chunks.delete_chunks(&subject_id).await?;
    if let Err(e) = state.storage.remove(&file.file_path).await {
        tracing::warn!(file_id = %id, error = %e, "Could not delete stored file");
    }
    state.files.delete_file(id).await?;

    tracing::info!(file_id = %id, removed_chunks, "File deleted");
    Ok(StatusCode::NO_CONTENT)
}
