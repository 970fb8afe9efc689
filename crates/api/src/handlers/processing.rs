//! Handlers for the `/processing` resource.
//!
//! Chunking jobs are keyed by the file id (as a string subject). Progress
//! is pushed over the WebSocket; these endpoints start, inspect and cancel
//! jobs and read back the chunks they produced.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use smartrag_core::chunk::{Chunk, ChunkConfig};
use smartrag_core::error::CoreError;
use smartrag_core::file::FileStatus;
use smartrag_core::types::{FileId, TaskId};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// `?file_id=` query parameter.
#[derive(Debug, Deserialize)]
pub struct FileQuery {
    pub file_id: FileId,
}

#[derive(Debug, Serialize)]
pub struct ChunkingStarted {
    pub task_id: TaskId,
    pub file_id: FileId,
    pub config: ChunkConfig,
    pub status: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ChunkPreview {
    pub file_id: FileId,
    pub total_chunks: usize,
    pub chunks: Vec<Chunk>,
}

// ---------------------------------------------------------------------------
// Start
// ---------------------------------------------------------------------------

/// POST /api/v1/processing/chunk?file_id={id}
///
/// Start chunking a file. Chunks from an earlier run are replaced. Returns
/// 202 immediately; progress arrives as `task_update` messages for the
/// returned task id.
pub async fn start_chunking(
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
    Json(config): Json<ChunkConfig>,
) -> AppResult<impl IntoResponse> {
    config.check(state.config.max_chunk_size)?;

    let file_id = query.file_id;
    let file = state
        .files
        .load_file(file_id)
        .await?
        .ok_or_else(|| CoreError::not_found("File", file_id))?;

    if state.jobs.is_active(&file_id.to_string()).await {
        return Err(CoreError::Conflict(format!(
            "File {file_id} already has a job in progress"
        ))
        .into());
    }

    // Marked before the job exists so the job's own outcome is never
    // overwritten by this handler.
    state
        .files
        .set_file_status(file_id, FileStatus::Processing, None, None)
        .await?;

    let task_id = match state
        .jobs
        .start_job_replacing(&file_id.to_string(), config.to_value())
        .await
    {
        Ok(id) => id,
        Err(e) => {
            if !matches!(e, CoreError::Conflict(_)) {
                let message = e.to_string();
                if let Err(reset) = state
                    .files
                    .set_file_status(file_id, FileStatus::Failed, None, Some(&message))
                    .await
                {
                    tracing::warn!(file_id = %file_id, error = %reset, "Failed to mark file failed");
                }
            }
            return Err(e.into());
        }
    };

    tracing::info!(
        task_id = %task_id,
        file_id = %file_id,
        filename = %file.original_filename,
        chunk_method = %config.chunk_method,
        "Chunking started",
    );

    let body = ChunkingStarted {
        task_id,
        file_id,
        config,
        status: "processing",
        message: "Processing started",
    };
    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: body })))
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// GET /api/v1/processing/task/{id}
pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
) -> AppResult<impl IntoResponse> {
    let task = state.jobs.get_status(task_id).await?;
    Ok(Json(DataResponse { data: task }))
}

/// DELETE /api/v1/processing/task/{id}
///
/// Request cancellation. A running job stops at its next unit boundary, so
/// the returned snapshot may still read `running`. Cancelling a finished
/// task is a 409.
pub async fn cancel_task(
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
) -> AppResult<impl IntoResponse> {
    state.jobs.cancel(task_id).await?;
    let task = state.jobs.get_status(task_id).await?;

    tracing::info!(task_id = %task_id, status = %task.status, "Cancellation requested");
    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: task })))
}

/// GET /api/v1/processing/tasks
pub async fn list_tasks(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let tasks = state.jobs.list_tasks().await?;
    Ok(Json(DataResponse { data: tasks }))
}

// ---------------------------------------------------------------------------
// Preview
// ---------------------------------------------------------------------------

/// GET /api/v1/processing/preview/{file_id}
pub async fn preview_chunks(
    State(state): State<AppState>,
    Path(file_id): Path<FileId>,
) -> AppResult<impl IntoResponse> {
    state
        .files
        .load_file(file_id)
        .await?
        .ok_or_else(|| CoreError::not_found("File", file_id))?;

    let chunks = state.chunks.list_chunks(&file_id.to_string()).await?;
    let body = ChunkPreview {
        file_id,
        total_chunks: chunks.len(),
        chunks,
    };
    Ok(Json(DataResponse { data: body }))
}
