//! Handlers for the `/export` resource.

use axum::extract::{Path, Query, State};
use axum::http::header::CONTENT_DISPOSITION;
use axum::http::HeaderValue;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use smartrag_core::chunk::Chunk;
use smartrag_core::error::CoreError;
use smartrag_core::export::{build_export, schema_descriptions, ExportConfig, SchemaDescription};
use smartrag_core::file::FileRecord;
use smartrag_core::types::FileId;

use crate::error::{AppError, AppResult};
use crate::handlers::processing::FileQuery;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ExportResult {
    pub file_id: FileId,
    pub config: ExportConfig,
    pub total_chunks: usize,
    pub status: &'static str,
    pub export_data: serde_json::Value,
}

/// Load a file record and its chunks in index order.
async fn file_with_chunks(state: &AppState, file_id: FileId) -> AppResult<(FileRecord, Vec<Chunk>)> {
    let file = state
        .files
        .load_file(file_id)
        .await?
        .ok_or_else(|| CoreError::not_found("File", file_id))?;
    let chunks = state.chunks.list_chunks(&file_id.to_string()).await?;
    Ok((file, chunks))
}

/// `attachment; filename="<name>_chunks.json"` with quotes and control
/// characters removed from the client-supplied name.
fn attachment_header(original_filename: &str) -> AppResult<HeaderValue> {
    let safe: String = original_filename
        .chars()
        .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
        .collect();
    let value = format!("attachment; filename=\"{safe}_chunks.json\"");
    HeaderValue::from_bytes(value.as_bytes())
        .map_err(|e| AppError::InternalError(format!("Invalid Content-Disposition: {e}")))
}

/// POST /api/v1/export/json?file_id={id}
///
/// Render the file's chunks in the requested schema.
pub async fn export_json(
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
    Json(config): Json<ExportConfig>,
) -> AppResult<impl IntoResponse> {
    let (file, chunks) = file_with_chunks(&state, query.file_id).await?;
    let export_data = build_export(&file, &chunks, &config);

    tracing::debug!(
        file_id = %file.id,
        schema = config.schema_type.as_str(),
        chunks = chunks.len(),
        "Export built",
    );

    let body = ExportResult {
        file_id: file.id,
        total_chunks: chunks.len(),
        config,
        status: "ready",
        export_data,
    };
    Ok(Json(DataResponse { data: body }))
}

/// GET /api/v1/export/download/{file_id}
///
/// Standard-schema export served as a JSON attachment.
pub async fn download_export(
    State(state): State<AppState>,
    Path(file_id): Path<FileId>,
) -> AppResult<impl IntoResponse> {
    let (file, chunks) = file_with_chunks(&state, file_id).await?;
    let export_data = build_export(&file, &chunks, &ExportConfig::default());
    let disposition = attachment_header(&file.original_filename)?;

    Ok(([(CONTENT_DISPOSITION, disposition)], Json(export_data)))
}

/// GET /api/v1/export/schemas
pub async fn list_schemas() -> Json<DataResponse<Vec<SchemaDescription>>> {
    Json(DataResponse {
        data: schema_descriptions(),
    })
}
