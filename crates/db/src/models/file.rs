use smartrag_core::error::CoreError;
use smartrag_core::file::FileRecord;
use smartrag_core::types::{FileId, Timestamp};
use sqlx::FromRow;

/// A row from the `files` table.
#[derive(Debug, Clone, FromRow)]
pub struct FileRow {
    pub id: FileId,
    pub filename: String,
    pub original_filename: String,
    pub file_path: String,
    pub file_size: i64,
    pub content_type: String,
    pub uploaded_at: Timestamp,
    pub status: String,
    pub chunks_count: i32,
    pub error_message: Option<String>,
}

impl TryFrom<FileRow> for FileRecord {
    type Error = CoreError;

    fn try_from(row: FileRow) -> Result<Self, Self::Error> {
        Ok(FileRecord {
            id: row.id,
            filename: row.filename,
            original_filename: row.original_filename,
            file_path: row.file_path,
            file_size: row.file_size,
            content_type: row.content_type,
            uploaded_at: row.uploaded_at,
            status: row.status.parse()?,
            chunks_count: row.chunks_count,
            error_message: row.error_message,
        })
    }
}
