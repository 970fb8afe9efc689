//! Repository for the `files` table.

use smartrag_core::file::{FileRecord, FileStatus};
use smartrag_core::types::FileId;
use sqlx::PgPool;

use crate::models::file::FileRow;

const COLUMNS: &str = "\
    id, filename, original_filename, file_path, file_size, content_type, \
    uploaded_at, status, chunks_count, error_message";

pub struct FileRepo;

impl FileRepo {
    pub async fn upsert(pool: &PgPool, file: &FileRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO files \
                 (id, filename, original_filename, file_path, file_size, content_type, \
                  uploaded_at, status, chunks_count, error_message) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (id) DO UPDATE SET \
                 status = EXCLUDED.status, \
                 chunks_count = EXCLUDED.chunks_count, \
                 error_message = EXCLUDED.error_message",
        )
        .bind(file.id)
        .bind(&file.filename)
        .bind(&file.original_filename)
        .bind(&file.file_path)
        .bind(file.file_size)
        .bind(&file.content_type)
        .bind(file.uploaded_at)
        .bind(file.status.as_str())
        .bind(file.chunks_count)
        .bind(file.error_message.as_deref())
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_id(pool: &PgPool, id: FileId) -> Result<Option<FileRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM files WHERE id = $1");
        sqlx::query_as::<_, FileRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All files, newest upload first.
    pub async fn list(pool: &PgPool) -> Result<Vec<FileRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM files ORDER BY uploaded_at DESC");
        sqlx::query_as::<_, FileRow>(&query).fetch_all(pool).await
    }

    pub async fn delete(pool: &PgPool, id: FileId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Update status and, when given, the chunk count and error message.
    ///
    /// Returns `false` if no file has that id.
    pub async fn set_status(
        pool: &PgPool,
        id: FileId,
        status: FileStatus,
        chunks_count: Option<i32>,
        error_message: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE files \
             SET status = $2, \
                 chunks_count = COALESCE($3, chunks_count), \
                 error_message = $4 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(chunks_count)
        .bind(error_message)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
