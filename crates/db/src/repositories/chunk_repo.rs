//! Repository for the `chunks` table.
//!
//! Chunks are append-only: there is no update statement. A duplicate
//! `(subject_id, chunk_index)` surfaces as a `uq_chunks_subject_index`
//! unique violation.

use smartrag_core::chunk::Chunk;
use sqlx::PgPool;

use crate::models::chunk::ChunkRow;

const COLUMNS: &str = "\
    subject_id, chunk_index, content, html_content, markdown_content, \
    metadata, created_at";

pub struct ChunkRepo;

impl ChunkRepo {
    pub async fn insert(pool: &PgPool, chunk: &Chunk) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO chunks \
                 (subject_id, chunk_index, content, html_content, markdown_content, metadata, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&chunk.subject_id)
        .bind(chunk.chunk_index)
        .bind(&chunk.content)
        .bind(chunk.html_content.as_deref())
        .bind(chunk.markdown_content.as_deref())
        .bind(&chunk.metadata)
        .bind(chunk.created_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn list_by_subject(
        pool: &PgPool,
        subject_id: &str,
    ) -> Result<Vec<ChunkRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM chunks WHERE subject_id = $1 ORDER BY chunk_index ASC"
        );
        sqlx::query_as::<_, ChunkRow>(&query)
            .bind(subject_id)
            .fetch_all(pool)
            .await
    }

    pub async fn delete_by_subject(pool: &PgPool, subject_id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM chunks WHERE subject_id = $1")
            .bind(subject_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
