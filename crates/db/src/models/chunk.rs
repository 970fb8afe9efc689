use smartrag_core::chunk::Chunk;
use smartrag_core::types::Timestamp;
use sqlx::FromRow;

/// A row from the `chunks` table.
#[derive(Debug, Clone, FromRow)]
pub struct ChunkRow {
    pub subject_id: String,
    pub chunk_index: i32,
    pub content: String,
    pub html_content: Option<String>,
    pub markdown_content: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: Timestamp,
}

impl From<ChunkRow> for Chunk {
    fn from(row: ChunkRow) -> Self {
        Chunk {
            subject_id: row.subject_id,
            chunk_index: row.chunk_index,
            content: row.content,
            html_content: row.html_content,
            markdown_content: row.markdown_content,
            metadata: row.metadata,
            created_at: row.created_at,
        }
    }
}
