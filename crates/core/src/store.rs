//! Persistence traits consumed by the job runner and the HTTP layer.
//!
//! Implemented by `smartrag_db::MemoryStore` and `smartrag_db::PgStore`.
//! Stores are assumed durable and internally consistent; callers never
//! span a transaction across two calls.

use async_trait::async_trait;

use crate::chunk::Chunk;
use crate::error::CoreError;
use crate::file::{FileRecord, FileStatus};
use crate::task::Task;
use crate::types::{FileId, TaskId};

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert or overwrite the task row.
    async fn save_task(&self, task: &Task) -> Result<(), CoreError>;

    async fn load_task(&self, id: TaskId) -> Result<Option<Task>, CoreError>;

    /// All tasks, newest first.
    async fn list_tasks(&self) -> Result<Vec<Task>, CoreError>;

    /// Cheap liveness probe used by the health endpoint.
    async fn health_check(&self) -> Result<(), CoreError>;
}

#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Append a chunk. Fails with [`CoreError::Conflict`] if the subject
    /// already has a chunk at that index.
    async fn save_chunk(&self, chunk: &Chunk) -> Result<(), CoreError>;

    /// Chunks of one subject ordered by index.
    async fn list_chunks(&self, subject_id: &str) -> Result<Vec<Chunk>, CoreError>;

    /// Remove every chunk of a subject. Returns the number removed.
    async fn delete_chunks(&self, subject_id: &str) -> Result<u64, CoreError>;
}

#[async_trait]
pub trait FileStore: Send + Sync {
    async fn save_file(&self, file: &FileRecord) -> Result<(), CoreError>;

    async fn load_file(&self, id: FileId) -> Result<Option<FileRecord>, CoreError>;

    /// All files, newest upload first.
    async fn list_files(&self) -> Result<Vec<FileRecord>, CoreError>;

    /// Returns true if a record was removed.
    async fn delete_file(&self, id: FileId) -> Result<bool, CoreError>;

    /// Update the processing outcome columns of a file.
    async fn set_file_status(
        &self,
        id: FileId,
        status: FileStatus,
        chunks_count: Option<i32>,
        error_message: Option<&str>,
    ) -> Result<(), CoreError>;
}
