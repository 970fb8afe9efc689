//! Postgres-backed implementation of the `smartrag_core::store` traits.

use async_trait::async_trait;
use smartrag_core::chunk::Chunk;
use smartrag_core::error::CoreError;
use smartrag_core::file::{FileRecord, FileStatus};
use smartrag_core::store::{ChunkStore, FileStore, TaskStore};
use smartrag_core::task::Task;
use smartrag_core::types::{FileId, TaskId};

use crate::repositories::{ChunkRepo, FileRepo, TaskRepo};
use crate::DbPool;

/// Store adapter delegating to the repositories.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Map a sqlx error onto the domain taxonomy.
///
/// - Unique violations (SQLSTATE 23505) on `uq_*` constraints become `Conflict`.
/// - Everything else becomes `Internal` and is logged.
pub fn classify_sqlx_error(err: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            let constraint = db_err.constraint().unwrap_or("unknown");
            if constraint.starts_with("uq_") {
                return CoreError::Conflict(format!(
                    "Duplicate value violates unique constraint: {constraint}"
                ));
            }
        }
    }
    tracing::error!(error = %err, "Database error");
    CoreError::Internal(format!("Database error: {err}"))
}

#[async_trait]
impl TaskStore for PgStore {
    async fn save_task(&self, task: &Task) -> Result<(), CoreError> {
        TaskRepo::upsert(&self.pool, task)
            .await
            .map_err(classify_sqlx_error)
    }

    async fn load_task(&self, id: TaskId) -> Result<Option<Task>, CoreError> {
        TaskRepo::find_by_id(&self.pool, id)
            .await
            .map_err(classify_sqlx_error)?
            .map(Task::try_from)
            .transpose()
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, CoreError> {
        TaskRepo::list(&self.pool)
            .await
            .map_err(classify_sqlx_error)?
            .into_iter()
            .map(Task::try_from)
            .collect()
    }

    async fn health_check(&self) -> Result<(), CoreError> {
        crate::health_check(&self.pool)
            .await
            .map_err(classify_sqlx_error)
    }
}

#[async_trait]
impl ChunkStore for PgStore {
    async fn save_chunk(&self, chunk: &Chunk) -> Result<(), CoreError> {
        ChunkRepo::insert(&self.pool, chunk)
            .await
            .map_err(classify_sqlx_error)
    }

    async fn list_chunks(&self, subject_id: &str) -> Result<Vec<Chunk>, CoreError> {
        let rows = ChunkRepo::list_by_subject(&self.pool, subject_id)
            .await
            .map_err(classify_sqlx_error)?;
        Ok(rows.into_iter().map(Chunk::from).collect())
    }

    async fn delete_chunks(&self, subject_id: &str) -> Result<u64, CoreError> {
        ChunkRepo::delete_by_subject(&self.pool, subject_id)
            .await
            .map_err(classify_sqlx_error)
    }
}

#[async_trait]
impl FileStore for PgStore {
    async fn save_file(&self, file: &FileRecord) -> Result<(), CoreError> {
        FileRepo::upsert(&self.pool, file)
            .await
            .map_err(classify_sqlx_error)
    }

    async fn load_file(&self, id: FileId) -> Result<Option<FileRecord>, CoreError> {
        FileRepo::find_by_id(&self.pool, id)
            .await
            .map_err(classify_sqlx_error)?
            .map(FileRecord::try_from)
            .transpose()
    }

    async fn list_files(&self) -> Result<Vec<FileRecord>, CoreError> {
        FileRepo::list(&self.pool)
            .await
            .map_err(classify_sqlx_error)?
            .into_iter()
            .map(FileRecord::try_from)
            .collect()
    }

    async fn delete_file(&self, id: FileId) -> Result<bool, CoreError> {
        FileRepo::delete(&self.pool, id)
            .await
            .map_err(classify_sqlx_error)
    }

    async fn set_file_status(
        &self,
        id: FileId,
        status: FileStatus,
        chunks_count: Option<i32>,
        error_message: Option<&str>,
    ) -> Result<(), CoreError> {
        let updated = FileRepo::set_status(&self.pool, id, status, chunks_count, error_message)
            .await
            .map_err(classify_sqlx_error)?;
        if updated {
            Ok(())
        } else {
            Err(CoreError::not_found("File", id))
        }
    }
}
