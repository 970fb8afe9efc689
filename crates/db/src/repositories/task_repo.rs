//! Repository for the `tasks` table.

use smartrag_core::task::Task;
use smartrag_core::types::TaskId;
use sqlx::PgPool;

use crate::models::task::TaskRow;

/// Column list for `tasks` queries.
const COLUMNS: &str = "\
    id, subject_id, status, progress, config, \
    created_at, started_at, completed_at, error_message";

pub struct TaskRepo;

impl TaskRepo {
    /// Insert the task, or overwrite every mutable column if it exists.
    ///
    /// `config` and `created_at` are immutable after creation and are not
    /// touched by the update branch.
    pub async fn upsert(pool: &PgPool, task: &Task) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO tasks \
                 (id, subject_id, status, progress, config, created_at, started_at, completed_at, error_message) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (id) DO UPDATE SET \
                 status = EXCLUDED.status, \
                 progress = EXCLUDED.progress, \
                 started_at = EXCLUDED.started_at, \
                 completed_at = EXCLUDED.completed_at, \
                 error_message = EXCLUDED.error_message",
        )
        .bind(task.id)
        .bind(&task.subject_id)
        .bind(task.status.as_str())
        .bind(task.progress)
        .bind(&task.config)
        .bind(task.created_at)
        .bind(task.started_at)
        .bind(task.completed_at)
        .bind(task.error_message.as_deref())
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_id(pool: &PgPool, id: TaskId) -> Result<Option<TaskRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tasks WHERE id = $1");
        sqlx::query_as::<_, TaskRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All tasks, newest first.
    pub async fn list(pool: &PgPool) -> Result<Vec<TaskRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tasks ORDER BY created_at DESC");
        sqlx::query_as::<_, TaskRow>(&query).fetch_all(pool).await
    }
}
