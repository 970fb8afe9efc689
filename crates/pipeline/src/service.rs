//! Entry point for starting, cancelling and inspecting chunking jobs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use smartrag_core::error::CoreError;
use smartrag_core::store::{ChunkStore, TaskStore};
use smartrag_core::task::{Task, TaskStatus};
use smartrag_core::types::TaskId;
use smartrag_events::UpdateChannel;
use tokio::sync::RwLock;

use crate::chunker::ChunkProvider;
use crate::runner::{new_control, JobRunner, TaskControl, MSG_CANCELLED};

/// Notified once per job after its terminal state has been persisted and
/// published.
#[async_trait]
pub trait JobListener: Send + Sync {
    async fn on_finished(&self, task: &Task, chunks_written: usize);
}

struct ActiveJob {
    subject_id: String,
    control: TaskControl,
}

/// Starts one [`JobRunner`] per task and routes cancel requests to it.
///
/// Cheap to clone; clones share the set of active jobs.
#[derive(Clone)]
pub struct JobService {
    tasks: Arc<dyn TaskStore>,
    chunks: Arc<dyn ChunkStore>,
    provider: Arc<dyn ChunkProvider>,
    updates: UpdateChannel,
    listeners: Vec<Arc<dyn JobListener>>,
    active: Arc<RwLock<HashMap<TaskId, ActiveJob>>>,
}

impl JobService {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        chunks: Arc<dyn ChunkStore>,
        provider: Arc<dyn ChunkProvider>,
        updates: UpdateChannel,
    ) -> Self {
        Self {
            tasks,
            chunks,
            provider,
            updates,
            listeners: Vec::new(),
            active: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn JobListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Create a `pending` task for `subject_id` and start processing it in
    /// the background. Returns as soon as the task has been persisted.
    ///
    /// Fails with [`CoreError::Conflict`] if the subject already has a job
    /// that has not finished.
    pub async fn start_job(
        &self,
        subject_id: &str,
        config: serde_json::Value,
    ) -> Result<TaskId, CoreError> {
        self.start(subject_id, config, false).await
    }

    /// Like [`start_job`](Self::start_job), but first deletes the chunks a
    /// previous run left for the subject. The delete happens after the
    /// subject is reserved, so it cannot race another job's writes.
    pub async fn start_job_replacing(
        &self,
        subject_id: &str,
        config: serde_json::Value,
    ) -> Result<TaskId, CoreError> {
        self.start(subject_id, config, true).await
    }

    async fn start(
        &self,
        subject_id: &str,
        config: serde_json::Value,
        replace: bool,
    ) -> Result<TaskId, CoreError> {
        let task = Task::new(subject_id, config);
        let task_id = task.id;
        let control = new_control(task.status);

        {
            let mut active = self.active.write().await;
            if active.values().any(|job| job.subject_id == subject_id) {
                return Err(CoreError::Conflict(format!(
                    "Subject {subject_id} already has a job in progress"
                )));
            }
            active.insert(
                task_id,
                ActiveJob {
                    subject_id: subject_id.to_string(),
                    control: Arc::clone(&control),
                },
            );
        }

        let prepared = async {
            if replace {
                let removed = self.chunks.delete_chunks(subject_id).await?;
                if removed > 0 {
                    tracing::debug!(subject_id, removed, "Cleared previous chunks");
                }
            }
            self.tasks.save_task(&task).await
        };
        if let Err(e) = prepared.await {
            self.active.write().await.remove(&task_id);
            return Err(e);
        }

        tracing::info!(task_id = %task_id, subject_id, "Job queued");

        let runner = JobRunner::new(
            task,
            control,
            Arc::clone(&self.tasks),
            Arc::clone(&self.chunks),
            Arc::clone(&self.provider),
            self.updates.clone(),
        );
        let listeners = self.listeners.clone();
        let active = Arc::clone(&self.active);
        tokio::spawn(async move {
            let summary = runner.run().await;
            for listener in &listeners {
                listener
                    .on_finished(&summary.task, summary.chunks_written)
                    .await;
            }
            active.write().await.remove(&task_id);
        });

        Ok(task_id)
    }

    /// Request cancellation of a task.
    ///
    /// A running job stops at its next unit boundary and ends `cancelled`;
    /// once this returns `Ok`, the job publishes no further progress.
    /// A stored task with no runner (left over from a previous process) is
    /// cancelled directly.
    pub async fn cancel(&self, task_id: TaskId) -> Result<(), CoreError> {
        let control = self
            .active
            .read()
            .await
            .get(&task_id)
            .map(|job| Arc::clone(&job.control));

        if let Some(control) = control {
            let mut cell = control.lock().await;
            if cell.status.is_terminal() {
                return Err(CoreError::InvalidTransition {
                    from: cell.status,
                    to: TaskStatus::Cancelled,
                });
            }
            cell.cancel_requested = true;
            tracing::info!(task_id = %task_id, "Cancellation requested");
            return Ok(());
        }

        let mut task = self.get_status(task_id).await?;
        task.cancel()?;
        self.tasks.save_task(&task).await?;
        self.updates.publish_task(&task, MSG_CANCELLED).await;
        tracing::info!(task_id = %task_id, "Cancelled task without a runner");
        Ok(())
    }

    /// Point-in-time snapshot of a task.
    pub async fn get_status(&self, task_id: TaskId) -> Result<Task, CoreError> {
        self.tasks
            .load_task(task_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Task", task_id))
    }

    /// All tasks, newest first.
    pub async fn list_tasks(&self) -> Result<Vec<Task>, CoreError> {
        self.tasks.list_tasks().await
    }

    /// Returns true if `subject_id` has a job that has not finished.
    pub async fn is_active(&self, subject_id: &str) -> bool {
        self.active
            .read()
            .await
            .values()
            .any(|job| job.subject_id == subject_id)
    }

    pub async fn active_count(&self) -> usize {
        self.active.read().await.len()
    }

    /// Ask every running job to stop. Used at shutdown.
    pub async fn cancel_all(&self) -> usize {
        let active = self.active.read().await;
        let mut requested = 0;
        for job in active.values() {
            let mut cell = job.control.lock().await;
            if !cell.status.is_terminal() {
                cell.cancel_requested = true;
                requested += 1;
            }
        }
        if requested > 0 {
            tracing::info!(requested, "Cancellation requested for all running jobs");
        }
        requested
    }
}
