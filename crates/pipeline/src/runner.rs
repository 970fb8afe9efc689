//! Drives one task from `pending` to a terminal state.
//!
//! The runner owns its [`Task`] value. The only state it shares is a small
//! [`TaskCell`] holding the status and the cancel flag, which the service
//! writes when a client asks to cancel. Every step (transition, persist,
//! publish) happens under that cell's lock, so a cancel either lands before
//! the step and the next update is `cancelled`, or waits for the step to be
//! published. A cancel that finds the task terminal is rejected.

use std::sync::Arc;

use smartrag_core::chunk::Chunk;
use smartrag_core::error::CoreError;
use smartrag_core::store::{ChunkStore, TaskStore};
use smartrag_core::task::{Task, TaskStatus, PROGRESS_MAX};
use smartrag_events::UpdateChannel;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::chunker::ChunkProvider;

pub const MSG_STARTED: &str = "Processing started";
pub const MSG_COMPLETED: &str = "Processing completed";
pub const MSG_CANCELLED: &str = "Processing cancelled";

/// Status and cancel flag shared between a runner and the job service.
#[derive(Debug)]
pub struct TaskCell {
    pub status: TaskStatus,
    pub cancel_requested: bool,
}

pub type TaskControl = Arc<Mutex<TaskCell>>;

pub fn new_control(status: TaskStatus) -> TaskControl {
    Arc::new(Mutex::new(TaskCell {
        status,
        cancel_requested: false,
    }))
}

/// Outcome of [`JobRunner::run`].
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// The task in its terminal state.
    pub task: Task,
    pub chunks_written: usize,
}

/// Result of attempting a transition at a unit boundary.
enum Gate {
    /// Holds the control lock until the step has been published.
    Applied(OwnedMutexGuard<TaskCell>),
    Cancelled,
}

pub struct JobRunner {
    task: Task,
    control: TaskControl,
    tasks: Arc<dyn TaskStore>,
    chunks: Arc<dyn ChunkStore>,
    provider: Arc<dyn ChunkProvider>,
    updates: UpdateChannel,
    chunks_written: usize,
}

impl JobRunner {
    pub fn new(
        task: Task,
        control: TaskControl,
        tasks: Arc<dyn TaskStore>,
        chunks: Arc<dyn ChunkStore>,
        provider: Arc<dyn ChunkProvider>,
        updates: UpdateChannel,
    ) -> Self {
        Self {
            task,
            control,
            tasks,
            chunks,
            provider,
            updates,
            chunks_written: 0,
        }
    }

    /// Run the task to completion, failure or cancellation.
    ///
    /// Never returns an error: every failure is recorded on the task and
    /// published as its final update.
    pub async fn run(mut self) -> RunSummary {
        let task_id = self.task.id;
        tracing::info!(task_id = %task_id, subject_id = %self.task.subject_id, "Job runner started");

        let final_message = match self.drive().await {
            Ok(()) if self.task.status == TaskStatus::Cancelled => MSG_CANCELLED.to_string(),
            Ok(()) => MSG_COMPLETED.to_string(),
            Err(e) => {
                let message = failure_message(e);
                match self.gate(|task| task.fail(message.clone())).await {
                    Ok(Gate::Applied(_)) => message,
                    Ok(Gate::Cancelled) => MSG_CANCELLED.to_string(),
                    Err(e) => {
                        // Only reachable if the task was already terminal.
                        tracing::error!(task_id = %task_id, error = %e, "Could not record failure");
                        message
                    }
                }
            }
        };

        if let Err(e) = self.tasks.save_task(&self.task).await {
            tracing::error!(task_id = %task_id, error = %e, "Failed to persist final task state");
        }
        self.updates.publish_task(&self.task, final_message).await;

        match self.task.status {
            TaskStatus::Completed => tracing::info!(
                task_id = %task_id,
                chunks = self.chunks_written,
                "Job completed",
            ),
            TaskStatus::Cancelled => tracing::info!(
                task_id = %task_id,
                chunks = self.chunks_written,
                "Job cancelled",
            ),
            status => tracing::warn!(
                task_id = %task_id,
                status = %status,
                error = self.task.error_message.as_deref().unwrap_or_default(),
                "Job failed",
            ),
        }

        RunSummary {
            task: self.task,
            chunks_written: self.chunks_written,
        }
    }

    /// Everything up to, and including, the terminal transition except for
    /// failure, which the caller records.
    async fn drive(&mut self) -> Result<(), CoreError> {
        let Gate::Applied(step) = self.gate(Task::start).await? else {
            return Ok(());
        };
        self.tasks.save_task(&self.task).await?;
        self.updates.publish_task(&self.task, MSG_STARTED).await;
        drop(step);

        let mut stream = self.provider.open(&self.task).await?;
        let total = stream.total_units();

        loop {
            if let Gate::Cancelled = self.gate(|_| Ok(())).await? {
                return Ok(());
            }
            let Some(unit) = stream.next_unit().await? else {
                break;
            };
            // A cancel accepted while the unit was produced drops the unit.
            let Gate::Applied(step) = self.gate(|_| Ok(())).await? else {
                return Ok(());
            };

            let index = i32::try_from(self.chunks_written)
                .map_err(|_| CoreError::Internal("Chunk index overflow".into()))?;
            let chunk = Chunk::from_unit(self.task.subject_id.clone(), index, unit);
            self.chunks.save_chunk(&chunk).await?;
            self.chunks_written += 1;

            let message = match total {
                Some(total) => {
                    let progress = self.chunks_written as f64 / total.max(1) as f64 * PROGRESS_MAX;
                    self.task.advance(progress)?;
                    format!("Processing chunk {}/{total}", self.chunks_written)
                }
                None => format!("Processing chunk {}", self.chunks_written),
            };
            self.tasks.save_task(&self.task).await?;
            self.updates.publish_task(&self.task, message).await;
            drop(step);
        }

        self.gate(Task::complete).await?;
        Ok(())
    }

    /// Apply `transition` under the control lock, or cancel instead if a
    /// cancel request is pending.
    async fn gate(
        &mut self,
        transition: impl FnOnce(&mut Task) -> Result<(), CoreError>,
    ) -> Result<Gate, CoreError> {
        let mut cell = Arc::clone(&self.control).lock_owned().await;
        if cell.cancel_requested {
            self.task.cancel()?;
            cell.status = self.task.status;
            return Ok(Gate::Cancelled);
        }
        transition(&mut self.task)?;
        cell.status = self.task.status;
        Ok(Gate::Applied(cell))
    }
}

/// Provider errors are recorded verbatim, without the variant prefix.
fn failure_message(error: CoreError) -> String {
    match error {
        CoreError::Upstream(message) => message,
        other => other.to_string(),
    }
}
