//! Keeps file records in step with the jobs that process them.

use std::sync::Arc;

use async_trait::async_trait;
use smartrag_core::file::FileStatus;
use smartrag_core::store::FileStore;
use smartrag_core::task::{Task, TaskStatus};
use smartrag_core::types::FileId;
use smartrag_pipeline::JobListener;

/// Marks a file `completed` or `failed` once its chunking job ends.
pub struct FileStatusListener {
    files: Arc<dyn FileStore>,
}

impl FileStatusListener {
    pub fn new(files: Arc<dyn FileStore>) -> Self {
        Self { files }
    }
}

#[async_trait]
impl JobListener for FileStatusListener {
    async fn on_finished(&self, task: &Task, chunks_written: usize) {
        // Jobs started outside the upload flow have no file to update.
        let Ok(file_id) = task.subject_id.parse::<FileId>() else {
            return;
        };

        let count = i32::try_from(chunks_written).unwrap_or(i32::MAX);
        let (status, error) = match task.status {
            TaskStatus::Completed => (FileStatus::Completed, None),
            TaskStatus::Cancelled => (FileStatus::Failed, Some("Processing cancelled")),
            _ => (FileStatus::Failed, task.error_message.as_deref()),
        };

        match self
            .files
            .set_file_status(file_id, status, Some(count), error)
            .await
        {
            Ok(()) => tracing::debug!(
                file_id = %file_id,
                task_id = %task.id,
                status = %status,
                chunks = count,
                "File status updated",
            ),
            Err(e) => tracing::warn!(
                file_id = %file_id,
                task_id = %task.id,
                error = %e,
                "Failed to update file status",
            ),
        }
    }
}
