//! In-memory store used by tests and by database-less development runs.
//!
//! Each table is a map behind its own `tokio::sync::RwLock`; no lock is
//! held across an `.await` on anything but the lock itself.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use smartrag_core::chunk::Chunk;
use smartrag_core::error::CoreError;
use smartrag_core::file::{FileRecord, FileStatus};
use smartrag_core::store::{ChunkStore, FileStore, TaskStore};
use smartrag_core::task::Task;
use smartrag_core::types::{FileId, TaskId};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryStore {
    tasks: RwLock<HashMap<TaskId, Task>>,
    chunks: RwLock<HashMap<String, BTreeMap<i32, Chunk>>>,
    files: RwLock<HashMap<FileId, FileRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn save_task(&self, task: &Task) -> Result<(), CoreError> {
        self.tasks.write().await.insert(task.id, task.clone());
        Ok(())
    }

    async fn load_task(&self, id: TaskId) -> Result<Option<Task>, CoreError> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, CoreError> {
        let mut tasks: Vec<Task> = self.tasks.read().await.values().cloned().collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(tasks)
    }

    async fn health_check(&self) -> Result<(), CoreError> {
        Ok(())
    }
}

#[async_trait]
impl ChunkStore for MemoryStore {
    async fn save_chunk(&self, chunk: &Chunk) -> Result<(), CoreError> {
        let mut chunks = self.chunks.write().await;
        let subject = chunks.entry(chunk.subject_id.clone()).or_default();
        if subject.contains_key(&chunk.chunk_index) {
            return Err(CoreError::Conflict(format!(
                "Chunk {} of subject {} already exists",
                chunk.chunk_index, chunk.subject_id
            )));
        }
        subject.insert(chunk.chunk_index, chunk.clone());
        Ok(())
    }

    async fn list_chunks(&self, subject_id: &str) -> Result<Vec<Chunk>, CoreError> {
        Ok(self
            .chunks
            .read()
            .await
            .get(subject_id)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_chunks(&self, subject_id: &str) -> Result<u64, CoreError> {
        Ok(self
            .chunks
            .write()
            .await
            .remove(subject_id)
            .map(|m| m.len() as u64)
            .unwrap_or(0))
    }
}

#[async_trait]
impl FileStore for MemoryStore {
    async fn save_file(&self, file: &FileRecord) -> Result<(), CoreError> {
        self.files.write().await.insert(file.id, file.clone());
        Ok(())
    }

    async fn load_file(&self, id: FileId) -> Result<Option<FileRecord>, CoreError> {
        Ok(self.files.read().await.get(&id).cloned())
    }

    async fn list_files(&self) -> Result<Vec<FileRecord>, CoreError> {
        let mut files: Vec<FileRecord> = self.files.read().await.values().cloned().collect();
        files.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(files)
    }

    async fn delete_file(&self, id: FileId) -> Result<bool, CoreError> {
        Ok(self.files.write().await.remove(&id).is_some())
    }

    async fn set_file_status(
        &self,
        id: FileId,
        status: FileStatus,
        chunks_count: Option<i32>,
        error_message: Option<&str>,
    ) -> Result<(), CoreError> {
        let mut files = self.files.write().await;
        let file = files
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found("File", id))?;
        file.status = status;
        if let Some(count) = chunks_count {
            file.chunks_count = count;
        }
        file.error_message = error_message.map(str::to_string);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use smartrag_core::chunk::ChunkUnit;
    use smartrag_core::task::TaskStatus;

    use super::*;

    fn chunk(subject: &str, index: i32) -> Chunk {
        let unit = ChunkUnit::from_text(index as usize, format!("c{index}"), serde_json::json!({}));
        Chunk::from_unit(subject, index, unit)
    }

    #[tokio::test]
    async fn save_task_overwrites_previous_state() {
        let store = MemoryStore::new();
        let mut task = Task::new("file-1", serde_json::json!({}));
        store.save_task(&task).await.unwrap();

        task.start().unwrap();
        store.save_task(&task).await.unwrap();

        let loaded = store.load_task(task.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, TaskStatus::Running);
        assert_eq!(store.list_tasks().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn list_tasks_is_newest_first() {
        let store = MemoryStore::new();
        let first = Task::new("a", serde_json::json!({}));
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let second = Task::new("b", serde_json::json!({}));
        store.save_task(&first).await.unwrap();
        store.save_task(&second).await.unwrap();

        let ids: Vec<_> = store.list_tasks().await.unwrap().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn chunks_are_append_only_and_ordered() {
        let store = MemoryStore::new();
        store.save_chunk(&chunk("s", 1)).await.unwrap();
        store.save_chunk(&chunk("s", 0)).await.unwrap();

        assert_matches!(
            store.save_chunk(&chunk("s", 1)).await,
            Err(CoreError::Conflict(_))
        );

        let listed = store.list_chunks("s").await.unwrap();
        let indices: Vec<_> = listed.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(listed[1].content, "c1");
        assert!(store.list_chunks("other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_chunks_reports_count() {
        let store = MemoryStore::new();
        for i in 0..3 {
            store.save_chunk(&chunk("s", i)).await.unwrap();
        }
        assert_eq!(store.delete_chunks("s").await.unwrap(), 3);
        assert_eq!(store.delete_chunks("s").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn set_file_status_on_unknown_file_is_not_found() {
        let store = MemoryStore::new();
        let result = store
            .set_file_status(uuid::Uuid::new_v4(), FileStatus::Completed, Some(3), None)
            .await;
        assert_matches!(result, Err(CoreError::NotFound { entity: "File", .. }));
    }

    #[tokio::test]
    async fn set_file_status_keeps_count_when_absent() {
        let store = MemoryStore::new();
        let mut file = FileRecord::new(
            uuid::Uuid::new_v4(),
            "a.txt",
            "a.txt",
            "uploads/a.txt",
            1,
            "text/plain",
        );
        file.chunks_count = 4;
        store.save_file(&file).await.unwrap();

        store
            .set_file_status(file.id, FileStatus::Failed, None, Some("boom"))
            .await
            .unwrap();

        let loaded = store.load_file(file.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, FileStatus::Failed);
        assert_eq!(loaded.chunks_count, 4);
        assert_eq!(loaded.error_message.as_deref(), Some("boom"));
    }
}
