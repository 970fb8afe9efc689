//! Chunk provider traits and the default provider that picks a strategy per
//! document.

use std::sync::Arc;

use async_trait::async_trait;
use smartrag_core::chunk::ChunkUnit;
use smartrag_core::error::CoreError;
use smartrag_core::file::is_text_content_type;
use smartrag_core::store::FileStore;
use smartrag_core::task::Task;

use crate::simulated::SimulatedChunker;
use crate::text::TextChunker;

/// A lazily produced sequence of chunk units for one task.
#[async_trait]
pub trait UnitStream: Send {
    /// Total number of units, if known up front.
    ///
    /// When `None`, the runner cannot compute progress and holds it at its
    /// last value until the task completes.
    fn total_units(&self) -> Option<usize>;

    /// Produce the next unit, or `Ok(None)` once the document is exhausted.
    ///
    /// An error aborts the task; it is never retried.
    async fn next_unit(&mut self) -> Result<Option<ChunkUnit>, CoreError>;
}

/// Opens a [`UnitStream`] for a task.
#[async_trait]
pub trait ChunkProvider: Send + Sync {
    async fn open(&self, task: &Task) -> Result<Box<dyn UnitStream>, CoreError>;
}

/// Splits text uploads with [`TextChunker`] and simulates everything else.
///
/// The task's subject id is taken to be a file id. Subjects that are not a
/// known file are simulated.
pub struct DocumentChunker {
    files: Arc<dyn FileStore>,
    text: TextChunker,
    simulated: SimulatedChunker,
}

impl DocumentChunker {
    pub fn new(files: Arc<dyn FileStore>, simulated: SimulatedChunker) -> Self {
        Self {
            files,
            text: TextChunker::new(),
            simulated,
        }
    }
}

#[async_trait]
impl ChunkProvider for DocumentChunker {
    async fn open(&self, task: &Task) -> Result<Box<dyn UnitStream>, CoreError> {
        let file = match task.subject_id.parse() {
            Ok(file_id) => self.files.load_file(file_id).await?,
            Err(_) => None,
        };

        match file {
            Some(file) if is_text_content_type(&file.content_type) => {
                tracing::debug!(
                    task_id = %task.id,
                    file_id = %file.id,
                    content_type = %file.content_type,
                    "Splitting text document",
                );
                self.text.open_file(task, &file.file_path).await
            }
            _ => self.simulated.open(task).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use smartrag_core::file::FileRecord;
    use smartrag_db::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn text_files_are_split_for_real() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        tokio::fs::write(&path, "First paragraph.\n\nSecond paragraph.")
            .await
            .unwrap();

        let files = Arc::new(MemoryStore::new());
        let record = FileRecord::new(
            uuid::Uuid::new_v4(),
            "doc.txt",
            "doc.txt",
            path.to_string_lossy(),
            33,
            "text/plain",
        );
        files.save_file(&record).await.unwrap();

        let chunker = DocumentChunker::new(files, SimulatedChunker::new(Duration::ZERO));
        let task = Task::new(
            record.id.to_string(),
            serde_json::json!({"chunk_size": 20, "chunk_overlap": 0}),
        );
        let mut stream = chunker.open(&task).await.unwrap();

        assert_eq!(stream.total_units(), Some(2));
        let first = stream.next_unit().await.unwrap().unwrap();
        assert_eq!(first.content, "First paragraph.");
    }

    #[tokio::test]
    async fn unknown_subjects_are_simulated() {
        let chunker = DocumentChunker::new(
            Arc::new(MemoryStore::new()),
            SimulatedChunker::new(Duration::ZERO),
        );
        let task = Task::new("file-1", serde_json::json!({}));
        let stream = chunker.open(&task).await.unwrap();
        let total = stream.total_units().unwrap();
        assert!((15..=30).contains(&total));
    }
}
