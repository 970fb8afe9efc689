use std::sync::Arc;
use std::time::Duration;

use smartrag_core::store::{ChunkStore, FileStore, TaskStore};
use smartrag_events::{ConnectionRegistry, UpdateChannel};
use smartrag_pipeline::{DocumentChunker, JobService, SimulatedChunker};

use crate::config::ServerConfig;
use crate::listener::FileStatusListener;
use crate::storage::UploadStorage;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub tasks: Arc<dyn TaskStore>,
    pub chunks: Arc<dyn ChunkStore>,
    pub files: Arc<dyn FileStore>,
    /// Live WebSocket connections and their task subscriptions.
    pub registry: Arc<ConnectionRegistry>,
    /// Starts, tracks and cancels chunking jobs.
    pub jobs: JobService,
    pub storage: Arc<UploadStorage>,
}

impl AppState {
    /// Wire every component around one store implementing all three
    /// persistence traits.
    pub fn new<S>(config: ServerConfig, store: Arc<S>) -> Self
    where
        S: TaskStore + ChunkStore + FileStore + 'static,
    {
        let tasks: Arc<dyn TaskStore> = store.clone();
        let chunks: Arc<dyn ChunkStore> = store.clone();
        let files: Arc<dyn FileStore> = store;

        let registry = Arc::new(ConnectionRegistry::with_buffer(config.ws_outbound_buffer));
        let updates = UpdateChannel::new(Arc::clone(&registry));

        let simulated = SimulatedChunker::new(Duration::from_millis(config.chunk_unit_delay_ms));
        let provider = Arc::new(DocumentChunker::new(Arc::clone(&files), simulated));

        let jobs = JobService::new(Arc::clone(&tasks), Arc::clone(&chunks), provider, updates)
            .with_listener(Arc::new(FileStatusListener::new(Arc::clone(&files))));

        let storage = Arc::new(UploadStorage::new(config.upload_dir.clone()));

        Self {
            config: Arc::new(config),
            tasks,
            chunks,
            files,
            registry,
            jobs,
            storage,
        }
    }
}
