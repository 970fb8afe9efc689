//! Chunking jobs: providers that split documents into units, the runner
//! that drives one task through its lifecycle, and the service that starts
//! and cancels runners.

pub mod chunker;
pub mod runner;
pub mod service;
pub mod simulated;
pub mod text;

pub use chunker::{ChunkProvider, DocumentChunker, UnitStream};
pub use runner::{JobRunner, RunSummary};
pub use service::{JobListener, JobService};
pub use simulated::SimulatedChunker;
pub use text::TextChunker;
