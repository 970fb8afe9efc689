//! Domain types shared by every SmartRAG crate.
//!
//! Holds the task state machine, chunk and file records, the export schema
//! translations, and the persistence traits implemented by `smartrag-db`.

pub mod chunk;
pub mod error;
pub mod export;
pub mod file;
pub mod store;
pub mod task;
pub mod types;
