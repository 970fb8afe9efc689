//! Repository structs with associated async functions taking `&PgPool`.

pub mod chunk_repo;
pub mod file_repo;
pub mod task_repo;

pub use chunk_repo::ChunkRepo;
pub use file_repo::FileRepo;
pub use task_repo::TaskRepo;
