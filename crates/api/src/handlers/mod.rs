pub mod connections;
pub mod export;
pub mod files;
pub mod processing;
