//! Row types for the `files`, `tasks` and `chunks` tables and their
//! conversions into `smartrag_core` domain records.

pub mod chunk;
pub mod file;
pub mod task;
