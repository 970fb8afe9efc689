//! SmartRAG preprocessing API server library.
//!
//! Exposes the building blocks (config, state, error handling, routes,
//! WebSocket protocol handler) so integration tests and the binary
//! entrypoint share them.

pub mod config;
pub mod error;
pub mod handlers;
pub mod listener;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
pub mod storage;
pub mod ws;
