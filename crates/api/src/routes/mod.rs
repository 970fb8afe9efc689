pub mod connections;
pub mod export;
pub mod health;
pub mod processing;
pub mod upload;

use axum::Router;

use crate::config::ServerConfig;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /upload       file upload and records
/// /processing   chunking jobs and chunk preview
/// /export       chunk export
/// /ws           WebSocket connection statistics
/// ```
pub fn api_routes(config: &ServerConfig) -> Router<AppState> {
    Router::new()
        .nest("/upload", upload::router(config.max_file_size))
        .nest("/processing", processing::router())
        .nest("/export", export::router())
        .nest("/ws", connections::router())
}
