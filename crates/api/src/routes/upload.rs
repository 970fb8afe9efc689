//! Route definitions for the `/upload` resource.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers::files;
use crate::state::AppState;

/// Headroom on top of the file size limit for multipart framing.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Routes mounted at `/upload`.
///
/// ```text
/// POST   /file          -> upload_file
/// POST   /files         -> upload_files
/// GET    /files         -> list_files
/// GET    /files/{id}    -> get_file
/// DELETE /files/{id}    -> delete_file
/// ```
pub fn router(max_file_size: usize) -> Router<AppState> {
    Router::new()
        .route("/file", post(files::upload_file))
        .route("/files", post(files::upload_files).get(files::list_files))
        .route("/files/{id}", get(files::get_file).delete(files::delete_file))
        .layer(DefaultBodyLimit::max(
            max_file_size.saturating_add(MULTIPART_OVERHEAD),
        ))
}
