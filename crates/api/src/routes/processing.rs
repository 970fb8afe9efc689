//! Route definitions for the `/processing` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::processing;
use crate::state::AppState;

/// Routes mounted at `/processing`.
///
/// ```text
/// POST   /chunk?file_id=      -> start_chunking
/// GET    /task/{id}           -> get_task
/// DELETE /task/{id}           -> cancel_task
/// GET    /tasks               -> list_tasks
/// GET    /preview/{file_id}   -> preview_chunks
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chunk", post(processing::start_chunking))
        .route(
            "/task/{id}",
            get(processing::get_task).delete(processing::cancel_task),
        )
        .route("/tasks", get(processing::list_tasks))
        .route("/preview/{file_id}", get(processing::preview_chunks))
}
