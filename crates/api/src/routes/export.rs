//! Route definitions for the `/export` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::export;
use crate::state::AppState;

/// Routes mounted at `/export`.
///
/// ```text
/// POST   /json?file_id=          -> export_json
/// GET    /download/{file_id}     -> download_export
/// GET    /schemas                -> list_schemas
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/json", post(export::export_json))
        .route("/download/{file_id}", get(export::download_export))
        .route("/schemas", get(export::list_schemas))
}
