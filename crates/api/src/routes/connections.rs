use axum::routing::get;
use axum::Router;

use crate::handlers::connections;
use crate::state::AppState;

/// Routes mounted at `/ws`.
///
/// ```text
/// GET    /connections    -> connection_stats
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/connections", get(connections::connection_stats))
}
