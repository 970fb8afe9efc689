use axum::extract::State;
use axum::Json;
use smartrag_events::RegistryStats;

use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/ws/connections
///
/// Open connection count and subscriber count per task.
pub async fn connection_stats(State(state): State<AppState>) -> Json<DataResponse<RegistryStats>> {
    Json(DataResponse {
        data: state.registry.stats().await,
    })
}
