use axum::{Extension, Json, extract::State, response::IntoResponse};
use tracing::debug;

use ember_types::api::{Claims, RewindRequest, RewindResponse};
use ember_types::models::RewindOutcome;

use crate::AppState;
use crate::error::{ApiError, join_error};

/// POST /rewind — reverse the caller's unresolved swipe. Anything that
/// cannot be safely reverted (terminal match, unknown id, someone
/// else's match) comes back as `reverted: false`, never an error.
pub async fn rewind(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<RewindRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.match_id.is_empty() {
        return Err(ApiError::Validation("match_id is required".into()));
    }

    let db = state.db.clone();
    let actor = claims.sub.clone();
    let match_id = req.match_id.clone();

    let outcome = tokio::task::spawn_blocking(move || db.rewind(&actor, &match_id))
        .await
        .map_err(join_error)??;

    debug!("Rewind {} on {}: {:?}", claims.sub, req.match_id, outcome);

    Ok(Json(RewindResponse {
        reverted: outcome == RewindOutcome::Reverted,
    }))
}
