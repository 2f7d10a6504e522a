use axum::{Extension, Json, extract::State, response::IntoResponse};
use rand::Rng;
use rand::seq::SliceRandom;

use ember_types::api::Claims;
use ember_types::models::UserProfile;

use crate::AppState;
use crate::error::{ApiError, join_error};

/// Uniform shuffle, split out so tests can drive it with a seeded RNG.
/// Production passes `rand::rng()`.
pub fn shuffle_candidates<R: Rng + ?Sized>(candidates: &mut [UserProfile], rng: &mut R) {
    candidates.shuffle(rng);
}

/// GET /candidates — every profile the caller can still swipe on, in a
/// fresh random order per request. The interaction store is the source
/// of truth for duplicate-prevention, so a slightly stale candidate list
/// is harmless.
pub async fn list_candidates(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let uid = claims.sub.clone();

    let mut candidates = tokio::task::spawn_blocking(move || db.list_candidates(&uid))
        .await
        .map_err(join_error)??;

    shuffle_candidates(&mut candidates, &mut rand::rng());

    Ok(Json(candidates))
}
