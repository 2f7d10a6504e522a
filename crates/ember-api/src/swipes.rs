use axum::{Extension, Json, extract::State, response::IntoResponse};
use tracing::debug;

use ember_types::api::{Claims, SwipeRequest, SwipeResponse};
use ember_types::events::NotificationEvent;
use ember_types::models::{MatchOutcome, SwipeKind};

use crate::AppState;
use crate::error::{ApiError, join_error};

/// POST /swipe — record one decision and resolve the pair's match state.
/// A repeat swipe on the same target is a 409 the client treats as
/// "already recorded".
pub async fn swipe(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SwipeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = SwipeKind::parse(&req.kind)
        .ok_or_else(|| ApiError::Validation(format!("unknown swipe kind '{}'", req.kind)))?;
    if req.target_id.is_empty() {
        return Err(ApiError::Validation("target_id is required".into()));
    }
    if req.target_id == claims.sub {
        return Err(ApiError::Validation("cannot swipe on yourself".into()));
    }

    let db = state.db.clone();
    let actor = claims.sub.clone();
    let target = req.target_id.clone();

    let record = tokio::task::spawn_blocking(move || db.record_swipe(&actor, &target, kind))
        .await
        .map_err(join_error)??;

    debug!(
        "Swipe {} -> {} ({}): {:?}",
        claims.sub,
        req.target_id,
        kind.as_str(),
        record.outcome
    );

    if let Some(m) = &record.match_record {
        let participants = [m.user_a.clone(), m.user_b.clone()];
        match record.outcome {
            MatchOutcome::Created => state.notifier.emit(NotificationEvent::MatchCreated {
                match_id: m.id.clone(),
                participants,
                status: m.status,
            }),
            MatchOutcome::Promoted => state.notifier.emit(NotificationEvent::MatchPromoted {
                match_id: m.id.clone(),
                participants,
                status: m.status,
            }),
            _ => {}
        }
    }

    // "You got a match" only when this swipe produced a chat-unlocked
    // status; a fresh pending record is one-sided interest.
    let match_created = match (record.outcome, record.match_record.as_ref()) {
        (MatchOutcome::Promoted, _) => true,
        (MatchOutcome::Created, Some(m)) => m.status.is_terminal(),
        _ => false,
    };

    Ok(Json(SwipeResponse {
        match_created,
        status: record.match_record.as_ref().map(|m| m.status),
        match_id: record.match_record.map(|m| m.id),
    }))
}
