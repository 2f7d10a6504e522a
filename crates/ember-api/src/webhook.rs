use axum::{Json, extract::State, http::HeaderMap, response::IntoResponse};
use tracing::info;

use ember_types::api::{AcceptedResponse, MatchEventRequest};

use crate::AppState;
use crate::error::{ApiError, join_error};
use crate::middleware::check_shared_secret;

/// POST /webhook/match-event — at-least-once MATCH events from the
/// transport. The secret check runs before the body is even parsed, and
/// the response only says the event was durably consumed; the greeting
/// itself lands later via the delivery worker.
pub async fn match_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<impl IntoResponse, ApiError> {
    check_shared_secret(&headers, &state.webhook_secret)?;

    let req: MatchEventRequest = serde_json::from_str(&body)
        .map_err(|e| ApiError::Validation(format!("malformed event: {}", e)))?;

    if req.match_id.is_empty() || req.user_id.is_empty() {
        return Err(ApiError::Validation("match_id and user_id are required".into()));
    }
    if req.event_type != "MATCH" {
        return Err(ApiError::Validation(format!(
            "unrecognized event type '{}'",
            req.event_type
        )));
    }

    let db = state.db.clone();
    let cfg = state.greeting;
    let match_id = req.match_id.clone();
    let user_id = req.user_id.clone();

    let outcome = tokio::task::spawn_blocking(move || {
        ember_engage::greeter::schedule_greeting(&db, &cfg, &match_id, &user_id)
    })
    .await
    .map_err(join_error)?
    .map_err(|e| {
        tracing::error!("Greeting scheduling failed for {}: {}", req.match_id, e);
        ApiError::Upstream
    })?;

    info!("Match event for {}: {:?}", req.match_id, outcome);

    // Ineligible events (no bot, unknown match) were still consumed; the
    // transport must not retry them.
    Ok(Json(AcceptedResponse { accepted: true }))
}
