use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use ember_types::api::{Claims, MatchListResponse, MessageResponse, SendMessageRequest};
use ember_types::events::NotificationEvent;
use ember_types::models::{Match, MessageKind};

use crate::AppState;
use crate::error::{ApiError, join_error};

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Cursor-based pagination — pass the `created_at` of the oldest
    /// message from the previous page to fetch older messages.
    pub before: Option<String>,
}

fn default_limit() -> u32 {
    50
}

/// GET /matches — the caller's match list (summary projection), newest
/// activity first.
pub async fn list_matches(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let uid = claims.sub.clone();

    let matches = tokio::task::spawn_blocking(move || db.list_summaries(&uid))
        .await
        .map_err(join_error)??;

    Ok(Json(MatchListResponse { matches }))
}

/// GET /matches/{match_id}/messages — thread page for a participant.
pub async fn get_messages(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    Query(query): Query<MessageQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let uid = claims.sub.clone();
    let limit = query.limit.min(200);
    let before = query.before;

    let messages = tokio::task::spawn_blocking(move || {
        require_participant(&db, &match_id, &uid)?;
        db.list_messages(&match_id, limit, before.as_deref())
    })
    .await
    .map_err(join_error)??;

    let messages: Vec<MessageResponse> = messages
        .into_iter()
        .map(|m| MessageResponse {
            id: m.id,
            match_id: m.match_id,
            sender_id: m.sender_id,
            body: m.body,
            kind: m.kind,
            is_read: m.is_read,
            created_at: m.created_at,
        })
        .collect();

    Ok(Json(messages))
}

/// POST /matches/{match_id}/messages — append to an unlocked thread.
pub async fn send_message(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.body.trim().is_empty() {
        return Err(ApiError::Validation("message body is required".into()));
    }

    let db = state.db.clone();
    let uid = claims.sub.clone();
    let mid = match_id.clone();
    let body = req.body.clone();

    let (message, recipient) = tokio::task::spawn_blocking(move || -> Result<_, ApiError> {
        let m = require_participant(&db, &mid, &uid)?;
        if !m.status.is_terminal() {
            return Err(ApiError::Validation("match is not unlocked for chat".into()));
        }
        let recipient = m.counterpart_of(&uid).unwrap_or_default().to_string();
        let message = db.append_message(&mid, &uid, &body, MessageKind::User)?;
        Ok((message, recipient))
    })
    .await
    .map_err(join_error)??;

    state.notifier.emit(NotificationEvent::MessageCreated {
        match_id: message.match_id.clone(),
        sender_id: message.sender_id.clone(),
        recipient_id: recipient,
    });

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            id: message.id,
            match_id: message.match_id,
            sender_id: message.sender_id,
            body: message.body,
            kind: message.kind,
            is_read: message.is_read,
            created_at: message.created_at,
        }),
    ))
}

/// POST /matches/{match_id}/read — reset the caller's unread counter.
pub async fn mark_read(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let uid = claims.sub.clone();

    tokio::task::spawn_blocking(move || db.mark_read(&uid, &match_id))
        .await
        .map_err(join_error)??;

    Ok(Json(serde_json::json!({ "ok": true })))
}

/// Loads the match and checks membership; a non-participant gets the
/// same NotFound as a missing match, so ids don't leak.
fn require_participant(
    db: &ember_db::Database,
    match_id: &str,
    uid: &str,
) -> Result<Match, ember_db::StoreError> {
    let m = db.get_match(match_id)?.ok_or(ember_db::StoreError::NotFound)?;
    if !m.has_participant(uid) {
        return Err(ember_db::StoreError::NotFound);
    }
    Ok(m)
}
