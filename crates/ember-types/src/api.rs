use serde::{Deserialize, Serialize};

use crate::models::{MatchStatus, MatchSummary, MessageKind};

// -- JWT Claims --

/// JWT claims issued by the external identity service. Canonical
/// definition lives here so the middleware and any future gateway share
/// one shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Verified user id.
    pub sub: String,
    pub exp: usize,
}

// -- Swipes --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SwipeRequest {
    pub target_id: String,
    /// "like" | "dislike" | "superlike", validated by the handler so a
    /// bad value is a 400, not a body-rejection.
    pub kind: String,
}

#[derive(Debug, Serialize)]
pub struct SwipeResponse {
    pub match_created: bool,
    pub status: Option<MatchStatus>,
    pub match_id: Option<String>,
}

// -- Rewind --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RewindRequest {
    pub match_id: String,
}

#[derive(Debug, Serialize)]
pub struct RewindResponse {
    pub reverted: bool,
}

// -- Match threads --

#[derive(Debug, Serialize)]
pub struct MatchListResponse {
    pub matches: Vec<MatchSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: uuid::Uuid,
    pub match_id: String,
    pub sender_id: String,
    pub body: String,
    pub kind: MessageKind,
    pub is_read: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

// -- Webhook --

#[derive(Debug, Deserialize)]
pub struct MatchEventRequest {
    pub match_id: String,
    /// Event discriminator from the transport; only "MATCH" is recognized.
    #[serde(rename = "type")]
    pub event_type: String,
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub accepted: bool,
}
