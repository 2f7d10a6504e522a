//! Database row types and row-to-domain conversion. Rows map directly to
//! SQLite columns; the conversion functions own timestamp and enum
//! parsing so callers only ever see `ember-types` domain values.

use chrono::{DateTime, Utc};

use ember_types::models::{
    Interaction, Match, MatchStatus, MatchSummary, Message, MessageKind, SwipeKind, UserProfile,
};

use crate::error::StoreError;

pub struct ProfileRow {
    pub uid: String,
    pub display_name: String,
    pub bio: String,
    pub images: String,
    pub is_bot: bool,
    pub created_at: String,
}

pub struct InteractionRow {
    pub actor_id: String,
    pub target_id: String,
    pub kind: String,
    pub created_at: String,
}

pub struct MatchRow {
    pub id: String,
    pub user_a: String,
    pub user_b: String,
    pub status: String,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub match_id: String,
    pub sender_id: String,
    pub body: String,
    pub kind: String,
    pub is_read: bool,
    pub created_at: String,
}

pub struct SummaryRow {
    pub match_id: String,
    pub counterpart_id: String,
    pub last_message: Option<String>,
    pub last_message_at: Option<String>,
    pub unread_count: i64,
}

/// A scheduled greeting delivery, claimed by the worker once due.
#[derive(Debug, Clone)]
pub struct GreetingTask {
    pub match_id: String,
    pub bot_id: String,
    pub human_id: String,
    pub deliver_at: DateTime<Utc>,
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone;
/// values written by chrono are RFC 3339. Accept both, as naive UTC.
pub fn parse_timestamp(raw: &str) -> std::result::Result<DateTime<Utc>, StoreError> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .map_err(|e| StoreError::Invalid(format!("timestamp '{}': {}", raw, e)))
}

impl ProfileRow {
    pub fn into_profile(self) -> std::result::Result<UserProfile, StoreError> {
        let images: Vec<String> = serde_json::from_str(&self.images)
            .map_err(|e| StoreError::Invalid(format!("images for '{}': {}", self.uid, e)))?;
        Ok(UserProfile {
            created_at: parse_timestamp(&self.created_at)?,
            uid: self.uid,
            display_name: self.display_name,
            bio: self.bio,
            images,
            is_bot: self.is_bot,
        })
    }
}

impl InteractionRow {
    pub fn into_interaction(self) -> std::result::Result<Interaction, StoreError> {
        let kind = SwipeKind::parse(&self.kind)
            .ok_or_else(|| StoreError::Invalid(format!("swipe kind '{}'", self.kind)))?;
        Ok(Interaction {
            created_at: parse_timestamp(&self.created_at)?,
            actor_id: self.actor_id,
            target_id: self.target_id,
            kind,
        })
    }
}

impl MatchRow {
    pub fn into_match(self) -> std::result::Result<Match, StoreError> {
        let status = MatchStatus::parse(&self.status)
            .ok_or_else(|| StoreError::Invalid(format!("match status '{}'", self.status)))?;
        Ok(Match {
            created_at: parse_timestamp(&self.created_at)?,
            id: self.id,
            user_a: self.user_a,
            user_b: self.user_b,
            status,
        })
    }
}

impl MessageRow {
    pub fn into_message(self) -> std::result::Result<Message, StoreError> {
        let id = self
            .id
            .parse::<uuid::Uuid>()
            .map_err(|e| StoreError::Invalid(format!("message id '{}': {}", self.id, e)))?;
        let kind = MessageKind::parse(&self.kind)
            .ok_or_else(|| StoreError::Invalid(format!("message kind '{}'", self.kind)))?;
        Ok(Message {
            id,
            created_at: parse_timestamp(&self.created_at)?,
            match_id: self.match_id,
            sender_id: self.sender_id,
            body: self.body,
            kind,
            is_read: self.is_read,
        })
    }
}

impl SummaryRow {
    pub fn into_summary(self) -> std::result::Result<MatchSummary, StoreError> {
        let last_message_at = match self.last_message_at {
            Some(raw) => Some(parse_timestamp(&raw)?),
            None => None,
        };
        Ok(MatchSummary {
            match_id: self.match_id,
            counterpart_id: self.counterpart_id,
            last_message: self.last_message,
            last_message_at,
            unread_count: self.unread_count.max(0) as u32,
        })
    }
}
