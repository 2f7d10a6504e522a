use serde::{Deserialize, Serialize};

use crate::models::MatchStatus;

/// Events handed to the external notification transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum NotificationEvent {
    /// A new match record came into existence.
    MatchCreated {
        match_id: String,
        participants: [String; 2],
        status: MatchStatus,
    },

    /// A pending match was promoted by the second participant.
    MatchPromoted {
        match_id: String,
        participants: [String; 2],
        status: MatchStatus,
    },

    /// A bot greeting landed in a match thread.
    GreetingDelivered {
        match_id: String,
        bot_id: String,
        human_id: String,
    },

    /// A participant posted a message.
    MessageCreated {
        match_id: String,
        sender_id: String,
        recipient_id: String,
    },
}

impl NotificationEvent {
    /// The match this event is scoped to.
    pub fn match_id(&self) -> &str {
        match self {
            Self::MatchCreated { match_id, .. } => match_id,
            Self::MatchPromoted { match_id, .. } => match_id,
            Self::GreetingDelivered { match_id, .. } => match_id,
            Self::MessageCreated { match_id, .. } => match_id,
        }
    }
}
