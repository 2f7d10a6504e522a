use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A swipeable profile. Owned by the identity/profile service; the
/// matching core only reads these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub uid: String,
    pub display_name: String,
    #[serde(default)]
    pub bio: String,
    /// Ordered image URIs, may be empty.
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub is_bot: bool,
    pub created_at: DateTime<Utc>,
}

/// A user's decision on a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeKind {
    Like,
    Dislike,
    Superlike,
}

impl SwipeKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "like" => Some(Self::Like),
            "dislike" => Some(Self::Dislike),
            "superlike" => Some(Self::Superlike),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Dislike => "dislike",
            Self::Superlike => "superlike",
        }
    }

    /// Dislikes never open a match.
    pub fn is_positive(&self) -> bool {
        !matches!(self, Self::Dislike)
    }
}

/// One recorded decision per ordered (actor, target) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub actor_id: String,
    pub target_id: String,
    pub kind: SwipeKind,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    /// One side has liked; removable by rewind.
    Pending,
    Matched,
    Superliked,
}

impl MatchStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "matched" => Some(Self::Matched),
            "superliked" => Some(Self::Superliked),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Matched => "matched",
            Self::Superliked => "superliked",
        }
    }

    /// Terminal statuses unlock chat and are never deleted.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// The match record for an unordered pair of users. Both participants
/// address it by the same deterministic id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: String,
    pub user_a: String,
    pub user_b: String,
    pub status: MatchStatus,
    pub created_at: DateTime<Utc>,
}

impl Match {
    /// Deterministic key for an unordered pair: sorted uids joined by `_`.
    pub fn key_for(a: &str, b: &str) -> String {
        if a <= b {
            format!("{}_{}", a, b)
        } else {
            format!("{}_{}", b, a)
        }
    }

    pub fn participants(&self) -> [&str; 2] {
        [&self.user_a, &self.user_b]
    }

    pub fn has_participant(&self, uid: &str) -> bool {
        self.user_a == uid || self.user_b == uid
    }

    /// The participant that is not `uid`, if `uid` is one of the two.
    pub fn counterpart_of(&self, uid: &str) -> Option<&str> {
        if self.user_a == uid {
            Some(&self.user_b)
        } else if self.user_b == uid {
            Some(&self.user_a)
        } else {
            None
        }
    }
}

/// What a swipe did to the pair's match state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchOutcome {
    /// A new match record was created (pending or superliked).
    Created,
    /// An existing pending match was promoted to matched.
    Promoted,
    /// Match state already terminal, or the other side disliked.
    Unchanged,
    /// Dislike with no prior match record.
    NoMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewindOutcome {
    Reverted,
    Noop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    User,
    System,
}

impl MessageKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "system" => Some(Self::System),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::System => "system",
        }
    }
}

/// One message in a match's thread. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: uuid::Uuid,
    pub match_id: String,
    pub sender_id: String,
    pub body: String,
    pub kind: MessageKind,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Per-user denormalized view of one match's thread, updated on every
/// message append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSummary {
    pub match_id: String,
    pub counterpart_id: String,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub unread_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_key_is_order_independent() {
        assert_eq!(Match::key_for("u1", "b1"), Match::key_for("b1", "u1"));
        assert_eq!(Match::key_for("u1", "b1"), "b1_u1");
    }

    #[test]
    fn pair_key_sorts_lexicographically() {
        assert_eq!(Match::key_for("alice", "bob"), "alice_bob");
        assert_eq!(Match::key_for("bob", "alice"), "alice_bob");
    }

    #[test]
    fn counterpart_resolution() {
        let m = Match {
            id: Match::key_for("u1", "u2"),
            user_a: "u1".into(),
            user_b: "u2".into(),
            status: MatchStatus::Pending,
            created_at: Utc::now(),
        };
        assert_eq!(m.counterpart_of("u1"), Some("u2"));
        assert_eq!(m.counterpart_of("u2"), Some("u1"));
        assert_eq!(m.counterpart_of("u3"), None);
    }

    #[test]
    fn swipe_kind_parse_roundtrip() {
        for kind in [SwipeKind::Like, SwipeKind::Dislike, SwipeKind::Superlike] {
            assert_eq!(SwipeKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(SwipeKind::parse("poke"), None);
    }
}
