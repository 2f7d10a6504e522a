use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use uuid::Uuid;

use ember_types::models::{
    Interaction, Match, MatchOutcome, MatchStatus, MatchSummary, Message, MessageKind,
    RewindOutcome, SwipeKind, UserProfile,
};

use crate::Database;
use crate::error::{Result, StoreError};
use crate::models::{
    GreetingTask, InteractionRow, MatchRow, MessageRow, ProfileRow, SummaryRow, parse_timestamp,
};

/// Result of recording one swipe: the interaction always lands (or the
/// whole call fails), the match record reflects what resolution did.
#[derive(Debug)]
pub struct SwipeRecord {
    pub interaction: Interaction,
    pub outcome: MatchOutcome,
    pub match_record: Option<Match>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    Scheduled,
    AlreadyScheduled,
    AlreadyGreeted,
}

#[derive(Debug, Clone)]
pub enum DeliverOutcome {
    Delivered { bot_id: String, human_id: String },
    /// Task gone, already delivered, or a greeting already exists.
    AlreadyDone,
}

impl Database {
    // -- Profiles --

    pub fn insert_profile(
        &self,
        uid: &str,
        display_name: &str,
        bio: &str,
        images: &[String],
        is_bot: bool,
    ) -> Result<()> {
        let images_json = serde_json::to_string(images)
            .map_err(|e| StoreError::Invalid(format!("images for '{}': {}", uid, e)))?;
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO profiles (uid, display_name, bio, images, is_bot)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![uid, display_name, bio, images_json, is_bot],
            )?;
            Ok(())
        })
    }

    pub fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>> {
        self.with_conn(|conn| match query_profile(conn, uid)? {
            Some(row) => Ok(Some(row.into_profile()?)),
            None => Ok(None),
        })
    }

    /// Everyone the requester can still swipe on: all profiles minus the
    /// requester and minus every target they already decided on. Ordering
    /// is storage order; the caller shuffles.
    pub fn list_candidates(&self, uid: &str) -> Result<Vec<UserProfile>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT uid, display_name, bio, images, is_bot, created_at
                 FROM profiles
                 WHERE uid != ?1
                   AND uid NOT IN (SELECT target_id FROM interactions WHERE actor_id = ?1)",
            )?;
            let rows = stmt
                .query_map([uid], |row| {
                    Ok(ProfileRow {
                        uid: row.get(0)?,
                        display_name: row.get(1)?,
                        bio: row.get(2)?,
                        images: row.get(3)?,
                        is_bot: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter().map(|r| r.into_profile()).collect()
        })
    }

    // -- Swipes --

    pub fn get_interaction(&self, actor_id: &str, target_id: &str) -> Result<Option<Interaction>> {
        self.with_conn(|conn| match query_interaction(conn, actor_id, target_id)? {
            Some(row) => Ok(Some(row.into_interaction()?)),
            None => Ok(None),
        })
    }

    /// Record one decision and resolve the pair's match state, in a single
    /// transaction. A duplicate (actor, target) pair fails with Conflict
    /// and leaves storage untouched; the interaction insert and whatever
    /// match mutation resolution decides are all-or-nothing.
    pub fn record_swipe(&self, actor_id: &str, target_id: &str, kind: SwipeKind) -> Result<SwipeRecord> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            if query_profile(&tx, target_id)?.is_none() {
                return Err(StoreError::NotFound);
            }

            // Serialization point for duplicate-swipe prevention: the
            // check and the insert share the writer transaction.
            if query_interaction(&tx, actor_id, target_id)?.is_some() {
                return Err(StoreError::Conflict);
            }

            tx.execute(
                "INSERT INTO interactions (actor_id, target_id, kind) VALUES (?1, ?2, ?3)",
                rusqlite::params![actor_id, target_id, kind.as_str()],
            )?;

            let (outcome, match_record) = resolve_match(&tx, actor_id, target_id, kind)?;

            tx.commit()?;

            Ok(SwipeRecord {
                interaction: Interaction {
                    actor_id: actor_id.to_string(),
                    target_id: target_id.to_string(),
                    kind,
                    created_at: chrono::Utc::now(),
                },
                outcome,
                match_record,
            })
        })
    }

    // -- Rewind --

    /// Reverse the caller's unresolved swipe behind `match_id`. Deletes
    /// the pending match AND the initiating interaction in one
    /// transaction, so candidacy reopens atomically. Everything else
    /// (missing match, terminal status, caller not the initiator) is a
    /// safe no-op: rewind never undoes a real match and is idempotent.
    pub fn rewind(&self, actor_id: &str, match_id: &str) -> Result<RewindOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            // Status re-check happens inside the transaction: a match
            // promoted by a concurrent swipe is already `matched` here.
            let m = match query_match(&tx, match_id)? {
                Some(row) => row.into_match()?,
                None => return Ok(RewindOutcome::Noop),
            };
            if m.status != MatchStatus::Pending {
                return Ok(RewindOutcome::Noop);
            }
            let Some(counterpart) = m.counterpart_of(actor_id) else {
                return Ok(RewindOutcome::Noop);
            };

            // Only the positive swipe that opened the pending match is
            // rewindable; a bystander dislike never deletes the match.
            let initiated = query_interaction(&tx, actor_id, counterpart)?
                .map(|row| row.into_interaction())
                .transpose()?
                .is_some_and(|i| i.kind.is_positive());
            if !initiated {
                return Ok(RewindOutcome::Noop);
            }

            let counterpart = counterpart.to_string();
            tx.execute("DELETE FROM matches WHERE id = ?1", [match_id])?;
            tx.execute(
                "DELETE FROM interactions WHERE actor_id = ?1 AND target_id = ?2",
                rusqlite::params![actor_id, counterpart],
            )?;

            tx.commit()?;
            Ok(RewindOutcome::Reverted)
        })
    }

    // -- Matches --

    pub fn get_match(&self, match_id: &str) -> Result<Option<Match>> {
        self.with_conn(|conn| match query_match(conn, match_id)? {
            Some(row) => Ok(Some(row.into_match()?)),
            None => Ok(None),
        })
    }

    /// The caller's denormalized match list, newest activity first.
    pub fn list_summaries(&self, uid: &str) -> Result<Vec<MatchSummary>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT match_id, counterpart_id, last_message, last_message_at, unread_count
                 FROM match_summaries
                 WHERE user_id = ?1
                 ORDER BY last_message_at IS NULL, last_message_at DESC",
            )?;
            let rows = stmt
                .query_map([uid], |row| {
                    Ok(SummaryRow {
                        match_id: row.get(0)?,
                        counterpart_id: row.get(1)?,
                        last_message: row.get(2)?,
                        last_message_at: row.get(3)?,
                        unread_count: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter().map(|r| r.into_summary()).collect()
        })
    }

    pub fn mark_read(&self, uid: &str, match_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let updated = conn.execute(
                "UPDATE match_summaries SET unread_count = 0
                 WHERE user_id = ?1 AND match_id = ?2",
                rusqlite::params![uid, match_id],
            )?;
            if updated == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
    }

    // -- Messages --

    /// Append one message and refresh both participants' summaries in a
    /// single transaction. The recipient's unread count bumps by one; the
    /// sender's resets to what it was.
    pub fn append_message(
        &self,
        match_id: &str,
        sender_id: &str,
        body: &str,
        kind: MessageKind,
    ) -> Result<Message> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let m = match query_match(&tx, match_id)? {
                Some(row) => row.into_match()?,
                None => return Err(StoreError::NotFound),
            };
            let recipient = m
                .counterpart_of(sender_id)
                .ok_or(StoreError::NotFound)?
                .to_string();

            let message_id = Uuid::new_v4();
            tx.execute(
                "INSERT INTO messages (id, match_id, sender_id, body, kind)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![message_id.to_string(), match_id, sender_id, body, kind.as_str()],
            )?;

            upsert_summary(&tx, &recipient, match_id, sender_id, body, 1)?;
            upsert_summary(&tx, sender_id, match_id, &recipient, body, 0)?;

            tx.commit()?;

            Ok(Message {
                id: message_id,
                match_id: match_id.to_string(),
                sender_id: sender_id.to_string(),
                body: body.to_string(),
                kind,
                is_read: false,
                created_at: chrono::Utc::now(),
            })
        })
    }

    /// Thread page, newest first. `before` is the created_at cursor of the
    /// oldest message from the previous page.
    pub fn list_messages(&self, match_id: &str, limit: u32, before: Option<&str>) -> Result<Vec<Message>> {
        self.with_conn(|conn| {
            let mut rows: Vec<MessageRow> = Vec::new();
            let mut push = |row: &rusqlite::Row<'_>| -> std::result::Result<(), rusqlite::Error> {
                rows.push(MessageRow {
                    id: row.get(0)?,
                    match_id: row.get(1)?,
                    sender_id: row.get(2)?,
                    body: row.get(3)?,
                    kind: row.get(4)?,
                    is_read: row.get(5)?,
                    created_at: row.get(6)?,
                });
                Ok(())
            };

            match before {
                Some(cursor) => {
                    let mut stmt = conn.prepare(
                        "SELECT id, match_id, sender_id, body, kind, is_read, created_at
                         FROM messages
                         WHERE match_id = ?1 AND created_at < ?2
                         ORDER BY created_at DESC, rowid DESC
                         LIMIT ?3",
                    )?;
                    let mut q = stmt.query(rusqlite::params![match_id, cursor, limit])?;
                    while let Some(row) = q.next()? {
                        push(row)?;
                    }
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT id, match_id, sender_id, body, kind, is_read, created_at
                         FROM messages
                         WHERE match_id = ?1
                         ORDER BY created_at DESC, rowid DESC
                         LIMIT ?2",
                    )?;
                    let mut q = stmt.query(rusqlite::params![match_id, limit])?;
                    while let Some(row) = q.next()? {
                        push(row)?;
                    }
                }
            }

            rows.into_iter().map(|r| r.into_message()).collect()
        })
    }

    /// Whether any bot-authored message already sits in the thread. This
    /// is the idempotency probe for greeting delivery.
    pub fn has_bot_message(&self, match_id: &str) -> Result<bool> {
        self.with_conn(|conn| bot_message_exists(conn, match_id))
    }

    // -- Greeting tasks --

    /// Enqueue the one durable greeting for a match, `delay_secs` from
    /// now. Safe under webhook redelivery: an existing task or an already
    /// greeted thread short-circuits without touching storage.
    pub fn schedule_greeting(
        &self,
        match_id: &str,
        bot_id: &str,
        human_id: &str,
        delay_secs: u64,
    ) -> Result<ScheduleOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let existing: Option<String> = tx
                .query_row(
                    "SELECT status FROM greeting_tasks WHERE match_id = ?1",
                    [match_id],
                    |row| row.get(0),
                )
                .optional()?;
            if existing.is_some() {
                return Ok(ScheduleOutcome::AlreadyScheduled);
            }
            if bot_message_exists(&tx, match_id)? {
                return Ok(ScheduleOutcome::AlreadyGreeted);
            }

            tx.execute(
                "INSERT INTO greeting_tasks (match_id, bot_id, human_id, deliver_at)
                 VALUES (?1, ?2, ?3, datetime('now', '+' || ?4 || ' seconds'))",
                rusqlite::params![match_id, bot_id, human_id, delay_secs as i64],
            )?;

            tx.commit()?;
            Ok(ScheduleOutcome::Scheduled)
        })
    }

    /// Scheduled tasks whose deliver_at has passed.
    pub fn due_greetings(&self, limit: u32) -> Result<Vec<GreetingTask>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT match_id, bot_id, human_id, deliver_at
                 FROM greeting_tasks
                 WHERE status = 'scheduled' AND deliver_at <= datetime('now')
                 ORDER BY deliver_at
                 LIMIT ?1",
            )?;
            let rows = stmt
                .query_map([limit], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(match_id, bot_id, human_id, deliver_at)| {
                    Ok(GreetingTask {
                        match_id,
                        bot_id,
                        human_id,
                        deliver_at: parse_timestamp(&deliver_at)?,
                    })
                })
                .collect()
        })
    }

    /// Execute one claimed greeting: append the bot message and refresh
    /// both summaries, all inside the transaction that also re-checks the
    /// task and the thread. Redelivered or raced tasks collapse to
    /// AlreadyDone.
    pub fn deliver_greeting(&self, match_id: &str, body: &str) -> Result<DeliverOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let task: Option<(String, String)> = tx
                .query_row(
                    "SELECT bot_id, human_id FROM greeting_tasks
                     WHERE match_id = ?1 AND status = 'scheduled'",
                    [match_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            let Some((bot_id, human_id)) = task else {
                return Ok(DeliverOutcome::AlreadyDone);
            };

            if bot_message_exists(&tx, match_id)? {
                tx.execute(
                    "UPDATE greeting_tasks SET status = 'delivered' WHERE match_id = ?1",
                    [match_id],
                )?;
                tx.commit()?;
                return Ok(DeliverOutcome::AlreadyDone);
            }

            tx.execute(
                "INSERT INTO messages (id, match_id, sender_id, body, kind)
                 VALUES (?1, ?2, ?3, ?4, 'user')",
                rusqlite::params![Uuid::new_v4().to_string(), match_id, bot_id, body],
            )?;

            upsert_summary(&tx, &human_id, match_id, &bot_id, body, 1)?;
            upsert_summary(&tx, &bot_id, match_id, &human_id, body, 0)?;

            tx.execute(
                "UPDATE greeting_tasks SET status = 'delivered' WHERE match_id = ?1",
                [match_id],
            )?;

            tx.commit()?;
            Ok(DeliverOutcome::Delivered { bot_id, human_id })
        })
    }
}

// -- Resolution --

/// Match resolution for a freshly inserted interaction. Runs on the same
/// transaction as the insert.
fn resolve_match(
    conn: &Connection,
    actor_id: &str,
    target_id: &str,
    kind: SwipeKind,
) -> Result<(MatchOutcome, Option<Match>)> {
    let match_id = Match::key_for(actor_id, target_id);

    let existing = match query_match(conn, &match_id)? {
        Some(row) => Some(row.into_match()?),
        None => None,
    };

    match existing {
        None => {
            if !kind.is_positive() {
                return Ok((MatchOutcome::NoMatch, None));
            }
            // A superlike matches instantly for chat-unlock purposes.
            let status = if kind == SwipeKind::Superlike {
                MatchStatus::Superliked
            } else {
                MatchStatus::Pending
            };
            let (user_a, user_b) = if actor_id <= target_id {
                (actor_id, target_id)
            } else {
                (target_id, actor_id)
            };
            conn.execute(
                "INSERT INTO matches (id, user_a, user_b, status) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![match_id, user_a, user_b, status.as_str()],
            )?;
            if status.is_terminal() {
                ensure_summary(conn, user_a, &match_id, user_b)?;
                ensure_summary(conn, user_b, &match_id, user_a)?;
            }

            let created = query_match(conn, &match_id)?
                .ok_or(StoreError::NotFound)?
                .into_match()?;
            Ok((MatchOutcome::Created, Some(created)))
        }
        Some(m) if m.status == MatchStatus::Pending && kind.is_positive() => {
            // The other participant reciprocated. The status guard makes
            // the promotion a no-op if a concurrent writer got here first.
            let promoted = conn.execute(
                "UPDATE matches SET status = 'matched' WHERE id = ?1 AND status = 'pending'",
                [match_id.as_str()],
            )?;
            if promoted == 0 {
                return Ok((MatchOutcome::Unchanged, Some(m)));
            }
            ensure_summary(conn, &m.user_a, &match_id, &m.user_b)?;
            ensure_summary(conn, &m.user_b, &match_id, &m.user_a)?;

            let updated = query_match(conn, &match_id)?
                .ok_or(StoreError::NotFound)?
                .into_match()?;
            Ok((MatchOutcome::Promoted, Some(updated)))
        }
        // A dislike never tears down the other side's pending interest,
        // and terminal matches absorb further swipes without error.
        Some(m) => Ok((MatchOutcome::Unchanged, Some(m))),
    }
}

// -- Row helpers --

fn query_profile(conn: &Connection, uid: &str) -> Result<Option<ProfileRow>> {
    let mut stmt = conn.prepare(
        "SELECT uid, display_name, bio, images, is_bot, created_at FROM profiles WHERE uid = ?1",
    )?;
    let row = stmt
        .query_row([uid], |row| {
            Ok(ProfileRow {
                uid: row.get(0)?,
                display_name: row.get(1)?,
                bio: row.get(2)?,
                images: row.get(3)?,
                is_bot: row.get(4)?,
                created_at: row.get(5)?,
            })
        })
        .optional()?;
    Ok(row)
}

fn query_interaction(conn: &Connection, actor_id: &str, target_id: &str) -> Result<Option<InteractionRow>> {
    let mut stmt = conn.prepare(
        "SELECT actor_id, target_id, kind, created_at
         FROM interactions WHERE actor_id = ?1 AND target_id = ?2",
    )?;
    let row = stmt
        .query_row([actor_id, target_id], |row| {
            Ok(InteractionRow {
                actor_id: row.get(0)?,
                target_id: row.get(1)?,
                kind: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;
    Ok(row)
}

fn query_match(conn: &Connection, match_id: &str) -> Result<Option<MatchRow>> {
    let mut stmt = conn
        .prepare("SELECT id, user_a, user_b, status, created_at FROM matches WHERE id = ?1")?;
    let row = stmt
        .query_row([match_id], |row| {
            Ok(MatchRow {
                id: row.get(0)?,
                user_a: row.get(1)?,
                user_b: row.get(2)?,
                status: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;
    Ok(row)
}

fn bot_message_exists(conn: &Connection, match_id: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM messages m
         JOIN profiles p ON p.uid = m.sender_id
         WHERE m.match_id = ?1 AND p.is_bot = 1",
        [match_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Seed an empty summary row if the participant has none yet.
fn ensure_summary(conn: &Connection, user_id: &str, match_id: &str, counterpart_id: &str) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO match_summaries (user_id, match_id, counterpart_id)
         VALUES (?1, ?2, ?3)",
        rusqlite::params![user_id, match_id, counterpart_id],
    )?;
    Ok(())
}

fn upsert_summary(
    conn: &Connection,
    user_id: &str,
    match_id: &str,
    counterpart_id: &str,
    last_message: &str,
    unread_bump: i64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO match_summaries
             (user_id, match_id, counterpart_id, last_message, last_message_at, unread_count)
         VALUES (?1, ?2, ?3, ?4, datetime('now'), ?5)
         ON CONFLICT(user_id, match_id) DO UPDATE SET
             last_message = excluded.last_message,
             last_message_at = excluded.last_message_at,
             unread_count = unread_count + ?5",
        rusqlite::params![user_id, match_id, counterpart_id, last_message, unread_bump],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        let path = std::env::temp_dir().join(format!("ember-test-{}.db", Uuid::new_v4()));
        let db = Database::open(&path).unwrap();
        for (uid, name, bot) in [
            ("u1", "Ada", false),
            ("u2", "Grace", false),
            ("u3", "Edsger", false),
            ("b1", "Iris", true),
        ] {
            db.insert_profile(uid, name, "", &[], bot).unwrap();
        }
        db
    }

    fn interaction_count(db: &Database) -> i64 {
        db.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM interactions", [], |r| r.get(0))?)
        })
        .unwrap()
    }

    fn match_count_for(db: &Database, match_id: &str) -> i64 {
        db.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM matches WHERE id = ?1",
                [match_id],
                |r| r.get(0),
            )?)
        })
        .unwrap()
    }

    #[test]
    fn duplicate_swipe_conflicts_and_leaves_storage_unchanged() {
        let db = test_db();
        db.record_swipe("u1", "u2", SwipeKind::Like).unwrap();
        assert_eq!(interaction_count(&db), 1);

        let err = db.record_swipe("u1", "u2", SwipeKind::Dislike).unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(interaction_count(&db), 1);
        assert_eq!(
            db.get_interaction("u1", "u2").unwrap().unwrap().kind,
            SwipeKind::Like
        );
    }

    #[test]
    fn like_creates_pending_and_reciprocity_promotes() {
        let db = test_db();

        let first = db.record_swipe("u1", "u2", SwipeKind::Like).unwrap();
        assert_eq!(first.outcome, MatchOutcome::Created);
        let m = first.match_record.unwrap();
        assert_eq!(m.status, MatchStatus::Pending);
        assert_eq!(m.id, Match::key_for("u2", "u1"));

        let second = db.record_swipe("u2", "u1", SwipeKind::Like).unwrap();
        assert_eq!(second.outcome, MatchOutcome::Promoted);
        assert_eq!(second.match_record.unwrap().status, MatchStatus::Matched);

        // At most one match record per unordered pair.
        assert_eq!(match_count_for(&db, &m.id), 1);
    }

    #[test]
    fn superlike_matches_instantly() {
        let db = test_db();
        let rec = db.record_swipe("u1", "u2", SwipeKind::Superlike).unwrap();
        assert_eq!(rec.outcome, MatchOutcome::Created);
        assert_eq!(rec.match_record.unwrap().status, MatchStatus::Superliked);
    }

    #[test]
    fn dislike_creates_no_match_and_excludes_candidate() {
        let db = test_db();
        let rec = db.record_swipe("u1", "u2", SwipeKind::Dislike).unwrap();
        assert_eq!(rec.outcome, MatchOutcome::NoMatch);
        assert!(rec.match_record.is_none());
        assert!(db.get_match(&Match::key_for("u1", "u2")).unwrap().is_none());

        let uids: Vec<String> = db
            .list_candidates("u1")
            .unwrap()
            .into_iter()
            .map(|p| p.uid)
            .collect();
        assert!(!uids.contains(&"u1".to_string()));
        assert!(!uids.contains(&"u2".to_string()));
        assert!(uids.contains(&"u3".to_string()));
    }

    #[test]
    fn dislike_does_not_tear_down_the_other_sides_pending() {
        let db = test_db();
        db.record_swipe("u1", "u2", SwipeKind::Like).unwrap();

        let rec = db.record_swipe("u2", "u1", SwipeKind::Dislike).unwrap();
        assert_eq!(rec.outcome, MatchOutcome::Unchanged);
        let m = db.get_match(&Match::key_for("u1", "u2")).unwrap().unwrap();
        assert_eq!(m.status, MatchStatus::Pending);
    }

    #[test]
    fn swipe_on_terminal_match_is_unchanged_not_an_error() {
        let db = test_db();
        db.record_swipe("u1", "u2", SwipeKind::Superlike).unwrap();

        let rec = db.record_swipe("u2", "u1", SwipeKind::Like).unwrap();
        assert_eq!(rec.outcome, MatchOutcome::Unchanged);
        assert_eq!(rec.match_record.unwrap().status, MatchStatus::Superliked);
    }

    #[test]
    fn swipe_on_unknown_target_is_not_found() {
        let db = test_db();
        let err = db.record_swipe("u1", "ghost", SwipeKind::Like).unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
        assert_eq!(interaction_count(&db), 0);
    }

    #[test]
    fn rewind_reverts_pending_and_reopens_candidacy() {
        let db = test_db();
        let rec = db.record_swipe("u1", "u2", SwipeKind::Like).unwrap();
        let match_id = rec.match_record.unwrap().id;

        assert_eq!(db.rewind("u1", &match_id).unwrap(), RewindOutcome::Reverted);
        assert!(db.get_match(&match_id).unwrap().is_none());
        assert!(db.get_interaction("u1", "u2").unwrap().is_none());

        let uids: Vec<String> = db
            .list_candidates("u1")
            .unwrap()
            .into_iter()
            .map(|p| p.uid)
            .collect();
        assert!(uids.contains(&"u2".to_string()));

        // Idempotent: a second rewind is a quiet no-op.
        assert_eq!(db.rewind("u1", &match_id).unwrap(), RewindOutcome::Noop);
    }

    #[test]
    fn rewind_never_deletes_a_terminal_match() {
        let db = test_db();
        db.record_swipe("u1", "u2", SwipeKind::Like).unwrap();
        db.record_swipe("u2", "u1", SwipeKind::Like).unwrap();
        let match_id = Match::key_for("u1", "u2");

        assert_eq!(db.rewind("u1", &match_id).unwrap(), RewindOutcome::Noop);
        let m = db.get_match(&match_id).unwrap().unwrap();
        assert_eq!(m.status, MatchStatus::Matched);
        assert!(db.get_interaction("u1", "u2").unwrap().is_some());
    }

    #[test]
    fn rewind_by_outsider_or_on_missing_match_is_noop() {
        let db = test_db();
        let rec = db.record_swipe("u1", "u2", SwipeKind::Like).unwrap();
        let match_id = rec.match_record.unwrap().id;

        assert_eq!(db.rewind("u3", &match_id).unwrap(), RewindOutcome::Noop);
        assert_eq!(db.rewind("u1", "nope_nope").unwrap(), RewindOutcome::Noop);
        assert!(db.get_match(&match_id).unwrap().is_some());
    }

    #[test]
    fn rewind_by_the_disliking_side_keeps_the_pending_match() {
        let db = test_db();
        db.record_swipe("u1", "u2", SwipeKind::Like).unwrap();
        db.record_swipe("u2", "u1", SwipeKind::Dislike).unwrap();
        let match_id = Match::key_for("u1", "u2");

        // u2's interaction is a dislike, not the swipe that opened the
        // match; nothing to revert from their side.
        assert_eq!(db.rewind("u2", &match_id).unwrap(), RewindOutcome::Noop);
        assert!(db.get_match(&match_id).unwrap().is_some());
    }

    #[test]
    fn candidates_exclude_self_and_all_interacted_targets() {
        let db = test_db();
        db.record_swipe("u1", "u2", SwipeKind::Like).unwrap();
        db.record_swipe("u1", "b1", SwipeKind::Dislike).unwrap();

        let uids: Vec<String> = db
            .list_candidates("u1")
            .unwrap()
            .into_iter()
            .map(|p| p.uid)
            .collect();
        assert_eq!(uids, vec!["u3".to_string()]);
    }

    #[test]
    fn message_append_updates_both_summaries_and_mark_read_resets() {
        let db = test_db();
        db.record_swipe("u1", "u2", SwipeKind::Like).unwrap();
        db.record_swipe("u2", "u1", SwipeKind::Like).unwrap();
        let match_id = Match::key_for("u1", "u2");

        db.append_message(&match_id, "u1", "hey!", MessageKind::User).unwrap();

        let for_u2 = &db.list_summaries("u2").unwrap()[0];
        assert_eq!(for_u2.last_message.as_deref(), Some("hey!"));
        assert_eq!(for_u2.unread_count, 1);
        assert_eq!(for_u2.counterpart_id, "u1");

        let for_u1 = &db.list_summaries("u1").unwrap()[0];
        assert_eq!(for_u1.last_message.as_deref(), Some("hey!"));
        assert_eq!(for_u1.unread_count, 0);

        db.mark_read("u2", &match_id).unwrap();
        assert_eq!(db.list_summaries("u2").unwrap()[0].unread_count, 0);
    }

    #[test]
    fn append_message_requires_match_and_participant() {
        let db = test_db();
        assert!(matches!(
            db.append_message("u1_u2", "u1", "hi", MessageKind::User),
            Err(StoreError::NotFound)
        ));

        db.record_swipe("u1", "u2", SwipeKind::Superlike).unwrap();
        assert!(matches!(
            db.append_message(&Match::key_for("u1", "u2"), "u3", "hi", MessageKind::User),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn greeting_schedule_is_idempotent_and_delivery_is_exactly_once() {
        let db = test_db();
        db.record_swipe("u1", "b1", SwipeKind::Like).unwrap();
        let match_id = Match::key_for("u1", "b1");

        assert_eq!(
            db.schedule_greeting(&match_id, "b1", "u1", 0).unwrap(),
            ScheduleOutcome::Scheduled
        );
        // Webhook redelivery.
        assert_eq!(
            db.schedule_greeting(&match_id, "b1", "u1", 0).unwrap(),
            ScheduleOutcome::AlreadyScheduled
        );

        let due = db.due_greetings(10).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].bot_id, "b1");

        let outcome = db.deliver_greeting(&match_id, "hi there!").unwrap();
        assert!(matches!(outcome, DeliverOutcome::Delivered { .. }));
        assert!(db.has_bot_message(&match_id).unwrap());

        // Second delivery pass finds nothing to do.
        assert!(matches!(
            db.deliver_greeting(&match_id, "hi again!").unwrap(),
            DeliverOutcome::AlreadyDone
        ));
        let messages = db.list_messages(&match_id, 50, None).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender_id, "b1");

        // Summaries per the bot-greeting contract.
        let human_side = &db.list_summaries("u1").unwrap()[0];
        assert_eq!(human_side.last_message.as_deref(), Some("hi there!"));
        assert!(human_side.unread_count >= 1);
        let bot_side = &db.list_summaries("b1").unwrap()[0];
        assert_eq!(bot_side.last_message.as_deref(), Some("hi there!"));
    }

    #[test]
    fn greeting_not_due_until_delay_elapses() {
        let db = test_db();
        db.record_swipe("u1", "b1", SwipeKind::Like).unwrap();
        let match_id = Match::key_for("u1", "b1");

        db.schedule_greeting(&match_id, "b1", "u1", 3600).unwrap();
        assert!(db.due_greetings(10).unwrap().is_empty());
    }

    #[test]
    fn schedule_after_manual_bot_message_is_already_greeted() {
        let db = test_db();
        db.record_swipe("u1", "b1", SwipeKind::Superlike).unwrap();
        let match_id = Match::key_for("u1", "b1");
        db.append_message(&match_id, "b1", "hello!", MessageKind::User).unwrap();

        assert_eq!(
            db.schedule_greeting(&match_id, "b1", "u1", 0).unwrap(),
            ScheduleOutcome::AlreadyGreeted
        );
    }

    #[test]
    fn promotion_seeds_empty_summaries_for_both_sides() {
        let db = test_db();
        db.record_swipe("u1", "u2", SwipeKind::Like).unwrap();
        assert!(db.list_summaries("u1").unwrap().is_empty());

        db.record_swipe("u2", "u1", SwipeKind::Like).unwrap();
        let s1 = db.list_summaries("u1").unwrap();
        let s2 = db.list_summaries("u2").unwrap();
        assert_eq!(s1.len(), 1);
        assert_eq!(s2.len(), 1);
        assert!(s1[0].last_message.is_none());
        assert_eq!(s1[0].unread_count, 0);
    }

    #[test]
    fn message_pagination_pages_backwards() {
        let db = test_db();
        db.record_swipe("u1", "u2", SwipeKind::Superlike).unwrap();
        let match_id = Match::key_for("u1", "u2");
        for i in 0..5 {
            db.append_message(&match_id, "u1", &format!("m{}", i), MessageKind::User)
                .unwrap();
        }

        let page = db.list_messages(&match_id, 2, None).unwrap();
        assert_eq!(page.len(), 2);
        let all = db.list_messages(&match_id, 50, None).unwrap();
        assert_eq!(all.len(), 5);
        // Newest first.
        assert_eq!(all[0].body, "m4");
    }
}
