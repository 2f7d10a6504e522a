use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE profiles (
                uid             TEXT PRIMARY KEY,
                display_name    TEXT NOT NULL,
                bio             TEXT NOT NULL DEFAULT '',
                images          TEXT NOT NULL DEFAULT '[]',
                is_bot          INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            -- At most one decision per ordered (actor, target) pair.
            CREATE TABLE interactions (
                actor_id        TEXT NOT NULL REFERENCES profiles(uid),
                target_id       TEXT NOT NULL REFERENCES profiles(uid),
                kind            TEXT NOT NULL,
                created_at      TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (actor_id, target_id)
            );

            CREATE INDEX idx_interactions_actor
                ON interactions(actor_id);

            -- Keyed by the deterministic unordered-pair id; user_a < user_b.
            CREATE TABLE matches (
                id              TEXT PRIMARY KEY,
                user_a          TEXT NOT NULL REFERENCES profiles(uid),
                user_b          TEXT NOT NULL REFERENCES profiles(uid),
                status          TEXT NOT NULL DEFAULT 'pending',
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE messages (
                id              TEXT PRIMARY KEY,
                match_id        TEXT NOT NULL REFERENCES matches(id) ON DELETE CASCADE,
                sender_id       TEXT NOT NULL REFERENCES profiles(uid),
                body            TEXT NOT NULL,
                kind            TEXT NOT NULL DEFAULT 'user',
                is_read         INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_messages_match
                ON messages(match_id, created_at);

            CREATE TABLE match_summaries (
                user_id         TEXT NOT NULL REFERENCES profiles(uid),
                match_id        TEXT NOT NULL REFERENCES matches(id) ON DELETE CASCADE,
                counterpart_id  TEXT NOT NULL,
                last_message    TEXT,
                last_message_at TEXT,
                unread_count    INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (user_id, match_id)
            );

            -- Durable deferred greeting deliveries; one per match.
            CREATE TABLE greeting_tasks (
                match_id        TEXT PRIMARY KEY REFERENCES matches(id) ON DELETE CASCADE,
                bot_id          TEXT NOT NULL REFERENCES profiles(uid),
                human_id        TEXT NOT NULL REFERENCES profiles(uid),
                deliver_at      TEXT NOT NULL,
                status          TEXT NOT NULL DEFAULT 'scheduled',
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_greeting_due
                ON greeting_tasks(status, deliver_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    Ok(())
}
