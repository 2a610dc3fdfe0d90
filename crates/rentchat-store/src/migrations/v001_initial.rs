//! v001 -- Initial schema creation.
//!
//! Creates `threads` (the materialized conversation summaries) and
//! `messages` (the append-only log).

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Threads
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS threads (
    id             TEXT PRIMARY KEY NOT NULL,
    user_name      TEXT NOT NULL,
    avatar         TEXT NOT NULL,
    equipment_name TEXT NOT NULL,
    last_message   TEXT NOT NULL DEFAULT '',
    timestamp      INTEGER NOT NULL,             -- unix millis
    unread         INTEGER NOT NULL DEFAULT 0 CHECK (unread >= 0)
);

CREATE INDEX IF NOT EXISTS idx_threads_ts ON threads(timestamp DESC);

-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    seq         INTEGER PRIMARY KEY AUTOINCREMENT, -- insertion order, breaks timestamp ties
    id          TEXT NOT NULL UNIQUE,              -- UUID v4
    thread_id   TEXT NOT NULL,                     -- FK -> threads(id)
    text        TEXT NOT NULL DEFAULT '',
    attachments TEXT NOT NULL DEFAULT '[]',        -- JSON array
    sender_id   TEXT NOT NULL,
    sender_name TEXT NOT NULL,
    timestamp   INTEGER NOT NULL,                  -- unix millis
    read        INTEGER NOT NULL DEFAULT 0,        -- boolean 0/1

    FOREIGN KEY (thread_id) REFERENCES threads(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_messages_thread_ts
    ON messages(thread_id, timestamp ASC, seq ASC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
