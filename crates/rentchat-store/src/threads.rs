//! Thread directory rows.

use rusqlite::{params, Connection, OptionalExtension};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Thread;

const THREAD_COLUMNS: &str =
    "id, user_name, avatar, equipment_name, last_message, timestamp, unread";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new thread. Fails with a validation error if the id is taken.
    pub fn create_thread(&self, thread: &Thread) -> Result<()> {
        let inserted = self.conn().execute(
            "INSERT OR IGNORE INTO threads
                (id, user_name, avatar, equipment_name, last_message, timestamp, unread)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                thread.id,
                thread.user_name,
                thread.avatar,
                thread.equipment_name,
                thread.last_message,
                thread.timestamp,
                thread.unread,
            ],
        )?;
        if inserted == 0 {
            return Err(StoreError::Validation(format!(
                "thread {} already exists",
                thread.id
            )));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_thread(&self, id: &str) -> Result<Option<Thread>> {
        load_thread(self.conn(), id)
    }

    /// List all threads, most recently active first.
    pub fn list_threads(&self) -> Result<Vec<Thread>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {THREAD_COLUMNS} FROM threads ORDER BY timestamp DESC, id ASC"
        ))?;
        let rows = stmt.query_map([], row_to_thread)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }
}

// ---------------------------------------------------------------------------
// Helpers shared with the message log
// ---------------------------------------------------------------------------

pub(crate) fn load_thread(conn: &Connection, id: &str) -> Result<Option<Thread>> {
    let thread = conn
        .query_row(
            &format!("SELECT {THREAD_COLUMNS} FROM threads WHERE id = ?1"),
            params![id],
            row_to_thread,
        )
        .optional()?;
    Ok(thread)
}

/// Write back the derived summary fields of `thread`.
///
/// A missing row is a data-integrity problem, not a caller error: it is
/// logged and otherwise ignored.
pub(crate) fn save_summary(conn: &Connection, thread: &Thread) -> Result<()> {
    let affected = conn.execute(
        "UPDATE threads SET last_message = ?1, timestamp = ?2, unread = ?3 WHERE id = ?4",
        params![thread.last_message, thread.timestamp, thread.unread, thread.id],
    )?;
    if affected == 0 {
        tracing::warn!(thread = %thread.id, "summary update hit no thread row");
    }
    Ok(())
}

/// Map a `rusqlite::Row` to a [`Thread`].
fn row_to_thread(row: &rusqlite::Row<'_>) -> rusqlite::Result<Thread> {
    Ok(Thread {
        id: row.get(0)?,
        user_name: row.get(1)?,
        avatar: row.get(2)?,
        equipment_name: row.get(3)?,
        last_message: row.get(4)?,
        timestamp: row.get(5)?,
        unread: row.get(6)?,
    })
}
