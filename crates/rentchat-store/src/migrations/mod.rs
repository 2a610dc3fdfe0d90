//! Schema setup for the chat database.
//!
//! `PRAGMA user_version` records the last applied step; [`run_migrations`]
//! brings a fresh or older file up to [`CURRENT_VERSION`] when
//! [`Database`](crate::Database) opens it.

pub mod v001_initial;

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// v1: `threads` summaries and the append-only `messages` log.
const CURRENT_VERSION: u32 = 1;

pub fn run_migrations(conn: &Connection) -> Result<()> {
    let version: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    if version >= CURRENT_VERSION {
        tracing::debug!(version, "chat schema up to date");
        return Ok(());
    }

    if version < 1 {
        tracing::info!("creating threads and messages tables");
        v001_initial::up(conn).map_err(|e| StoreError::Migration(e.to_string()))?;
        conn.pragma_update(None, "user_version", 1)?;
    }

    tracing::info!(from = version, to = CURRENT_VERSION, "chat schema migrated");
    Ok(())
}
