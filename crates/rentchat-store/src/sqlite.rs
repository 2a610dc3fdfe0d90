//! [`ChatBackend`] over a SQLite [`Database`].
//!
//! The connection sits behind a `Mutex`; every command runs as one
//! transaction while holding it.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use crate::backend::ChatBackend;
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Message, MessageDraft, Thread};

/// Where the backend opens its database on `init`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqliteLocation {
    /// Platform data directory, see [`Database::new`].
    Default,
    File(PathBuf),
    /// Private in-memory database. Contents are lost on `close`.
    Memory,
}

pub struct SqliteBackend {
    location: SqliteLocation,
    db: Mutex<Option<Database>>,
}

impl SqliteBackend {
    /// Create a closed backend; call [`ChatBackend::init`] before use.
    pub fn new(location: SqliteLocation) -> Self {
        Self {
            location,
            db: Mutex::new(None),
        }
    }

    /// Create and open in one step.
    pub fn open(location: SqliteLocation) -> Result<Self> {
        let backend = Self::new(location);
        backend.init()?;
        Ok(backend)
    }

    fn guard(&self) -> Result<MutexGuard<'_, Option<Database>>> {
        self.db
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("Lock poisoned: {e}")))
    }

    fn with_db<T>(&self, f: impl FnOnce(&mut Database) -> Result<T>) -> Result<T> {
        let mut guard = self.guard()?;
        let db = guard
            .as_mut()
            .ok_or_else(|| StoreError::Unavailable("database is not open".to_string()))?;
        f(db)
    }
}

impl ChatBackend for SqliteBackend {
    fn init(&self) -> Result<()> {
        let mut guard = self.guard()?;
        if guard.is_some() {
            return Ok(());
        }
        let db = match &self.location {
            SqliteLocation::Default => Database::new()?,
            SqliteLocation::File(path) => {
                tracing::info!(path = %path.display(), "opening database");
                Database::open_at(path)?
            }
            SqliteLocation::Memory => Database::open_in_memory()?,
        };
        *guard = Some(db);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        if let Some(db) = self.guard()?.take() {
            tracing::info!(path = ?db.path(), "closing database");
        }
        Ok(())
    }

    fn create_thread(&self, thread: &Thread) -> Result<()> {
        self.with_db(|db| db.create_thread(thread))
    }

    fn restore(&self, threads: &[Thread], messages: &[Message]) -> Result<()> {
        self.with_db(|db| db.restore(threads, messages))
    }

    fn list_threads(&self) -> Result<Vec<Thread>> {
        self.with_db(|db| db.list_threads())
    }

    fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>> {
        self.with_db(|db| db.get_thread(thread_id))
    }

    fn append_message(&self, draft: MessageDraft, now: i64) -> Result<Message> {
        self.with_db(|db| db.append_message(draft, now))
    }

    fn list_by_thread(&self, thread_id: &str) -> Result<Vec<Message>> {
        self.with_db(|db| db.get_messages_for_thread(thread_id))
    }

    fn mark_thread_read(&self, thread_id: &str) -> Result<()> {
        self.with_db(|db| db.mark_thread_read(thread_id))
    }
}
