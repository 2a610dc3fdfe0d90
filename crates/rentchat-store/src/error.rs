use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Malformed or out-of-bound input. Never retried.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A write targeted a thread that does not exist.
    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// Attachment column could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// The backing store is closed or its lock is poisoned.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Whether a caller may retry the operation with backoff.
    ///
    /// Only contention and I/O count. Constraint violations and rows that
    /// fail to decode will fail the same way on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy
                    | rusqlite::ErrorCode::DatabaseLocked
                    | rusqlite::ErrorCode::SystemIoFailure
            ),
            StoreError::Io(_) | StoreError::Unavailable(_) => true,
            _ => false,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
