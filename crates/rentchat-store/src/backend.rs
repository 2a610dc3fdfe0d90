//! Storage seam for threads and messages.
//!
//! A backend owns both the message log and the thread directory, because the
//! two are written together: an append and its summary update (or a
//! mark-read and its unread reset) must commit as one unit per thread.

use crate::error::Result;
use crate::models::{Message, MessageDraft, Thread};

pub trait ChatBackend: Send + Sync {
    /// Prepare the backend for use. Idempotent.
    fn init(&self) -> Result<()>;

    /// Release resources. Later calls fail with `StoreError::Unavailable`.
    fn close(&self) -> Result<()>;

    /// Register a conversation. Threads are created out of band, before any
    /// message is sent to them.
    fn create_thread(&self, thread: &Thread) -> Result<()>;

    /// Bulk-load existing history exactly as given. Summaries are taken
    /// verbatim and not recomputed from `messages`; every message must name
    /// one of `threads` or a thread that already exists. All or nothing.
    fn restore(&self, threads: &[Thread], messages: &[Message]) -> Result<()>;

    /// All threads, most recently active first.
    fn list_threads(&self) -> Result<Vec<Thread>>;

    fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>>;

    /// Append `draft` stamped with a fresh id and `now`, and fold it into the
    /// thread summary in the same critical section.
    ///
    /// The stored timestamp is `max(now, thread.timestamp)` so the log never
    /// goes backwards. Fails with `StoreError::ThreadNotFound` without
    /// writing anything when the thread does not exist.
    fn append_message(&self, draft: MessageDraft, now: i64) -> Result<Message>;

    /// Messages of one thread, oldest first, ties in insertion order. Empty
    /// for unknown threads.
    fn list_by_thread(&self, thread_id: &str) -> Result<Vec<Message>>;

    /// Flag every message of the thread as read and zero its unread counter,
    /// atomically. Fails with `StoreError::ThreadNotFound` for unknown
    /// threads.
    fn mark_thread_read(&self, thread_id: &str) -> Result<()>;
}
