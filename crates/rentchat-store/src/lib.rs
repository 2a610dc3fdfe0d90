//! # rentchat-store
//!
//! Thread and message storage for the rental marketplace chat.
//!
//! Messages form an append-only log per thread; each thread carries a
//! summary (preview, last activity, unread count) that is updated in the
//! same critical section as the append it reflects. Two [`ChatBackend`]s are
//! provided: [`MemoryBackend`] with one lock per thread, and
//! [`SqliteBackend`] with one transaction per command. Typing presence lives
//! beside them in a [`TypingTracker`] and is never persisted.
//!
//! [`ChatService`] is the surface the transport layer calls.

pub mod backend;
pub mod clock;
pub mod database;
pub mod memory;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod requests;
pub mod seed;
pub mod service;
pub mod sqlite;
pub mod threads;
pub mod typing;

mod error;

pub use backend::ChatBackend;
pub use clock::{Clock, ManualClock, SystemClock};
pub use database::Database;
pub use error::{Result, StoreError};
pub use memory::MemoryBackend;
pub use models::*;
pub use requests::{Ack, SendRequest, ThreadRequest, TypingSetRequest, MAX_TEXT_CHARS};
pub use service::ChatService;
pub use sqlite::{SqliteBackend, SqliteLocation};
pub use typing::{TypingStatus, TypingTracker};
