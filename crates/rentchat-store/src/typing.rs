//! Ephemeral "is composing" presence per thread.
//!
//! Last writer wins and nothing is persisted. Clients that vanish without
//! clearing their flag leave a `true` entry behind, so the reported state is
//! derived at read time: an entry older than `stale_after` reads as not
//! typing. [`TypingTracker::purge_stale`] drops long-idle entries outright.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use std::time::Duration;

use crate::models::{Millis, TypingEntry};

/// Polling runs every 1.5 s; a few missed polls before giving up.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(8);

/// userId -> entry, as returned to clients.
pub type TypingStatus = BTreeMap<String, TypingEntry>;

#[derive(Debug)]
pub struct TypingTracker {
    threads: RwLock<HashMap<String, HashMap<String, TypingEntry>>>,
    stale_after: Millis,
}

impl Default for TypingTracker {
    fn default() -> Self {
        Self::new(DEFAULT_STALE_AFTER)
    }
}

impl TypingTracker {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            threads: RwLock::new(HashMap::new()),
            stale_after: duration_millis(stale_after),
        }
    }

    /// Upsert the entry for `(thread_id, user_id)`.
    pub fn set_typing(
        &self,
        thread_id: &str,
        user_id: &str,
        user_name: &str,
        is_typing: bool,
        now: Millis,
    ) {
        let entry = TypingEntry {
            user_name: user_name.to_string(),
            is_typing,
            updated_at: now,
        };
        // A poisoned lock still holds whole entries, never half-written ones.
        let mut threads = self.threads.write().unwrap_or_else(|e| e.into_inner());
        threads
            .entry(thread_id.to_string())
            .or_default()
            .insert(user_id.to_string(), entry);
    }

    /// Everyone who has reported presence in `thread_id`, with stale `true`
    /// flags reported as `false`.
    pub fn status(&self, thread_id: &str, now: Millis) -> TypingStatus {
        let threads = self.threads.read().unwrap_or_else(|e| e.into_inner());
        let Some(users) = threads.get(thread_id) else {
            return TypingStatus::new();
        };
        let status = users
            .iter()
            .map(|(user_id, entry)| {
                let mut entry = entry.clone();
                entry.is_typing = entry.is_typing && now - entry.updated_at < self.stale_after;
                (user_id.clone(), entry)
            })
            .collect();
        status
    }

    /// Drop entries not updated within `max_idle`. Returns how many went.
    pub fn purge_stale(&self, max_idle: Duration, now: Millis) -> usize {
        let cutoff = now - duration_millis(max_idle);
        let mut threads = self.threads.write().unwrap_or_else(|e| e.into_inner());
        let mut removed = 0;
        threads.retain(|_, users| {
            let before = users.len();
            users.retain(|_, entry| entry.updated_at >= cutoff);
            removed += before - users.len();
            !users.is_empty()
        });
        removed
    }
}

fn duration_millis(d: Duration) -> Millis {
    Millis::try_from(d.as_millis()).unwrap_or(Millis::MAX)
}
