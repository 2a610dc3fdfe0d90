//! Process-local backend.
//!
//! Each thread is a partition holding its summary and its message log behind
//! one `Mutex`, so concurrent sends on the same thread serialize while sends
//! on different threads do not contend. The partition map itself sits behind
//! an `RwLock` that is only write-locked to add a thread.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::backend::ChatBackend;
use crate::error::{Result, StoreError};
use crate::models::{Message, MessageDraft, Thread};

#[derive(Debug)]
struct Partition {
    thread: Thread,
    messages: Vec<Message>,
}

type Partitions = HashMap<String, Arc<Mutex<Partition>>>;

#[derive(Debug, Default)]
pub struct MemoryBackend {
    partitions: RwLock<Partitions>,
    closed: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Unavailable("memory backend is closed".to_string()));
        }
        Ok(())
    }

    fn partition(&self, thread_id: &str) -> Result<Option<Arc<Mutex<Partition>>>> {
        self.ensure_open()?;
        let map = self
            .partitions
            .read()
            .map_err(|e| StoreError::Unavailable(format!("Lock poisoned: {e}")))?;
        Ok(map.get(thread_id).cloned())
    }
}

fn lock(partition: &Mutex<Partition>) -> Result<MutexGuard<'_, Partition>> {
    partition
        .lock()
        .map_err(|e| StoreError::Unavailable(format!("Lock poisoned: {e}")))
}

impl ChatBackend for MemoryBackend {
    fn init(&self) -> Result<()> {
        self.closed.store(false, Ordering::Release);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn create_thread(&self, thread: &Thread) -> Result<()> {
        self.ensure_open()?;
        let mut map = self
            .partitions
            .write()
            .map_err(|e| StoreError::Unavailable(format!("Lock poisoned: {e}")))?;
        if map.contains_key(&thread.id) {
            return Err(StoreError::Validation(format!(
                "thread {} already exists",
                thread.id
            )));
        }
        map.insert(
            thread.id.clone(),
            Arc::new(Mutex::new(Partition {
                thread: thread.clone(),
                messages: Vec::new(),
            })),
        );
        debug!(thread = %thread.id, "thread created");
        Ok(())
    }

    fn restore(&self, threads: &[Thread], messages: &[Message]) -> Result<()> {
        self.ensure_open()?;
        let mut map = self
            .partitions
            .write()
            .map_err(|e| StoreError::Unavailable(format!("Lock poisoned: {e}")))?;

        let mut seen = HashSet::with_capacity(threads.len());
        if let Some(t) = threads
            .iter()
            .find(|t| map.contains_key(&t.id) || !seen.insert(t.id.as_str()))
        {
            return Err(StoreError::Validation(format!("thread {} already exists", t.id)));
        }
        if let Some(m) = messages.iter().find(|m| {
            !map.contains_key(&m.thread_id) && !threads.iter().any(|t| t.id == m.thread_id)
        }) {
            return Err(StoreError::ThreadNotFound(m.thread_id.clone()));
        }

        for t in threads {
            map.insert(
                t.id.clone(),
                Arc::new(Mutex::new(Partition {
                    thread: t.clone(),
                    messages: Vec::new(),
                })),
            );
        }
        let mut touched = Vec::new();
        for m in messages {
            // checked above
            if let Some(p) = map.get(&m.thread_id) {
                lock(p)?.messages.push(m.clone());
                touched.push(m.thread_id.as_str());
            }
        }
        touched.sort_unstable();
        touched.dedup();
        for id in touched {
            if let Some(p) = map.get(id) {
                lock(p)?.messages.sort_by_key(|m| m.timestamp);
            }
        }

        debug!(threads = threads.len(), messages = messages.len(), "history restored");
        Ok(())
    }

    fn list_threads(&self) -> Result<Vec<Thread>> {
        self.ensure_open()?;
        let partitions: Vec<_> = {
            let map = self
                .partitions
                .read()
                .map_err(|e| StoreError::Unavailable(format!("Lock poisoned: {e}")))?;
            map.values().cloned().collect()
        };

        let mut threads = Vec::with_capacity(partitions.len());
        for p in &partitions {
            threads.push(lock(p)?.thread.clone());
        }
        threads.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
        Ok(threads)
    }

    fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>> {
        let Some(p) = self.partition(thread_id)? else {
            return Ok(None);
        };
        let thread = lock(&p)?.thread.clone();
        Ok(Some(thread))
    }

    fn append_message(&self, draft: MessageDraft, now: i64) -> Result<Message> {
        let p = self
            .partition(&draft.thread_id)?
            .ok_or_else(|| StoreError::ThreadNotFound(draft.thread_id.clone()))?;

        let mut guard = lock(&p)?;
        let timestamp = now.max(guard.thread.timestamp);
        let message = draft.into_message(Uuid::new_v4().to_string(), timestamp);

        guard.messages.push(message.clone());
        guard.thread.apply_message_appended(&message);
        Ok(message)
    }

    fn list_by_thread(&self, thread_id: &str) -> Result<Vec<Message>> {
        let Some(p) = self.partition(thread_id)? else {
            return Ok(Vec::new());
        };
        let messages = lock(&p)?.messages.clone();
        Ok(messages)
    }

    fn mark_thread_read(&self, thread_id: &str) -> Result<()> {
        let Some(p) = self.partition(thread_id)? else {
            warn!(thread = %thread_id, "mark-read on unknown thread");
            return Err(StoreError::ThreadNotFound(thread_id.to_string()));
        };

        let mut guard = lock(&p)?;
        for m in guard.messages.iter_mut() {
            m.read = true;
        }
        guard.thread.reset_unread();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Attachment;

    fn thread(id: &str, ts: i64) -> Thread {
        Thread {
            id: id.into(),
            user_name: "Alex Johnson".into(),
            avatar: "https://example.com/a.jpg".into(),
            equipment_name: "RED Komodo 6K".into(),
            last_message: String::new(),
            timestamp: ts,
            unread: 0,
        }
    }

    fn draft(thread_id: &str, text: &str) -> MessageDraft {
        MessageDraft {
            thread_id: thread_id.into(),
            text: text.into(),
            attachments: Vec::new(),
            sender_id: "me".into(),
            sender_name: "Me".into(),
        }
    }

    #[test]
    fn append_updates_summary() {
        let backend = MemoryBackend::new();
        backend.create_thread(&thread("t1", 0)).unwrap();

        let msg = backend.append_message(draft("t1", "hi"), 100).unwrap();
        assert_eq!(msg.timestamp, 100);
        assert!(!msg.read);

        let t = backend.get_thread("t1").unwrap().unwrap();
        assert_eq!(t.unread, 1);
        assert_eq!(t.last_message, "hi");
        assert_eq!(t.timestamp, 100);
    }

    #[test]
    fn clock_going_backwards_keeps_order() {
        let backend = MemoryBackend::new();
        backend.create_thread(&thread("t1", 0)).unwrap();

        backend.append_message(draft("t1", "first"), 500).unwrap();
        let second = backend.append_message(draft("t1", "second"), 400).unwrap();
        assert_eq!(second.timestamp, 500);

        let texts: Vec<_> = backend
            .list_by_thread("t1")
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, ["first", "second"]);
    }

    #[test]
    fn unknown_thread_write_fails_reads_empty() {
        let backend = MemoryBackend::new();
        assert!(matches!(
            backend.append_message(draft("nope", "hi"), 1),
            Err(StoreError::ThreadNotFound(_))
        ));
        assert!(matches!(
            backend.mark_thread_read("nope"),
            Err(StoreError::ThreadNotFound(_))
        ));
        assert!(backend.list_by_thread("nope").unwrap().is_empty());
        assert!(backend.get_thread("nope").unwrap().is_none());
    }

    #[test]
    fn duplicate_thread_rejected() {
        let backend = MemoryBackend::new();
        backend.create_thread(&thread("t1", 0)).unwrap();
        assert!(matches!(
            backend.create_thread(&thread("t1", 0)),
            Err(StoreError::Validation(_))
        ));

        // repeated within one restore batch
        assert!(matches!(
            backend.restore(&[thread("a", 0), thread("a", 5)], &[]),
            Err(StoreError::Validation(_))
        ));
        assert!(backend.get_thread("a").unwrap().is_none());
    }

    #[test]
    fn list_threads_newest_first() {
        let backend = MemoryBackend::new();
        backend.create_thread(&thread("old", 10)).unwrap();
        backend.create_thread(&thread("new", 20)).unwrap();

        let ids: Vec<_> = backend.list_threads().unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, ["new", "old"]);

        let mut d = draft("old", "");
        d.attachments = vec![Attachment::image("x")];
        backend.append_message(d, 30).unwrap();

        let threads = backend.list_threads().unwrap();
        assert_eq!(threads[0].id, "old");
        assert_eq!(threads[0].last_message, "1 attachment");
    }

    #[test]
    fn closed_backend_is_unavailable() {
        let backend = MemoryBackend::new();
        backend.create_thread(&thread("t1", 0)).unwrap();
        backend.close().unwrap();

        let err = backend.list_threads().unwrap_err();
        assert!(err.is_transient());

        backend.init().unwrap();
        assert_eq!(backend.list_threads().unwrap().len(), 1);
    }
}
