//! The chat procedures exposed to clients.
//!
//! [`ChatService`] validates requests, stamps them with the clock, and hands
//! them to a [`ChatBackend`] for the thread/message writes and to the
//! [`TypingTracker`] for presence. It is cheap to share behind an `Arc`.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::backend::ChatBackend;
use crate::clock::{Clock, SystemClock};
use crate::error::{Result, StoreError};
use crate::models::{Message, Millis, Thread};
use crate::requests::{validate_thread_id, Ack, SendRequest, TypingSetRequest};
use crate::typing::{TypingStatus, TypingTracker};

pub struct ChatService {
    backend: Arc<dyn ChatBackend>,
    typing: TypingTracker,
    clock: Arc<dyn Clock>,
}

impl ChatService {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            typing: TypingTracker::default(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_typing_stale_after(mut self, stale_after: Duration) -> Self {
        self.typing = TypingTracker::new(stale_after);
        self
    }

    pub fn init(&self) -> Result<()> {
        self.backend.init()
    }

    pub fn close(&self) -> Result<()> {
        self.backend.close()
    }

    pub fn backend(&self) -> &dyn ChatBackend {
        self.backend.as_ref()
    }

    pub fn now(&self) -> Millis {
        self.clock.now_millis()
    }

    // ------------------------------------------------------------------
    // Threads
    // ------------------------------------------------------------------

    /// `threads.list`: newest activity first.
    pub fn list_threads(&self) -> Result<Vec<Thread>> {
        self.backend.list_threads()
    }

    pub fn get_thread(&self, thread_id: &str) -> Result<Thread> {
        validate_thread_id(thread_id)?;
        self.backend
            .get_thread(thread_id)?
            .ok_or_else(|| StoreError::ThreadNotFound(thread_id.to_string()))
    }

    pub fn create_thread(&self, thread: &Thread) -> Result<()> {
        validate_thread_id(&thread.id)?;
        self.backend.create_thread(thread)
    }

    // ------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------

    /// `messages.byThread`: oldest first, empty for unknown threads.
    pub fn by_thread(&self, thread_id: &str) -> Result<Vec<Message>> {
        validate_thread_id(thread_id)?;
        self.backend.list_by_thread(thread_id)
    }

    /// `messages.send`
    pub fn send(&self, req: SendRequest) -> Result<Message> {
        let draft = req.validate()?;
        let message = self.backend.append_message(draft, self.clock.now_millis())?;
        info!(
            msg_id = %message.id,
            thread = %message.thread_id,
            attachments = message.attachments.len(),
            "message sent"
        );
        Ok(message)
    }

    /// `messages.markRead`
    pub fn mark_read(&self, thread_id: &str) -> Result<Ack> {
        validate_thread_id(thread_id)?;
        self.backend.mark_thread_read(thread_id)?;
        debug!(thread = %thread_id, "thread read");
        Ok(Ack::OK)
    }

    // ------------------------------------------------------------------
    // Typing presence
    // ------------------------------------------------------------------

    /// `messages.typingSet`. Presence is best effort and never fails.
    pub fn typing_set(&self, req: TypingSetRequest) -> Ack {
        let req = req.normalized();
        self.typing.set_typing(
            &req.thread_id,
            &req.user_id,
            &req.user_name,
            req.is_typing,
            self.clock.now_millis(),
        );
        Ack::OK
    }

    /// `messages.typingStatus`
    pub fn typing_status(&self, thread_id: &str) -> TypingStatus {
        self.typing.status(thread_id, self.clock.now_millis())
    }

    /// Forget presence entries idle for longer than `max_idle`.
    pub fn purge_typing(&self, max_idle: Duration) -> usize {
        self.typing.purge_stale(max_idle, self.clock.now_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::memory::MemoryBackend;
    use crate::models::Attachment;
    use crate::sqlite::{SqliteBackend, SqliteLocation};

    fn thread(id: &str) -> Thread {
        Thread {
            id: id.into(),
            user_name: "Alex Johnson".into(),
            avatar: "https://example.com/a.jpg".into(),
            equipment_name: "RED Komodo 6K".into(),
            last_message: String::new(),
            timestamp: 0,
            unread: 0,
        }
    }

    fn services() -> Vec<(&'static str, ChatService, Arc<ManualClock>)> {
        let backends: Vec<(&'static str, Arc<dyn ChatBackend>)> = vec![
            ("memory", Arc::new(MemoryBackend::new())),
            ("sqlite", Arc::new(SqliteBackend::open(SqliteLocation::Memory).unwrap())),
        ];
        backends
            .into_iter()
            .map(|(name, backend)| {
                let clock = Arc::new(ManualClock::new(1_000));
                let svc = ChatService::new(backend).with_clock(clock.clone());
                svc.create_thread(&thread("t1")).unwrap();
                (name, svc, clock)
            })
            .collect()
    }

    #[test]
    fn end_to_end_scenario() {
        for (name, svc, clock) in services() {
            assert_eq!(svc.get_thread("t1").unwrap().unread, 0, "{name}");

            svc.send(SendRequest::text("t1", "hi")).unwrap();
            let t = svc.get_thread("t1").unwrap();
            assert_eq!((t.unread, t.last_message.as_str()), (1, "hi"), "{name}");

            clock.advance(10);
            svc.send(SendRequest::text("t1", "").with_attachments(vec![Attachment::image("x")]))
                .unwrap();
            let t = svc.get_thread("t1").unwrap();
            assert_eq!((t.unread, t.last_message.as_str()), (2, "1 attachment"), "{name}");
            assert_eq!(t.timestamp, 1_010, "{name}");

            assert_eq!(svc.mark_read("t1").unwrap(), Ack::OK);
            assert_eq!(svc.get_thread("t1").unwrap().unread, 0, "{name}");

            let msgs = svc.by_thread("t1").unwrap();
            assert_eq!(msgs.len(), 2, "{name}");
            assert!(msgs.iter().all(|m| m.read), "{name}");
            assert_eq!(msgs[0].text, "hi", "{name}");
            assert_eq!(msgs[1].attachments.len(), 1, "{name}");
        }
    }

    #[test]
    fn sends_come_back_in_call_order() {
        for (name, svc, clock) in services() {
            let mut sent = Vec::new();
            for i in 0..20 {
                // bursts share a millisecond
                if i % 4 == 0 {
                    clock.advance(1);
                }
                sent.push(svc.send(SendRequest::text("t1", format!("msg {i}"))).unwrap().id);
            }

            let listed = svc.by_thread("t1").unwrap();
            let ids: Vec<_> = listed.iter().map(|m| m.id.clone()).collect();
            assert_eq!(ids, sent, "{name}");
            assert!(listed.windows(2).all(|w| w[0].timestamp <= w[1].timestamp), "{name}");
            assert_eq!(svc.get_thread("t1").unwrap().unread, 20, "{name}");
        }
    }

    #[test]
    fn preview_plural_attachments() {
        for (name, svc, _) in services() {
            svc.send(
                SendRequest::text("t1", "")
                    .with_attachments(vec![Attachment::image("a"), Attachment::file("b", "b.pdf")]),
            )
            .unwrap();
            assert_eq!(svc.get_thread("t1").unwrap().last_message, "2 attachments", "{name}");
        }
    }

    #[test]
    fn invalid_sends_change_nothing() {
        for (name, svc, _) in services() {
            let empty = svc.send(SendRequest::text("t1", "").with_attachments(vec![]));
            assert!(matches!(empty, Err(StoreError::Validation(_))), "{name}");

            let long = svc.send(SendRequest::text("t1", "x".repeat(501)));
            assert!(matches!(long, Err(StoreError::Validation(_))), "{name}");

            let t = svc.get_thread("t1").unwrap();
            assert_eq!((t.unread, t.last_message.as_str()), (0, ""), "{name}");
            assert!(svc.by_thread("t1").unwrap().is_empty(), "{name}");

            assert!(svc.send(SendRequest::text("t1", "x".repeat(500))).is_ok(), "{name}");
        }
    }

    #[test]
    fn unknown_thread_writes_fail_loudly() {
        for (name, svc, _) in services() {
            assert!(
                matches!(svc.send(SendRequest::text("nope", "hi")), Err(StoreError::ThreadNotFound(_))),
                "{name}"
            );
            assert!(
                matches!(svc.mark_read("nope"), Err(StoreError::ThreadNotFound(_))),
                "{name}"
            );
            assert!(
                matches!(svc.get_thread("nope"), Err(StoreError::ThreadNotFound(_))),
                "{name}"
            );
            assert!(svc.by_thread("nope").unwrap().is_empty(), "{name}");
        }
    }

    #[test]
    fn concurrent_sends_lose_nothing() {
        const SENDERS: usize = 8;
        const PER_SENDER: usize = 25;

        for (name, svc, _) in services() {
            let svc = Arc::new(svc);
            std::thread::scope(|s| {
                for sender in 0..SENDERS {
                    let svc = svc.clone();
                    s.spawn(move || {
                        for i in 0..PER_SENDER {
                            svc.send(
                                SendRequest::text("t1", format!("{sender}-{i}"))
                                    .from_sender(format!("u{sender}"), "User"),
                            )
                            .unwrap();
                        }
                    });
                }
            });

            let total = SENDERS * PER_SENDER;
            let msgs = svc.by_thread("t1").unwrap();
            assert_eq!(msgs.len(), total, "{name}");
            let t = svc.get_thread("t1").unwrap();
            assert_eq!(t.unread as usize, total, "{name}");
            // the summary reflects the last message in the log
            assert_eq!(t.last_message, msgs[total - 1].text, "{name}");

            // each sender's own messages stay in the order it sent them
            for sender in 0..SENDERS {
                let mine: Vec<_> = msgs
                    .iter()
                    .filter(|m| m.sender_id == format!("u{sender}"))
                    .map(|m| m.text.clone())
                    .collect();
                let expected: Vec<_> = (0..PER_SENDER).map(|i| format!("{sender}-{i}")).collect();
                assert_eq!(mine, expected, "{name}");
            }
        }
    }

    #[test]
    fn mark_read_during_sends_keeps_summary_consistent() {
        const SENDERS: usize = 4;
        const PER_SENDER: usize = 100;
        const READS: usize = 200;

        for (name, svc, _) in services() {
            let svc = Arc::new(svc);
            std::thread::scope(|s| {
                for sender in 0..SENDERS {
                    let svc = svc.clone();
                    s.spawn(move || {
                        for i in 0..PER_SENDER {
                            svc.send(SendRequest::text("t1", format!("{sender}-{i}"))).unwrap();
                        }
                    });
                }
                let svc = svc.clone();
                s.spawn(move || {
                    for _ in 0..READS {
                        svc.mark_read("t1").unwrap();
                    }
                });
            });

            let msgs = svc.by_thread("t1").unwrap();
            assert_eq!(msgs.len(), SENDERS * PER_SENDER, "{name}");
            let t = svc.get_thread("t1").unwrap();
            let unread_msgs = msgs.iter().filter(|m| !m.read).count();
            assert_eq!(t.unread as usize, unread_msgs, "{name}");
            assert_eq!(t.last_message, msgs[msgs.len() - 1].text, "{name}");
        }
    }

    #[test]
    fn typing_round_trip_and_staleness() {
        let clock = Arc::new(ManualClock::new(0));
        let svc = ChatService::new(Arc::new(MemoryBackend::new()))
            .with_clock(clock.clone())
            .with_typing_stale_after(Duration::from_secs(5));

        assert_eq!(svc.typing_set(TypingSetRequest::new("t1", "u1", "Alice", true)), Ack::OK);
        let status = svc.typing_status("t1");
        assert_eq!(status["u1"].user_name, "Alice");
        assert!(status["u1"].is_typing);

        clock.advance(5_000);
        assert!(!svc.typing_status("t1")["u1"].is_typing);

        // typing on an unknown thread is accepted; blanks take defaults
        svc.typing_set(TypingSetRequest::new("ghost", "", "", true));
        assert_eq!(svc.typing_status("ghost")["me"].user_name, "Me");

        clock.advance(60_000);
        assert_eq!(svc.purge_typing(Duration::from_secs(30)), 2);
        assert!(svc.typing_status("t1").is_empty());
    }
}
