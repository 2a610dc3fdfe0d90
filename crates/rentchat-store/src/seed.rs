//! Demo conversations loaded into an empty store at startup.

use crate::backend::ChatBackend;
use crate::error::Result;
use crate::models::{Message, Millis, Thread};

const MINUTE: Millis = 60 * 1000;

/// Three rental conversations and their history, dated relative to `now`.
/// Each summary is derived from its thread's messages.
pub fn demo_data(now: Millis) -> (Vec<Thread>, Vec<Message>) {
    let summary = |id: &str, user_name: &str, avatar: &str, equipment_name: &str| Thread {
        id: id.into(),
        user_name: user_name.into(),
        avatar: avatar.into(),
        equipment_name: equipment_name.into(),
        last_message: String::new(),
        timestamp: now - 48 * 60 * MINUTE,
        unread: 0,
    };
    let mut threads = vec![
        summary(
            "1",
            "Alex Johnson",
            "https://images.unsplash.com/photo-1507003211169-0a1dd7228f2d?w=400",
            "RED Komodo 6K",
        ),
        summary(
            "2",
            "Sarah Miller",
            "https://images.unsplash.com/photo-1494790108377-be9c29b29330?w=400",
            "Canon RF 24-70mm",
        ),
        summary(
            "3",
            "Michael Chen",
            "https://images.unsplash.com/photo-1472099645785-5658abf4ff4e?w=400",
            "Aputure 600d Pro",
        ),
    ];

    let msg = |id: &str, thread: &str, text: &str, sender: (&str, &str), ago: Millis, read: bool| {
        Message {
            id: id.into(),
            thread_id: thread.into(),
            text: text.into(),
            attachments: Vec::new(),
            sender_id: sender.0.into(),
            sender_name: sender.1.into(),
            timestamp: now - ago * MINUTE,
            read,
        }
    };
    let me = ("me", "Me");
    let alex = ("u2", "Alex Johnson");
    let sarah = ("u3", "Sarah Miller");
    let michael = ("u4", "Michael Chen");

    let messages = vec![
        msg("m1", "1", "Hi! Is the RED Komodo still available for rent?", alex, 5, true),
        msg("m2", "1", "Yes, it is! When do you need it?", me, 4, true),
        msg("m3", "1", "Great! I need it for a 3-day shoot starting Friday.", alex, 3, false),
        msg("m6", "1", "Yes, the RED Komodo is available for those dates", me, 2, true),
        msg("m4", "2", "Is your 24-70 available this weekend?", me, 120, true),
        msg("m5", "2", "I can offer a discount for weekly rental", sarah, 60, true),
        msg("m7", "3", "Does the 600d come with a softbox?", me, 25 * 60, true),
        msg("m8", "3", "The light comes with all modifiers", michael, 24 * 60, true),
    ];

    for t in &mut threads {
        let tid = t.id.clone();
        for m in messages.iter().filter(|m| m.thread_id == tid) {
            t.apply_message_appended(m);
        }
        t.unread = messages
            .iter()
            .filter(|m| m.thread_id == t.id && !m.read)
            .count() as u32;
    }

    (threads, messages)
}

/// Load [`demo_data`] if the store has no threads yet. Returns whether it
/// seeded anything.
pub fn seed_if_empty(backend: &dyn ChatBackend, now: Millis) -> Result<bool> {
    if !backend.list_threads()?.is_empty() {
        return Ok(false);
    }
    let (threads, messages) = demo_data(now);
    backend.restore(&threads, &messages)?;
    tracing::info!(
        threads = threads.len(),
        messages = messages.len(),
        "seeded demo conversations"
    );
    Ok(true)
}
