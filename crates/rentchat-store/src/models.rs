//! Domain model structs held by the chat store.
//!
//! Every struct derives `Serialize` and `Deserialize` with camelCase field
//! names so it can be handed directly to the mobile client as JSON.

use serde::{Deserialize, Serialize};

/// Timestamps are milliseconds since the Unix epoch.
pub type Millis = i64;

// ---------------------------------------------------------------------------
// Attachment
// ---------------------------------------------------------------------------

/// What kind of payload an attachment points at.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    File,
}

/// A picked image or file referenced by URI. The bytes live elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attachment {
    pub uri: String,
    #[serde(rename = "type")]
    pub kind: AttachmentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl Attachment {
    pub fn image(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            kind: AttachmentKind::Image,
            name: None,
            mime: None,
            width: None,
            height: None,
        }
    }

    pub fn file(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            kind: AttachmentKind::File,
            name: Some(name.into()),
            mime: None,
            width: None,
            height: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat message. Everything but `read` is fixed once stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique message identifier (UUID v4).
    pub id: String,
    /// The thread this message belongs to.
    pub thread_id: String,
    /// May be empty when attachments are present.
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub sender_id: String,
    pub sender_name: String,
    pub timestamp: Millis,
    /// Flipped to `true` by mark-read, never back.
    #[serde(default)]
    pub read: bool,
}

/// A validated message that has not been assigned an id or timestamp yet.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDraft {
    pub thread_id: String,
    pub text: String,
    pub attachments: Vec<Attachment>,
    pub sender_id: String,
    pub sender_name: String,
}

impl MessageDraft {
    /// Stamp the draft into a stored message.
    pub fn into_message(self, id: String, timestamp: Millis) -> Message {
        Message {
            id,
            thread_id: self.thread_id,
            text: self.text,
            attachments: self.attachments,
            sender_id: self.sender_id,
            sender_name: self.sender_name,
            timestamp,
            read: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Thread
// ---------------------------------------------------------------------------

/// Summary record for one conversation, maintained incrementally on every
/// send rather than recomputed from the message log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: String,
    /// Display name of the counterpart.
    pub user_name: String,
    pub avatar: String,
    /// Rental listing this conversation is about.
    pub equipment_name: String,
    #[serde(default)]
    pub last_message: String,
    pub timestamp: Millis,
    #[serde(default)]
    pub unread: u32,
}

impl Thread {
    /// Fold a freshly appended message into the summary.
    ///
    /// Must run exactly once per appended message, under the same lock or
    /// transaction as the append itself.
    pub fn apply_message_appended(&mut self, message: &Message) {
        self.last_message = preview_for(message);
        self.timestamp = message.timestamp;
        self.unread = self.unread.saturating_add(1);
    }

    pub fn reset_unread(&mut self) {
        self.unread = 0;
    }
}

/// Preview line shown in the thread list for `message`.
pub fn preview_for(message: &Message) -> String {
    if !message.text.is_empty() {
        return message.text.clone();
    }
    match message.attachments.len() {
        1 => "1 attachment".to_string(),
        n => format!("{n} attachments"),
    }
}

// ---------------------------------------------------------------------------
// Typing presence
// ---------------------------------------------------------------------------

/// Last reported composing state of one participant in one thread.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TypingEntry {
    pub user_name: String,
    pub is_typing: bool,
    pub updated_at: Millis,
}
