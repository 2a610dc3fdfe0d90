//! Request shapes accepted by [`ChatService`](crate::ChatService) and their
//! boundary validation.
//!
//! Fields omitted by the client fall back to the defaults the mobile app
//! relies on (`senderId = "me"`, `senderName = "Me"`, empty text, no
//! attachments). Validation turns a raw request into a typed value or a
//! [`StoreError::Validation`]; nothing unvalidated reaches a backend.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::models::{Attachment, MessageDraft};

/// Upper bound on message text, counted in characters.
pub const MAX_TEXT_CHARS: usize = 500;

pub const DEFAULT_USER_ID: &str = "me";
pub const DEFAULT_USER_NAME: &str = "Me";

fn default_user_id() -> String {
    DEFAULT_USER_ID.to_string()
}

fn default_user_name() -> String {
    DEFAULT_USER_NAME.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ThreadRequest {
    pub thread_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub thread_id: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub attachments: Option<Vec<Attachment>>,
    #[serde(default = "default_user_id")]
    pub sender_id: String,
    #[serde(default = "default_user_name")]
    pub sender_name: String,
}

impl SendRequest {
    /// A text-only send from the local user.
    pub fn text(thread_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            text: Some(text.into()),
            attachments: None,
            sender_id: default_user_id(),
            sender_name: default_user_name(),
        }
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = Some(attachments);
        self
    }

    pub fn from_sender(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.sender_id = id.into();
        self.sender_name = name.into();
        self
    }

    pub fn validate(self) -> Result<MessageDraft> {
        validate_thread_id(&self.thread_id)?;

        let text = self.text.unwrap_or_default();
        let attachments = self.attachments.unwrap_or_default();

        let chars = text.chars().count();
        if chars > MAX_TEXT_CHARS {
            return Err(StoreError::Validation(format!(
                "text is {chars} characters, limit is {MAX_TEXT_CHARS}"
            )));
        }
        if text.is_empty() && attachments.is_empty() {
            return Err(StoreError::Validation(
                "message must carry text or at least one attachment".to_string(),
            ));
        }
        if let Some(pos) = attachments.iter().position(|a| a.uri.trim().is_empty()) {
            return Err(StoreError::Validation(format!(
                "attachment {pos} has an empty uri"
            )));
        }
        if self.sender_id.trim().is_empty() {
            return Err(StoreError::Validation("senderId must not be empty".to_string()));
        }

        Ok(MessageDraft {
            thread_id: self.thread_id,
            text,
            attachments,
            sender_id: self.sender_id,
            sender_name: self.sender_name,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TypingSetRequest {
    pub thread_id: String,
    #[serde(default = "default_user_id")]
    pub user_id: String,
    #[serde(default = "default_user_name")]
    pub user_name: String,
    pub is_typing: bool,
}

impl TypingSetRequest {
    pub fn new(
        thread_id: impl Into<String>,
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        is_typing: bool,
    ) -> Self {
        Self {
            thread_id: thread_id.into(),
            user_id: user_id.into(),
            user_name: user_name.into(),
            is_typing,
        }
    }

    /// Presence never fails on identity fields: blanks become the defaults.
    pub fn normalized(mut self) -> Self {
        if self.user_id.trim().is_empty() {
            self.user_id = default_user_id();
        }
        if self.user_name.trim().is_empty() {
            self.user_name = default_user_name();
        }
        self
    }
}

/// `{ "ok": true }` acknowledgement for commands with no other result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ack {
    pub ok: bool,
}

impl Ack {
    pub const OK: Ack = Ack { ok: true };
}

pub fn validate_thread_id(thread_id: &str) -> Result<()> {
    if thread_id.trim().is_empty() {
        return Err(StoreError::Validation("threadId must not be empty".to_string()));
    }
    Ok(())
}
