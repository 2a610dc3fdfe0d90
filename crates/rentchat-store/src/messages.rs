//! Message log rows. Every write here also touches the owning thread's
//! summary inside one transaction.

use rusqlite::{params, TransactionBehavior};
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Attachment, Message, MessageDraft, Thread};
use crate::threads::{load_thread, save_summary};

const MESSAGE_COLUMNS: &str =
    "id, thread_id, text, attachments, sender_id, sender_name, timestamp, read";

impl Database {
    /// Append a message and fold it into its thread summary atomically.
    pub fn append_message(&mut self, draft: MessageDraft, now: i64) -> Result<Message> {
        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut thread = load_thread(&tx, &draft.thread_id)?
            .ok_or_else(|| StoreError::ThreadNotFound(draft.thread_id.clone()))?;

        let timestamp = now.max(thread.timestamp);
        let message = draft.into_message(Uuid::new_v4().to_string(), timestamp);

        tx.execute(
            "INSERT INTO messages
                (id, thread_id, text, attachments, sender_id, sender_name, timestamp, read)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0)",
            params![
                message.id,
                message.thread_id,
                message.text,
                serde_json::to_string(&message.attachments)?,
                message.sender_id,
                message.sender_name,
                message.timestamp,
            ],
        )?;

        thread.apply_message_appended(&message);
        save_summary(&tx, &thread)?;

        tx.commit()?;
        Ok(message)
    }

    /// Load pre-existing threads and messages verbatim in one transaction.
    pub fn restore(&mut self, threads: &[Thread], messages: &[Message]) -> Result<()> {
        let tx = self.conn_mut().transaction()?;

        for t in threads {
            if load_thread(&tx, &t.id)?.is_some() {
                return Err(StoreError::Validation(format!("thread {} already exists", t.id)));
            }
            tx.execute(
                "INSERT INTO threads
                    (id, user_name, avatar, equipment_name, last_message, timestamp, unread)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    t.id,
                    t.user_name,
                    t.avatar,
                    t.equipment_name,
                    t.last_message,
                    t.timestamp,
                    t.unread,
                ],
            )?;
        }

        let mut ordered: Vec<&Message> = messages.iter().collect();
        ordered.sort_by_key(|m| m.timestamp);
        for m in ordered {
            if load_thread(&tx, &m.thread_id)?.is_none() {
                return Err(StoreError::ThreadNotFound(m.thread_id.clone()));
            }
            tx.execute(
                "INSERT INTO messages
                    (id, thread_id, text, attachments, sender_id, sender_name, timestamp, read)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    m.id,
                    m.thread_id,
                    m.text,
                    serde_json::to_string(&m.attachments)?,
                    m.sender_id,
                    m.sender_name,
                    m.timestamp,
                    m.read as i32,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Messages of a thread, oldest first, ties in insertion order.
    pub fn get_messages_for_thread(&self, thread_id: &str) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {MESSAGE_COLUMNS}
             FROM messages
             WHERE thread_id = ?1
             ORDER BY timestamp ASC, seq ASC"
        ))?;

        let rows = stmt.query_map(params![thread_id], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    /// Flag all messages read and zero the unread counter, atomically.
    pub fn mark_thread_read(&mut self, thread_id: &str) -> Result<()> {
        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut thread = load_thread(&tx, thread_id)?
            .ok_or_else(|| StoreError::ThreadNotFound(thread_id.to_string()))?;

        let flagged = tx.execute(
            "UPDATE messages SET read = 1 WHERE thread_id = ?1 AND read = 0",
            params![thread_id],
        )?;

        thread.reset_unread();
        save_summary(&tx, &thread)?;

        tx.commit()?;
        tracing::debug!(thread = %thread_id, flagged, "thread marked read");
        Ok(())
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let attachments_json: String = row.get(3)?;
    let attachments: Vec<Attachment> = serde_json::from_str(&attachments_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let read: i32 = row.get(7)?;

    Ok(Message {
        id: row.get(0)?,
        thread_id: row.get(1)?,
        text: row.get(2)?,
        attachments,
        sender_id: row.get(4)?,
        sender_name: row.get(5)?,
        timestamp: row.get(6)?,
        read: read != 0,
    })
}
