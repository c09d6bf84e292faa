//! Append-only inbound message log

use rusqlite::Row;
use uuid::Uuid;

use super::{DbPool, conn, format_datetime};
use crate::Result;
use crate::channels::MessageKind;

/// One audit row per resolved inbound event
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedMessage {
    pub account_id: Option<String>,
    pub sender_id: String,
    pub kind: MessageKind,
    /// Text body, transcript, or caption
    pub content: String,
    pub media_ref: Option<String>,
    /// Parsed session JSON when one was recognized
    pub parsed_result: Option<serde_json::Value>,
}

impl LoggedMessage {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let kind: String = row.get(2)?;
        let parsed: Option<String> = row.get(5)?;
        Ok(Self {
            account_id: row.get(0)?,
            sender_id: row.get(1)?,
            kind: MessageKind::from_str_value(&kind).unwrap_or(MessageKind::Text),
            content: row.get(3)?,
            media_ref: row.get(4)?,
            parsed_result: parsed.and_then(|p| serde_json::from_str(&p).ok()),
        })
    }
}

/// Message log repository
#[derive(Clone)]
pub struct MessageLogRepo {
    pool: DbPool,
}

impl MessageLogRepo {
    /// Create a new message log repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Append a row, returning its ID
    ///
    /// # Errors
    ///
    /// Returns error if the insert fails
    pub fn append(&self, message: &LoggedMessage) -> Result<String> {
        let conn = conn(&self.pool)?;
        let id = Uuid::new_v4().to_string();
        let parsed = message
            .parsed_result
            .as_ref()
            .map(serde_json::Value::to_string);

        conn.execute(
            "INSERT INTO message_log
                (id, account_id, sender_id, kind, content, media_ref, parsed_result, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                id,
                message.account_id,
                message.sender_id,
                message.kind.as_str(),
                message.content,
                message.media_ref,
                parsed,
                format_datetime(&chrono::Utc::now()),
            ],
        )?;

        Ok(id)
    }

    /// Attach the routing outcome to an appended row
    ///
    /// Returns `false` if no row has that ID.
    ///
    /// # Errors
    ///
    /// Returns error if the update fails
    pub fn record_outcome(
        &self,
        id: &str,
        content: &str,
        parsed_result: Option<&serde_json::Value>,
    ) -> Result<bool> {
        let conn = conn(&self.pool)?;
        let updated = conn.execute(
            "UPDATE message_log SET content = ?2, parsed_result = ?3 WHERE id = ?1",
            rusqlite::params![id, content, parsed_result.map(serde_json::Value::to_string)],
        )?;
        Ok(updated > 0)
    }

    /// List rows for a sender in arrival order
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn list_for_sender(&self, sender_id: &str) -> Result<Vec<LoggedMessage>> {
        let conn = conn(&self.pool)?;
        let mut stmt = conn.prepare(
            "SELECT account_id, sender_id, kind, content, media_ref, parsed_result
             FROM message_log WHERE sender_id = ?1 ORDER BY created_at, rowid",
        )?;
        let rows = stmt
            .query_map([sender_id], LoggedMessage::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Total number of logged rows
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn count(&self) -> Result<usize> {
        let conn = conn(&self.pool)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM message_log", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}
