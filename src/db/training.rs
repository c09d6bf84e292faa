//! Training session repository

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row};
use uuid::Uuid;

use super::{DbPool, conn, format_datetime, parse_datetime};
use crate::Result;

/// Lifecycle of a practice scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingStatus {
    /// Scenario sent, no answer yet
    AwaitingResponse,
    /// Answer received and evaluated
    Completed,
}

/// A generated practice scenario and its evaluation
#[derive(Debug, Clone)]
pub struct TrainingSession {
    pub id: String,
    pub account_id: Option<String>,
    pub scenario_text: String,
    pub user_response_text: Option<String>,
    pub feedback_text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrainingSession {
    /// Current lifecycle state
    #[must_use]
    pub const fn status(&self) -> TrainingStatus {
        if self.feedback_text.is_some() {
            TrainingStatus::Completed
        } else {
            TrainingStatus::AwaitingResponse
        }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            account_id: row.get(1)?,
            scenario_text: row.get(2)?,
            user_response_text: row.get(3)?,
            feedback_text: row.get(4)?,
            created_at: parse_datetime(&row.get::<_, String>(5)?),
            updated_at: parse_datetime(&row.get::<_, String>(6)?),
        })
    }
}

const SELECT_COLUMNS: &str =
    "SELECT id, account_id, scenario, user_response, feedback, created_at, updated_at
     FROM training_sessions";

/// Training session repository
#[derive(Clone)]
pub struct TrainingRepo {
    pool: DbPool,
}

impl TrainingRepo {
    /// Create a new training repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Store a new scenario awaiting a response
    ///
    /// # Errors
    ///
    /// Returns error if the insert fails
    pub fn create(&self, account_id: Option<&str>, scenario_text: &str) -> Result<TrainingSession> {
        let conn = conn(&self.pool)?;
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let stamp = format_datetime(&now);

        conn.execute(
            "INSERT INTO training_sessions (id, account_id, scenario, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            rusqlite::params![id, account_id, scenario_text, stamp],
        )?;

        Ok(TrainingSession {
            id,
            account_id: account_id.map(ToString::to_string),
            scenario_text: scenario_text.to_string(),
            user_response_text: None,
            feedback_text: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Find a training session by ID
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn find(&self, id: &str) -> Result<Option<TrainingSession>> {
        let conn = conn(&self.pool)?;
        let session = conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                [id],
                TrainingSession::from_row,
            )
            .optional()?;
        Ok(session)
    }

    /// Most recent unanswered scenario for an account created after `since`
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn latest_awaiting(
        &self,
        account_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<TrainingSession>> {
        let conn = conn(&self.pool)?;
        let session = conn
            .query_row(
                &format!(
                    "{SELECT_COLUMNS}
                     WHERE account_id = ?1 AND feedback IS NULL AND created_at >= ?2
                     ORDER BY created_at DESC LIMIT 1"
                ),
                rusqlite::params![account_id, format_datetime(&since)],
                TrainingSession::from_row,
            )
            .optional()?;
        Ok(session)
    }

    /// Store the user's answer and the generated feedback
    ///
    /// No optimistic concurrency: a second call for the same ID overwrites the
    /// first (last write wins). Returns `false` if the ID does not exist.
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn record_response(
        &self,
        id: &str,
        response_text: &str,
        feedback_text: &str,
    ) -> Result<bool> {
        let conn = conn(&self.pool)?;
        let updated = conn.execute(
            "UPDATE training_sessions
             SET user_response = ?1, feedback = ?2, updated_at = ?3
             WHERE id = ?4",
            rusqlite::params![response_text, feedback_text, format_datetime(&Utc::now()), id],
        )?;
        Ok(updated > 0)
    }
}
