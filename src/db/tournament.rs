//! Tournament schedule repository

use chrono::NaiveDateTime;
use rusqlite::Row;
use uuid::Uuid;

use super::{DbPool, conn};
use crate::Result;

const STARTS_AT_FORMAT: &str = "%Y-%m-%d %H:%M";

/// A scheduled tournament
#[derive(Debug, Clone, PartialEq)]
pub struct Tournament {
    pub id: String,
    pub name: String,
    /// Local start time
    pub starts_at: NaiveDateTime,
    pub venue: Option<String>,
    pub buy_in: Option<f64>,
}

impl Tournament {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let starts_at: String = row.get(2)?;
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            starts_at: NaiveDateTime::parse_from_str(&starts_at, STARTS_AT_FORMAT).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    2,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?,
            venue: row.get(3)?,
            buy_in: row.get(4)?,
        })
    }
}

/// Tournament repository
#[derive(Clone)]
pub struct TournamentRepo {
    pool: DbPool,
}

impl TournamentRepo {
    /// Create a new tournament repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Add a tournament to the schedule
    ///
    /// # Errors
    ///
    /// Returns error if the insert fails
    pub fn create(
        &self,
        name: &str,
        starts_at: NaiveDateTime,
        venue: Option<&str>,
        buy_in: Option<f64>,
    ) -> Result<Tournament> {
        let conn = conn(&self.pool)?;
        let id = Uuid::new_v4().to_string();

        conn.execute(
            "INSERT INTO tournaments (id, name, starts_at, venue, buy_in)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                id,
                name,
                starts_at.format(STARTS_AT_FORMAT).to_string(),
                venue,
                buy_in
            ],
        )?;

        Ok(Tournament {
            id,
            name: name.to_string(),
            starts_at,
            venue: venue.map(ToString::to_string),
            buy_in,
        })
    }

    /// Tournaments starting in `[from, until)`, earliest first
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn upcoming(&self, from: NaiveDateTime, until: NaiveDateTime) -> Result<Vec<Tournament>> {
        let conn = conn(&self.pool)?;
        let mut stmt = conn.prepare(
            "SELECT id, name, starts_at, venue, buy_in FROM tournaments
             WHERE starts_at >= ?1 AND starts_at < ?2
             ORDER BY starts_at",
        )?;
        let tournaments = stmt
            .query_map(
                [
                    from.format(STARTS_AT_FORMAT).to_string(),
                    until.format(STARTS_AT_FORMAT).to_string(),
                ],
                Tournament::from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tournaments)
    }
}
