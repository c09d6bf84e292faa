//! Poker session records and their repository

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{DbPool, conn, format_datetime, parse_datetime};
use crate::{Error, Result};

/// How the session was structured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameFormat {
    #[serde(rename = "Cash Game")]
    CashGame,
    #[serde(rename = "Tournament")]
    Tournament,
    #[serde(rename = "Sit & Go")]
    SitAndGo,
    #[serde(rename = "MTT")]
    Mtt,
}

impl GameFormat {
    /// Display label, also the stored value
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::CashGame => "Cash Game",
            Self::Tournament => "Tournament",
            Self::SitAndGo => "Sit & Go",
            Self::Mtt => "MTT",
        }
    }

    /// Parse a label leniently (case, spacing and common aliases)
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match squash(label).as_str() {
            "cashgame" | "cash" | "ring" | "ringgame" => Some(Self::CashGame),
            "tournament" => Some(Self::Tournament),
            "sitgo" | "sitandgo" | "sng" | "sitngo" => Some(Self::SitAndGo),
            "mtt" | "multitabletournament" => Some(Self::Mtt),
            _ => None,
        }
    }

    /// Whether a tournament type label is meaningful for this format
    #[must_use]
    pub const fn is_tournament(self) -> bool {
        !matches!(self, Self::CashGame)
    }
}

/// Where the session was played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "Online")]
    Online,
    #[serde(rename = "Live")]
    Live,
    #[serde(rename = "Home Game")]
    HomeGame,
    #[serde(rename = "App Poker")]
    AppPoker,
}

impl Platform {
    /// Display label, also the stored value
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Online => "Online",
            Self::Live => "Live",
            Self::HomeGame => "Home Game",
            Self::AppPoker => "App Poker",
        }
    }

    /// Parse a label leniently (case, spacing and common aliases)
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match squash(label).as_str() {
            "online" => Some(Self::Online),
            "live" | "casino" => Some(Self::Live),
            "homegame" | "home" => Some(Self::HomeGame),
            "apppoker" | "app" => Some(Self::AppPoker),
            _ => None,
        }
    }
}

/// Keep ASCII letters only, lowercased, so `Sit & Go` and `sit-go` compare equal
fn squash(label: &str) -> String {
    label
        .chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// A validated poker session, as extracted from a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub date: NaiveDate,
    pub game_type: String,
    pub format: GameFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tournament_type: Option<String>,
    pub platform: Platform,
    pub buy_in: f64,
    pub cash_out: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl SessionRecord {
    /// Cash out minus buy in
    #[must_use]
    pub fn profit(&self) -> f64 {
        self.cash_out - self.buy_in
    }
}

/// A persisted session row
#[derive(Debug, Clone)]
pub struct StoredSession {
    pub id: String,
    pub account_id: String,
    pub record: SessionRecord,
    pub created_at: DateTime<Utc>,
}

impl StoredSession {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let date: String = row.get(2)?;
        let format: String = row.get(4)?;
        let platform: String = row.get(6)?;

        let invalid = |idx: usize, what: &str| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                format!("invalid stored {what}").into(),
            )
        };

        Ok(Self {
            id: row.get(0)?,
            account_id: row.get(1)?,
            record: SessionRecord {
                date: NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|_| invalid(2, "date"))?,
                game_type: row.get(3)?,
                format: GameFormat::from_label(&format).ok_or_else(|| invalid(4, "format"))?,
                tournament_type: row.get(5)?,
                platform: Platform::from_label(&platform).ok_or_else(|| invalid(6, "platform"))?,
                buy_in: row.get(7)?,
                cash_out: row.get(8)?,
                notes: row.get(9)?,
            },
            created_at: parse_datetime(&row.get::<_, String>(10)?),
        })
    }
}

/// Poker session repository
#[derive(Clone)]
pub struct PokerSessionRepo {
    pool: DbPool,
}

impl PokerSessionRepo {
    /// Create a new session repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Persist a validated session for an account
    ///
    /// # Errors
    ///
    /// Returns error if amounts are negative or the insert fails
    pub fn insert(&self, account_id: &str, record: &SessionRecord) -> Result<StoredSession> {
        if record.buy_in < 0.0 || record.cash_out < 0.0 {
            return Err(Error::Database("session amounts must be non-negative".to_string()));
        }

        let conn = conn(&self.pool)?;
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO poker_sessions
                (id, account_id, date, game_type, format, tournament_type, platform,
                 buy_in, cash_out, notes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            rusqlite::params![
                id,
                account_id,
                record.date.format("%Y-%m-%d").to_string(),
                record.game_type,
                record.format.label(),
                record.tournament_type,
                record.platform.label(),
                record.buy_in,
                record.cash_out,
                record.notes,
                format_datetime(&now),
            ],
        )?;

        tracing::debug!(session = %id, account = account_id, "poker session stored");

        Ok(StoredSession {
            id,
            account_id: account_id.to_string(),
            record: record.clone(),
            created_at: now,
        })
    }

    /// List an account's sessions, most recent play date first
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn list_for_account(&self, account_id: &str) -> Result<Vec<StoredSession>> {
        let conn = conn(&self.pool)?;
        let mut stmt = conn.prepare(
            "SELECT id, account_id, date, game_type, format, tournament_type, platform,
                    buy_in, cash_out, notes, created_at
             FROM poker_sessions WHERE account_id = ?1
             ORDER BY date DESC, created_at DESC",
        )?;
        let sessions = stmt
            .query_map([account_id], StoredSession::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{AccountRepo, init_memory};

    fn sample() -> SessionRecord {
        SessionRecord {
            date: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
            game_type: "NLH".to_string(),
            format: GameFormat::CashGame,
            tournament_type: None,
            platform: Platform::Online,
            buy_in: 200.0,
            cash_out: 650.0,
            notes: Some("2/5".to_string()),
        }
    }

    #[test]
    fn labels_parse_leniently() {
        assert_eq!(GameFormat::from_label("Cash Game"), Some(GameFormat::CashGame));
        assert_eq!(GameFormat::from_label("cash_game"), Some(GameFormat::CashGame));
        assert_eq!(GameFormat::from_label("Sit & Go"), Some(GameFormat::SitAndGo));
        assert_eq!(GameFormat::from_label("SNG"), Some(GameFormat::SitAndGo));
        assert_eq!(GameFormat::from_label("mtt"), Some(GameFormat::Mtt));
        assert_eq!(GameFormat::from_label("bingo"), None);

        assert_eq!(Platform::from_label("home game"), Some(Platform::HomeGame));
        assert_eq!(Platform::from_label("AppPoker"), Some(Platform::AppPoker));
        assert_eq!(Platform::from_label("moon"), None);
    }

    #[test]
    fn labels_round_trip_through_from_label() {
        for format in [
            GameFormat::CashGame,
            GameFormat::Tournament,
            GameFormat::SitAndGo,
            GameFormat::Mtt,
        ] {
            assert_eq!(GameFormat::from_label(format.label()), Some(format));
        }
        for platform in [Platform::Online, Platform::Live, Platform::HomeGame, Platform::AppPoker] {
            assert_eq!(Platform::from_label(platform.label()), Some(platform));
        }
    }

    #[test]
    fn profit_is_cash_out_minus_buy_in() {
        assert!((sample().profit() - 450.0).abs() < f64::EPSILON);
    }

    #[test]
    fn insert_and_list() {
        let pool = init_memory().unwrap();
        let account = AccountRepo::new(pool.clone())
            .create("Dana", "+972541234567")
            .unwrap();
        let repo = PokerSessionRepo::new(pool);

        repo.insert(&account.id, &sample()).unwrap();
        let listed = repo.list_for_account(&account.id).unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].record, sample());
    }

    #[test]
    fn negative_amounts_rejected() {
        let repo = PokerSessionRepo::new(init_memory().unwrap());
        let mut record = sample();
        record.buy_in = -1.0;

        assert!(repo.insert("acct", &record).is_err());
    }
}
