//! Database module for accounts, poker sessions, training and the message log

pub mod account;
pub mod message_log;
pub mod poker_session;
mod schema;
pub mod tournament;
pub mod training;

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;

use crate::{Error, Result};

pub use account::{Account, AccountRepo};
pub use message_log::{LoggedMessage, MessageLogRepo};
pub use poker_session::{GameFormat, Platform, PokerSessionRepo, SessionRecord, StoredSession};
pub use schema::SCHEMA_VERSION;
pub use tournament::{Tournament, TournamentRepo};
pub use training::{TrainingRepo, TrainingSession, TrainingStatus};

/// Database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// Pooled database connection
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Initialize the database
///
/// # Errors
///
/// Returns error if database cannot be opened or initialized
pub fn init<P: AsRef<Path>>(path: P) -> Result<DbPool> {
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let manager = SqliteConnectionManager::file(path)
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
    let pool = Pool::builder()
        .max_size(4)
        .build(manager)
        .map_err(|e| Error::Database(e.to_string()))?;

    let conn = pool.get().map_err(|e| Error::Database(e.to_string()))?;
    schema::init(&conn)?;

    tracing::info!(version = SCHEMA_VERSION, "database initialized");
    Ok(pool)
}

/// Initialize an in-memory database (for testing)
///
/// # Errors
///
/// Returns error if database cannot be initialized
pub fn init_memory() -> Result<DbPool> {
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder()
        .max_size(1)
        .build(manager)
        .map_err(|e| Error::Database(e.to_string()))?;

    let conn = pool.get().map_err(|e| Error::Database(e.to_string()))?;
    schema::init(&conn)?;

    Ok(pool)
}

/// Check out a connection, mapping pool errors
pub(crate) fn conn(pool: &DbPool) -> Result<DbConn> {
    pool.get().map_err(|e| Error::Database(e.to_string()))
}

/// Format a timestamp for TEXT storage
///
/// Fixed width so stored values order lexicographically.
pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an RFC 3339 timestamp stored as TEXT
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
