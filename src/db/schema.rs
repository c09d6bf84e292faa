//! Database schema and migrations

use rusqlite::Connection;

use crate::Result;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// Initialize the database schema
///
/// # Errors
///
/// Returns error if migration fails
pub fn init(conn: &Connection) -> Result<()> {
    let version: i32 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .unwrap_or(0);

    if version < 1 {
        migrate_v1(conn)?;
    }
    if version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r"
        -- Accounts known to the bot, keyed by canonical phone
        CREATE TABLE IF NOT EXISTS accounts (
            id TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            phone TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Logged poker sessions
        CREATE TABLE IF NOT EXISTS poker_sessions (
            id TEXT PRIMARY KEY,
            account_id TEXT NOT NULL REFERENCES accounts(id),
            date TEXT NOT NULL,
            game_type TEXT NOT NULL,
            format TEXT NOT NULL,
            tournament_type TEXT,
            platform TEXT NOT NULL,
            buy_in REAL NOT NULL CHECK(buy_in >= 0),
            cash_out REAL NOT NULL CHECK(cash_out >= 0),
            notes TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_poker_sessions_account ON poker_sessions(account_id, date);

        -- Append-only audit trail of inbound messages
        CREATE TABLE IF NOT EXISTS message_log (
            id TEXT PRIMARY KEY,
            account_id TEXT,
            sender_id TEXT NOT NULL,
            kind TEXT NOT NULL CHECK(kind IN ('text', 'image', 'audio')),
            content TEXT NOT NULL,
            media_ref TEXT,
            parsed_result TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_message_log_sender ON message_log(sender_id);

        PRAGMA user_version = 1;
        ",
    )?;

    Ok(())
}

fn migrate_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r"
        -- Practice scenarios and their evaluation
        CREATE TABLE IF NOT EXISTS training_sessions (
            id TEXT PRIMARY KEY,
            account_id TEXT,
            scenario TEXT NOT NULL,
            user_response TEXT,
            feedback TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_training_account
            ON training_sessions(account_id, created_at);

        -- Upcoming tournaments for schedule questions
        CREATE TABLE IF NOT EXISTS tournaments (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            starts_at TEXT NOT NULL,
            venue TEXT,
            buy_in REAL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_tournaments_start ON tournaments(starts_at);

        PRAGMA user_version = 2;
        ",
    )?;

    Ok(())
}
