//! Account repository

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row};
use uuid::Uuid;

use super::{DbPool, conn, format_datetime, parse_datetime};
use crate::Result;

/// A registered bot user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub display_name: String,
    /// Canonical phone, e.g. `+972541234567`
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

impl Account {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            display_name: row.get(1)?,
            phone: row.get(2)?,
            created_at: parse_datetime(&row.get::<_, String>(3)?),
        })
    }
}

/// Account repository
#[derive(Clone)]
pub struct AccountRepo {
    pool: DbPool,
}

impl AccountRepo {
    /// Create a new account repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Register an account
    ///
    /// The phone is stored as given; callers normalize it first.
    ///
    /// # Errors
    ///
    /// Returns error if the phone is already registered or the insert fails
    pub fn create(&self, display_name: &str, phone: &str) -> Result<Account> {
        let conn = conn(&self.pool)?;
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO accounts (id, display_name, phone, created_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![id, display_name, phone, format_datetime(&now)],
        )?;

        Ok(Account {
            id,
            display_name: display_name.to_string(),
            phone: phone.to_string(),
            created_at: now,
        })
    }

    /// Find an account by ID
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn find(&self, id: &str) -> Result<Option<Account>> {
        let conn = conn(&self.pool)?;
        let account = conn
            .query_row(
                "SELECT id, display_name, phone, created_at FROM accounts WHERE id = ?1",
                [id],
                Account::from_row,
            )
            .optional()?;
        Ok(account)
    }

    /// Find the account whose stored phone equals any of `phones`
    ///
    /// Candidates are tried in the given order, so the first entry should be
    /// the canonical form.
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn find_by_phones(&self, phones: &[String]) -> Result<Option<Account>> {
        if phones.is_empty() {
            return Ok(None);
        }

        let conn = conn(&self.pool)?;
        let mut stmt = conn.prepare(
            "SELECT id, display_name, phone, created_at FROM accounts WHERE phone = ?1",
        )?;

        for phone in phones {
            let found = stmt
                .query_row([phone], Account::from_row)
                .optional()?;
            if found.is_some() {
                return Ok(found);
            }
        }

        Ok(None)
    }

    /// List all accounts
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn list_all(&self) -> Result<Vec<Account>> {
        let conn = conn(&self.pool)?;
        let mut stmt = conn.prepare(
            "SELECT id, display_name, phone, created_at FROM accounts ORDER BY created_at",
        )?;
        let accounts = stmt
            .query_map([], Account::from_row)?
            .filter_map(std::result::Result::ok)
            .collect();
        Ok(accounts)
    }
}
