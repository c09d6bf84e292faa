//! Phone identity resolution
//!
//! Senders arrive as transport identifiers (`972541234567@c.us`) while
//! accounts are stored with a canonical `+<country><national>` phone. Lookups
//! try the canonical form first, then looser variants with and without the
//! country prefix so accounts stored in older formats still match.

use crate::db::{Account, AccountRepo};

/// Shortest national number we accept after stripping a country prefix
const MIN_NATIONAL_DIGITS: usize = 8;

/// Strip transport suffixes (`@c.us`) and everything that is not a digit
#[must_use]
pub fn digits(raw: &str) -> String {
    let local = raw.split('@').next().unwrap_or_default();
    local.chars().filter(char::is_ascii_digit).collect()
}

/// Canonical `+<digits>` form of a phone number
///
/// * `+972541234567`, `00972541234567`, `972541234567@c.us` keep their prefix
/// * `0541234567` drops the trunk `0` and gains the default country code
/// * `541234567` gains the default country code
///
/// Returns `None` when the input contains no digits.
#[must_use]
pub fn canonical_phone(raw: &str, country_code: &str) -> Option<String> {
    let trimmed = raw.trim();
    let mut d = digits(trimmed);
    if d.is_empty() {
        return None;
    }

    if trimmed.starts_with('+') {
        return Some(format!("+{d}"));
    }
    if let Some(rest) = d.strip_prefix("00") {
        return Some(format!("+{rest}"));
    }
    if d.starts_with(country_code) && d.len() >= country_code.len() + MIN_NATIONAL_DIGITS {
        return Some(format!("+{d}"));
    }
    if d.starts_with('0') {
        d.remove(0);
    }
    Some(format!("+{country_code}{d}"))
}

/// Stored-phone variants to try, canonical first
#[must_use]
pub fn phone_candidates(raw: &str, country_code: &str) -> Vec<String> {
    let Some(canonical) = canonical_phone(raw, country_code) else {
        return Vec::new();
    };

    let full = canonical.trim_start_matches('+').to_string();
    let mut candidates = vec![canonical.clone(), full.clone()];

    if let Some(national) = full.strip_prefix(country_code) {
        candidates.push(format!("0{national}"));
        candidates.push(national.to_string());
    }

    let raw_digits = digits(raw);
    if !raw_digits.is_empty() {
        candidates.push(raw_digits);
    }

    let mut seen = std::collections::HashSet::new();
    candidates.retain(|c| seen.insert(c.clone()));
    candidates
}

/// Transport chat identifier (`<digits>@c.us`) for a sender or phone
///
/// Identifiers that already carry a transport suffix are kept as they are.
#[must_use]
pub fn chat_id(raw: &str, country_code: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.contains('@') {
        return (!digits(trimmed).is_empty()).then(|| trimmed.to_string());
    }
    canonical_phone(trimmed, country_code).map(|p| format!("{}@c.us", p.trim_start_matches('+')))
}

/// Maps inbound senders to accounts
#[derive(Clone)]
pub struct IdentityResolver {
    accounts: AccountRepo,
    country_code: String,
}

impl IdentityResolver {
    #[must_use]
    pub fn new(accounts: AccountRepo, country_code: impl Into<String>) -> Self {
        Self {
            accounts,
            country_code: country_code.into(),
        }
    }

    /// Find the account for a sender
    ///
    /// Lookup failures are logged and reported as an unknown sender.
    #[must_use]
    pub fn resolve(&self, sender_id: &str) -> Option<Account> {
        let candidates = phone_candidates(sender_id, &self.country_code);
        match self.accounts.find_by_phones(&candidates) {
            Ok(found) => found,
            Err(e) => {
                tracing::error!(sender = sender_id, error = %e, "account lookup failed");
                None
            }
        }
    }
}
