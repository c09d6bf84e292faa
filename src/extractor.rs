//! Poker session extraction
//!
//! The model answers in JSON mode with `{"session": {...}}` shaped like a
//! [`SessionRecord`], or `{"session": null}`. Its answer is decoded into a
//! tagged [`Extraction`]: a record that passed validation, an explicit
//! decline, or malformed output. A record is never returned partially filled;
//! anything missing `buy_in`, `format` or `platform` is declined.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::db::{GameFormat, Platform, SessionRecord};
use crate::error::with_deadline;
use crate::llm::{ChatModel, ChatRequest};

/// Outcome of one extraction attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// Complete, type-valid session
    Recognized(SessionRecord),
    /// Not a session, or a session missing required fields
    Declined,
    /// Model output or model call unusable
    Malformed(String),
}

/// Extracts session records from free text
#[derive(Clone)]
pub struct SessionExtractor {
    model: Arc<dyn ChatModel>,
    model_name: String,
    timeout: Duration,
}

impl SessionExtractor {
    #[must_use]
    pub fn new(
        model: Arc<dyn ChatModel>,
        model_name: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            model,
            model_name: model_name.into(),
            timeout,
        }
    }

    /// Try to read a session out of `text`
    ///
    /// `today` is given to the model to resolve relative dates and is used
    /// when the answer carries no date.
    pub async fn extract(&self, text: &str, today: NaiveDate) -> Extraction {
        let request = ChatRequest::new(&self.model_name)
            .system(system_prompt(today))
            .user_text(text)
            .json()
            .temperature(0.0)
            .max_tokens(400);

        match with_deadline(self.timeout, "extraction", self.model.complete(request)).await {
            Ok(raw) => {
                let outcome = parse_extraction(&raw, today);
                if let Extraction::Malformed(reason) = &outcome {
                    tracing::warn!(reason = %reason, "extraction output rejected");
                    tracing::debug!(raw = %raw, "raw extraction output");
                }
                outcome
            }
            Err(e) => {
                tracing::warn!(error = %e, "extraction call failed");
                Extraction::Malformed(e.to_string())
            }
        }
    }
}

fn system_prompt(today: NaiveDate) -> String {
    format!(
        r#"You extract poker session results from messages written mostly in Hebrew.

Today's date is {today} ({weekday}). Resolve relative dates such as "אתמול" (yesterday) against it.

Answer with exactly one JSON object with a single "session" key. If the message describes a poker
session the user played, "session" is:
{{
  "date": "YYYY-MM-DD",              // today if not mentioned
  "game_type": "string",             // e.g. "NLH 2/5", "PLO 1/2", "Bounty 150"
  "format": "Cash Game" | "Tournament" | "Sit & Go" | "MTT",
  "tournament_type": "string",       // optional, tournaments only, e.g. "Bounty", "Turbo"
  "platform": "Online" | "Live" | "Home Game" | "App Poker",
  "buy_in": number,                  // total invested, including rebuys
  "cash_out": number,                // amount left with, 0 if busted
  "notes": "string"                  // optional, anything else worth keeping
}}

Hints: blinds like 1/2 or 2/5 mean a cash game. "אונליין" means Online,
"קזינו" or "לייב" means Live, "משחק בית" or a friend's house means Home Game,
apps like ClubGG or PPPoker mean App Poker.
Amounts are in shekels; write plain numbers without currency signs. If there were several buy-ins,
add them up yourself.

If the message is not a report of a played session (a question, small talk, a plan), or the buy-in,
format or platform cannot be determined, answer with exactly: {{"session": null}}

Output only the JSON, with no explanations and no code fences."#,
        weekday = today.format("%A"),
    )
}

/// Decode and validate a model answer
///
/// Accepts the `{"session": ...}` envelope as well as a bare object or `null`.
#[must_use]
pub fn parse_extraction(raw: &str, today: NaiveDate) -> Extraction {
    let json = strip_code_fence(raw);
    if json.is_empty() {
        return Extraction::Malformed("empty response".to_string());
    }

    let value: Value = match serde_json::from_str(json) {
        Ok(value) => value,
        Err(e) => return Extraction::Malformed(format!("invalid JSON: {e}")),
    };

    let value = match value {
        Value::Object(mut fields) if fields.len() == 1 && fields.contains_key("session") => {
            fields.remove("session").unwrap_or(Value::Null)
        }
        other => other,
    };

    match value {
        Value::Null => Extraction::Declined,
        Value::Object(fields) => validate(&fields, today),
        other => Extraction::Malformed(format!("expected object or null, got {other}")),
    }
}

fn validate(fields: &Map<String, Value>, today: NaiveDate) -> Extraction {
    let Some(buy_in) = fields.get("buy_in").and_then(amount) else {
        return Extraction::Declined;
    };
    let Some(format) = fields
        .get("format")
        .and_then(Value::as_str)
        .and_then(GameFormat::from_label)
    else {
        return Extraction::Declined;
    };
    let Some(platform) = fields
        .get("platform")
        .and_then(Value::as_str)
        .and_then(Platform::from_label)
    else {
        return Extraction::Declined;
    };

    let cash_out = match fields.get("cash_out") {
        None | Some(Value::Null) => 0.0,
        Some(value) => match amount(value) {
            Some(cash_out) => cash_out,
            None => return Extraction::Declined,
        },
    };

    let date = match text_field(fields, "date") {
        None => today,
        Some(raw) => match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
            Ok(date) => date,
            Err(_) => return Extraction::Malformed(format!("invalid date: {raw}")),
        },
    };

    let game_type = text_field(fields, "game_type").unwrap_or_else(|| format.label().to_string());
    let tournament_type = text_field(fields, "tournament_type").filter(|_| format.is_tournament());

    Extraction::Recognized(SessionRecord {
        date,
        game_type,
        format,
        tournament_type,
        platform,
        buy_in,
        cash_out,
        notes: text_field(fields, "notes"),
    })
}

const CURRENCY_SIGNS: &[char] = &['₪', '$', '€', '£'];

/// Non-negative finite amount from a number or a numeric string like `"1,200₪"`
fn amount(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => amount_text(s)?,
        _ => return None,
    };
    (n.is_finite() && n >= 0.0).then_some(n)
}

/// Parse one plain number, allowing a currency sign and thousands separators
///
/// Anything else (arithmetic, suffixes like `k`, several numbers) is rejected.
fn amount_text(raw: &str) -> Option<f64> {
    let trimmed = raw.trim_matches(|c: char| c.is_whitespace() || CURRENCY_SIGNS.contains(&c));
    if trimmed.is_empty()
        || !trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ',' | '.'))
    {
        return None;
    }

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (trimmed, None),
    };
    if fraction.is_some_and(|f| f.is_empty() || !f.chars().all(|c| c.is_ascii_digit())) {
        return None;
    }

    let mut groups = whole.split(',');
    let head = groups.next()?;
    let head_ok = if whole.contains(',') {
        (1..=3).contains(&head.len())
    } else {
        !head.is_empty()
    };
    if !head_ok || groups.any(|g| g.len() != 3) {
        return None;
    }

    let digits = whole.replace(',', "");
    let number = match fraction {
        Some(fraction) => format!("{digits}.{fraction}"),
        None => digits,
    };
    number.parse().ok()
}

fn text_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn recognized(raw: &str) -> SessionRecord {
        match parse_extraction(raw, today()) {
            Extraction::Recognized(record) => record,
            other => panic!("expected a record, got {other:?}"),
        }
    }

    #[test]
    fn full_cash_game() {
        let record = recognized(
            r#"{"date":"2026-10-18","game_type":"NLH 2/5","format":"Cash Game",
                "platform":"Online","buy_in":200,"cash_out":650}"#,
        );
        assert_eq!(record.format, GameFormat::CashGame);
        assert_eq!(record.platform, Platform::Online);
        assert!((record.buy_in - 200.0).abs() < f64::EPSILON);
        assert!((record.cash_out - 650.0).abs() < f64::EPSILON);
        assert!((record.profit() - 450.0).abs() < f64::EPSILON);
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
    }

    #[test]
    fn literal_null_declines() {
        assert_eq!(parse_extraction("null", today()), Extraction::Declined);
        assert_eq!(parse_extraction("```json\nnull\n```", today()), Extraction::Declined);
    }

    #[test]
    fn missing_required_fields_decline() {
        for raw in [
            r#"{"format":"Cash Game","platform":"Live"}"#,
            r#"{"buy_in":100,"platform":"Live"}"#,
            r#"{"buy_in":100,"format":"Cash Game"}"#,
            "{}",
        ] {
            assert_eq!(parse_extraction(raw, today()), Extraction::Declined, "{raw}");
        }
    }

    #[test]
    fn ill_typed_fields_decline() {
        for raw in [
            r#"{"buy_in":"lots","format":"Cash Game","platform":"Live"}"#,
            r#"{"buy_in":-50,"format":"Cash Game","platform":"Live"}"#,
            r#"{"buy_in":100,"format":"Omaha Night","platform":"Live"}"#,
            r#"{"buy_in":100,"format":"Cash Game","platform":"Moon"}"#,
            r#"{"buy_in":100,"format":"Cash Game","platform":"Live","cash_out":true}"#,
            r#"{"buy_in":"200 + 100","format":"Cash Game","platform":"Live"}"#,
            r#"{"buy_in":"1.5k","format":"Cash Game","platform":"Live"}"#,
            r#"{"buy_in":"200 100","format":"Cash Game","platform":"Live"}"#,
            r#"{"buy_in":"-50","format":"Cash Game","platform":"Live"}"#,
            r#"{"buy_in":"1,5","format":"Cash Game","platform":"Live"}"#,
            r#"{"buy_in":"1.2.3","format":"Cash Game","platform":"Live"}"#,
            r#"{"buy_in":100,"format":"Cash Game","platform":"Live","cash_out":"650-200"}"#,
        ] {
            assert_eq!(parse_extraction(raw, today()), Extraction::Declined, "{raw}");
        }
    }

    #[test]
    fn plain_amount_strings() {
        for (raw, expected) in [
            ("200", 200.0),
            (" 1,100₪ ", 1100.0),
            ("₪2,500.50", 2500.5),
            ("$75", 75.0),
            ("12,345,678", 12_345_678.0),
        ] {
            let value = amount_text(raw).unwrap_or_else(|| panic!("{raw} rejected"));
            assert!((value - expected).abs() < f64::EPSILON, "{raw}");
        }
    }

    #[test]
    fn session_envelope() {
        let record = recognized(
            r#"{"session":{"format":"Cash Game","platform":"Online","buy_in":200,"cash_out":650}}"#,
        );
        assert!((record.profit() - 450.0).abs() < f64::EPSILON);
        assert_eq!(parse_extraction(r#"{"session":null}"#, today()), Extraction::Declined);
        assert_eq!(parse_extraction(r#"{"session":{}}"#, today()), Extraction::Declined);
    }

    #[test]
    fn non_json_is_malformed() {
        assert!(matches!(
            parse_extraction("I think this was a cash game", today()),
            Extraction::Malformed(_)
        ));
        assert!(matches!(parse_extraction("[1,2]", today()), Extraction::Malformed(_)));
        assert!(matches!(parse_extraction("   ", today()), Extraction::Malformed(_)));
    }

    #[test]
    fn defaults_for_optional_fields() {
        let record = recognized(r#"{"format":"MTT","platform":"Live","buy_in":"1,100₪"}"#);
        assert_eq!(record.date, today());
        assert_eq!(record.game_type, "MTT");
        assert!((record.buy_in - 1100.0).abs() < f64::EPSILON);
        assert!(record.cash_out.abs() < f64::EPSILON);
    }

    #[test]
    fn tournament_type_only_kept_for_tournaments() {
        let cash = recognized(
            r#"{"format":"Cash Game","platform":"Live","buy_in":100,"tournament_type":"Bounty"}"#,
        );
        assert!(cash.tournament_type.is_none());

        let mtt = recognized(
            r#"{"format":"Tournament","platform":"Live","buy_in":100,"tournament_type":"Bounty"}"#,
        );
        assert_eq!(mtt.tournament_type.as_deref(), Some("Bounty"));
    }

    #[test]
    fn bad_date_is_malformed() {
        assert!(matches!(
            parse_extraction(
                r#"{"date":"yesterday","format":"Cash Game","platform":"Live","buy_in":100}"#,
                today()
            ),
            Extraction::Malformed(_)
        ));
    }

    #[test]
    fn prompt_carries_today() {
        assert!(system_prompt(today()).contains("2026-10-19"));
    }
}
