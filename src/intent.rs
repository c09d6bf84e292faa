//! Keyword intent classification
//!
//! Rules are evaluated in order and the first match wins. Anything that
//! matches no rule is [`Intent::General`]: the router then tries session
//! extraction and, failing that, a general answer.

/// Coarse category of an inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Asking what tournaments are on, and when or where
    TournamentInquiry,
    /// Asking for a practice scenario
    TrainingRequest,
    /// Session report or general question
    General,
}

struct IntentRule {
    intent: Intent,
    matches: fn(&str) -> bool,
}

const RULES: &[IntentRule] = &[
    IntentRule {
        intent: Intent::TournamentInquiry,
        matches: is_tournament_inquiry,
    },
    IntentRule {
        intent: Intent::TrainingRequest,
        matches: is_training_request,
    },
];

const TOURNAMENT_KEYWORDS: &[&str] = &[
    "טורניר",
    "לוח משחקים",
    "יש משהו",
    "אירוע",
    "tournament",
    "schedule",
    "event",
];

const TEMPORAL_KEYWORDS: &[&str] = &[
    "היום", "הערב", "מתי", "איפה", "today", "tonight", "when", "where",
];

/// Questions about the rest of the current day
const SAME_DAY_KEYWORDS: &[&str] = &["היום", "הערב", "today", "tonight"];

const TRAINING_KEYWORDS: &[&str] = &[
    "אימון", "תרגול", "תרגיל", "training", "practice", "quiz",
];

/// Classify message text
#[must_use]
pub fn classify(text: &str) -> Intent {
    let normalized = text.to_lowercase();
    RULES
        .iter()
        .find(|rule| (rule.matches)(&normalized))
        .map_or(Intent::General, |rule| rule.intent)
}

/// Whether a tournament question is about today only
#[must_use]
pub fn asks_about_today(text: &str) -> bool {
    contains_any(&text.to_lowercase(), SAME_DAY_KEYWORDS)
}

fn is_tournament_inquiry(text: &str) -> bool {
    contains_any(text, TOURNAMENT_KEYWORDS) && contains_any(text, TEMPORAL_KEYWORDS)
}

fn is_training_request(text: &str) -> bool {
    contains_any(text, TRAINING_KEYWORDS)
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}
