//! User-facing reply texts
//!
//! Every fixed string the bot can send lives here so branches and tests agree
//! on the exact wording.

use std::fmt::Write as _;

use crate::db::{SessionRecord, Tournament};

/// Sender has no registered account
pub const UNRECOGNIZED_USER: &str =
    "שלום! המספר שלך לא מזוהה במערכת. כדי להשתמש בבוט יש להירשם דרך האתר או לפנות למנהל.";

/// Attachment download failed
pub const ATTACHMENT_FAILED: &str =
    "מצטער, לא הצלחתי לעבד את הקובץ ששלחת. אפשר לנסות לשלוח אותו שוב?";

/// Vision model failed
pub const VISION_FAILED: &str =
    "מצטער, לא הצלחתי לנתח את התמונה כרגע. נסה שוב בעוד כמה דקות.";

/// Voice note could not be transcribed
pub const TRANSCRIPTION_FAILED: &str =
    "מצטער, לא הצלחתי להבין את ההודעה הקולית. אפשר לנסות שוב או לכתוב את זה בהודעה?";

/// Text event with nothing in it
pub const EMPTY_MESSAGE: &str =
    "לא קיבלתי תוכן בהודעה. אפשר לספר לי על הסשן האחרון שלך או לשאול שאלה על פוקר.";

/// Tournament lookup found nothing in range
pub const NO_TOURNAMENTS: &str = "לא מצאתי טורנירים קרובים בטווח הזמן הזה. 🃏";

/// Tournament lookup failed
pub const TOURNAMENT_LOOKUP_FAILED: &str =
    "מצטער, לא הצלחתי לבדוק את לוח הטורנירים כרגע. נסה שוב מאוחר יותר.";

/// Scenario generation or persistence failed
pub const TRAINING_FAILED: &str =
    "מצטער, לא הצלחתי ליצור תרגיל אימון כרגע. נסה שוב מאוחר יותר.";

/// Referenced training session does not exist
pub const TRAINING_NOT_FOUND: &str =
    "מצטער, לא מצאתי את תרגיל האימון הזה. אפשר לבקש תרגיל חדש עם המילה \"אימון\".";

/// Feedback generation failed
pub const TRAINING_EVALUATION_FAILED: &str =
    "מצטער, לא הצלחתי להעריך את התשובה שלך כרגע. נסה שוב מאוחר יותר.";

/// A session was recognized but could not be stored
pub const SESSION_SAVE_FAILED: &str =
    "זיהיתי את פרטי הסשן אבל לא הצלחתי לשמור אותם. נסה לשלוח שוב בעוד רגע.";

/// General answer failed
pub const GENERAL_FAILED: &str = "מצטער, משהו השתבש. נסה שוב מאוחר יותר.";

/// Render an amount without trailing `.00` for whole numbers
#[must_use]
pub fn format_amount(amount: f64) -> String {
    if amount.fract().abs() < f64::EPSILON {
        format!("{amount:.0}")
    } else {
        format!("{amount:.2}")
    }
}

/// Confirmation for a stored session, including computed profit
#[must_use]
pub fn session_saved(record: &SessionRecord) -> String {
    let mut out = String::from("✅ הסשן נשמר בהצלחה!\n\n");
    let _ = writeln!(out, "📅 תאריך: {}", record.date.format("%d/%m/%Y"));
    let _ = writeln!(out, "🎮 משחק: {} ({})", record.game_type, record.format.label());
    if let Some(kind) = &record.tournament_type {
        let _ = writeln!(out, "🏆 סוג טורניר: {kind}");
    }
    let _ = writeln!(out, "📍 פלטפורמה: {}", record.platform.label());
    let _ = writeln!(out, "💰 כניסה: {}₪", format_amount(record.buy_in));
    let _ = writeln!(out, "💵 יציאה: {}₪", format_amount(record.cash_out));

    let profit = record.profit();
    if profit < 0.0 {
        let _ = write!(out, "📉 הפסד: {}₪", format_amount(profit));
    } else {
        let _ = write!(out, "📈 רווח: {}₪", format_amount(profit));
    }

    if let Some(notes) = &record.notes {
        let _ = write!(out, "\n📝 הערות: {notes}");
    }
    out
}

/// Schedule listing; callers send [`NO_TOURNAMENTS`] for an empty list
#[must_use]
pub fn tournament_list(tournaments: &[Tournament]) -> String {
    let mut out = String::from("🏆 טורנירים קרובים:\n");
    for t in tournaments {
        let _ = write!(out, "\n• {} | {}", t.name, t.starts_at.format("%d/%m %H:%M"));
        if let Some(venue) = &t.venue {
            let _ = write!(out, " | {venue}");
        }
        if let Some(buy_in) = t.buy_in {
            let _ = write!(out, " | כניסה: {}₪", format_amount(buy_in));
        }
    }
    out
}

/// Wrap a generated scenario with answering instructions
#[must_use]
pub fn training_scenario(scenario: &str) -> String {
    format!("🎯 תרגיל אימון:\n\n{}\n\nמה היית עושה? ענה עם ההחלטה שלך והסבר קצר.", scenario.trim())
}

/// Wrap evaluation feedback
#[must_use]
pub fn training_feedback(feedback: &str) -> String {
    format!("📝 משוב על התשובה שלך:\n\n{}", feedback.trim())
}
