//! General poker Q&A

use std::sync::Arc;
use std::time::Duration;

use crate::error::with_deadline;
use crate::llm::{ChatModel, ChatRequest};
use crate::replies;

const SYSTEM_PROMPT: &str = "You are a friendly poker assistant on WhatsApp for a community of \
Israeli players who log their sessions with you. Answer poker questions (strategy, rules, \
bankroll, etiquette) concisely and accurately. If the user seems to be reporting a session but \
details are missing, ask for the buy-in, the cash-out, the game format and where they played. \
Answer in Hebrew, plain text, at most 10 lines.";

/// Answers messages that are neither intents nor session reports
#[derive(Clone)]
pub struct Advisor {
    model: Arc<dyn ChatModel>,
    model_name: String,
    timeout: Duration,
}

impl Advisor {
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

    /// Answer a free-text message, falling back to a fixed apology
    pub async fn answer(&self, text: &str) -> String {
        let request = ChatRequest::new(&self.model_name)
            .system(SYSTEM_PROMPT)
            .user_text(text)
            .temperature(0.5)
            .max_tokens(600);

        match with_deadline(self.timeout, "general answer", self.model.complete(request)).await {
            Ok(answer) => answer.trim().to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "general answer failed");
                replies::GENERAL_FAILED.to_string()
            }
        }
    }
}
