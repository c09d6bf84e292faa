//! Practice scenarios
//!
//! A scenario is generated and stored awaiting an answer. When the answer
//! arrives it is evaluated against the stored scenario and both the answer and
//! the feedback are written back onto the same row.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::db::{TrainingRepo, TrainingSession};
use crate::error::with_deadline;
use crate::llm::{ChatModel, ChatRequest};
use crate::replies;

const SCENARIO_PROMPT: &str = "You are a demanding poker coach. Create one challenging No-Limit \
Hold'em decision point for a recreational player who plays live cash games and small tournaments. \
Give the game and stakes or tournament stage, stack depths, positions, the hero's hand, the \
action so far and the board if postflop. End with the question of what the hero should do. Do not \
reveal the answer. Write in Hebrew, plain text, at most 10 lines.";

const EVALUATION_PROMPT: &str = "You are a poker coach grading a student's answer to a practice \
scenario. Say whether the decision is good, explain the key considerations (ranges, pot odds, \
position, stack depth) and state what you would do and why. Be encouraging but honest. Write in \
Hebrew, plain text, at most 12 lines.";

/// A freshly stored scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedScenario {
    pub training_id: String,
    pub scenario_text: String,
}

/// Generates and grades practice scenarios
#[derive(Clone)]
pub struct TrainingEngine {
    repo: TrainingRepo,
    model: Arc<dyn ChatModel>,
    model_name: String,
    timeout: Duration,
}

impl TrainingEngine {
    #[must_use]
    pub fn new(
        repo: TrainingRepo,
        model: Arc<dyn ChatModel>,
        model_name: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            repo,
            model,
            model_name: model_name.into(),
            timeout,
        }
    }

    /// Generate and store a new scenario
    ///
    /// Returns `None` if the model call or the insert fails.
    pub async fn create_scenario(&self, account_id: Option<&str>) -> Option<CreatedScenario> {
        let request = ChatRequest::new(&self.model_name)
            .system(SCENARIO_PROMPT)
            .user_text("תן לי תרגיל חדש")
            .temperature(0.9)
            .max_tokens(600);

        let reply = with_deadline(self.timeout, "scenario", self.model.complete(request)).await;
        let scenario_text = match reply {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "scenario generation failed");
                return None;
            }
        };

        match self.repo.create(account_id, &scenario_text) {
            Ok(session) => {
                tracing::info!(training_id = %session.id, "training scenario created");
                Some(CreatedScenario {
                    training_id: session.id,
                    scenario_text,
                })
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to store training scenario");
                None
            }
        }
    }

    /// Grade an answer and store it with the feedback
    ///
    /// Not idempotent: calling it again for the same ID overwrites the stored
    /// answer and feedback. Unknown IDs and failures return fixed reply texts.
    pub async fn evaluate_response(&self, training_id: &str, user_text: &str) -> String {
        let session = match self.repo.find(training_id) {
            Ok(Some(session)) => session,
            Ok(None) => {
                tracing::warn!(training_id, "training session not found");
                return replies::TRAINING_NOT_FOUND.to_string();
            }
            Err(e) => {
                tracing::error!(training_id, error = %e, "training lookup failed");
                return replies::TRAINING_NOT_FOUND.to_string();
            }
        };

        let request = ChatRequest::new(&self.model_name)
            .system(EVALUATION_PROMPT)
            .user_text(format!(
                "Scenario:\n{}\n\nStudent's answer:\n{}",
                session.scenario_text,
                user_text.trim()
            ))
            .temperature(0.3)
            .max_tokens(700);

        let reply = with_deadline(self.timeout, "evaluation", self.model.complete(request)).await;
        let feedback = match reply {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                tracing::warn!(training_id, error = %e, "answer evaluation failed");
                return replies::TRAINING_EVALUATION_FAILED.to_string();
            }
        };

        match self.repo.record_response(training_id, user_text.trim(), &feedback) {
            Ok(true) => tracing::info!(training_id, "training response evaluated"),
            Ok(false) => {
                tracing::warn!(training_id, "training session vanished before update");
                return replies::TRAINING_NOT_FOUND.to_string();
            }
            Err(e) => tracing::error!(training_id, error = %e, "failed to store training feedback"),
        }

        feedback
    }

    /// Latest scenario for an account still awaiting an answer within `window`
    #[must_use]
    pub fn pending_for(&self, account_id: &str, window: Duration) -> Option<TrainingSession> {
        let window =
            chrono::Duration::from_std(window).unwrap_or_else(|_| chrono::Duration::days(1));
        let since = Utc::now() - window;
        match self.repo.latest_awaiting(account_id, since) {
            Ok(found) => found,
            Err(e) => {
                tracing::error!(account = account_id, error = %e, "pending training lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::db::{TrainingStatus, init_memory};
    use crate::{Error, Result};

    /// Pops scripted answers in order
    struct Scripted(Mutex<Vec<Result<String>>>);

    impl Scripted {
        fn new(answers: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(Self(Mutex::new(answers.into_iter().rev().collect())))
        }
    }

    #[async_trait]
    impl ChatModel for Scripted {
        async fn complete(&self, _: ChatRequest) -> Result<String> {
            self.0
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(Error::Llm("script exhausted".to_string())))
        }
    }

    fn engine(model: Arc<Scripted>) -> (TrainingEngine, TrainingRepo) {
        let repo = TrainingRepo::new(init_memory().unwrap());
        let engine =
            TrainingEngine::new(repo.clone(), model, "gpt-4o-mini", Duration::from_secs(1));
        (engine, repo)
    }

    #[tokio::test]
    async fn scenario_is_stored_awaiting_response() {
        let (engine, repo) = engine(Scripted::new(vec![Ok("AKo UTG".to_string())]));

        let created = engine.create_scenario(Some("acct")).await.unwrap();
        assert_eq!(created.scenario_text, "AKo UTG");

        let stored = repo.find(&created.training_id).unwrap().unwrap();
        assert_eq!(stored.status(), TrainingStatus::AwaitingResponse);
        assert_eq!(stored.account_id.as_deref(), Some("acct"));
    }

    #[tokio::test]
    async fn scenario_model_failure_is_none() {
        let (engine, _) = engine(Scripted::new(vec![Err(Error::Llm("down".to_string()))]));
        assert!(engine.create_scenario(None).await.is_none());
    }

    #[tokio::test]
    async fn unknown_id_returns_fixed_text() {
        let (engine, _) = engine(Scripted::new(vec![]));
        assert_eq!(
            engine.evaluate_response("no-such-id", "fold").await,
            replies::TRAINING_NOT_FOUND
        );
    }

    #[tokio::test]
    async fn second_evaluation_overwrites_first() {
        let (engine, repo) = engine(Scripted::new(vec![
            Ok("spot".to_string()),
            Ok("too passive".to_string()),
            Ok("well played".to_string()),
        ]));
        let created = engine.create_scenario(None).await.unwrap();

        assert_eq!(engine.evaluate_response(&created.training_id, "call").await, "too passive");
        assert_eq!(engine.evaluate_response(&created.training_id, "raise").await, "well played");

        let stored = repo.find(&created.training_id).unwrap().unwrap();
        assert_eq!(stored.status(), TrainingStatus::Completed);
        assert_eq!(stored.user_response_text.as_deref(), Some("raise"));
        assert_eq!(stored.feedback_text.as_deref(), Some("well played"));
    }

    #[tokio::test]
    async fn evaluation_failure_leaves_session_awaiting() {
        let (engine, repo) = engine(Scripted::new(vec![
            Ok("spot".to_string()),
            Err(Error::Llm("down".to_string())),
        ]));
        let created = engine.create_scenario(None).await.unwrap();

        assert_eq!(
            engine.evaluate_response(&created.training_id, "fold").await,
            replies::TRAINING_EVALUATION_FAILED
        );
        let stored = repo.find(&created.training_id).unwrap().unwrap();
        assert_eq!(stored.status(), TrainingStatus::AwaitingResponse);
    }

    #[tokio::test]
    async fn pending_within_window() {
        let (engine, _) = engine(Scripted::new(vec![Ok("spot".to_string())]));
        let created = engine.create_scenario(Some("acct")).await.unwrap();

        let pending = engine.pending_for("acct", Duration::from_secs(600)).unwrap();
        assert_eq!(pending.id, created.training_id);
        assert!(engine.pending_for("other", Duration::from_secs(600)).is_none());
    }
}
