//! Conversation routing
//!
//! Each inbound event walks one path through the pipeline and ends in exactly
//! one reply:
//!
//! 1. Unknown senders get the unrecognized-user text.
//! 2. Images go to vision analysis and the analysis is the reply.
//! 3. Voice notes are downloaded and transcribed; a failed transcription ends
//!    the turn, a transcript continues as text.
//! 4. Text is classified: tournament questions list the schedule, training
//!    requests get a new scenario.
//! 5. Anything else is tried as a session report first. If no session is
//!    recognized it answers a pending training scenario when one is open,
//!    and is otherwise answered as a general question.
//!
//! The audit row is appended once per resolved event before any routing, so
//! it exists whatever happens downstream. The branch's outcome (transcript,
//! parsed session) is attached to it afterwards, and the reply is handed to
//! the dispatcher once.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Local, NaiveDateTime, NaiveTime};
use url::Url;

use crate::advisor::Advisor;
use crate::channels::{Channel, InboundEvent, MessageKind, RetryPolicy};
use crate::config::Config;
use crate::db::{
    Account, AccountRepo, DbPool, LoggedMessage, MessageLogRepo, PokerSessionRepo, TournamentRepo,
    TrainingRepo,
};
use crate::dispatch::ReplyDispatcher;
use crate::extractor::{Extraction, SessionExtractor};
use crate::identity::IdentityResolver;
use crate::intent::{self, Intent};
use crate::llm::{ChatModel, SpeechToText};
use crate::media::{MediaFetcher, MediaKind};
use crate::replies;
use crate::training::TrainingEngine;
use crate::transcription::TranscriptionAdapter;
use crate::vision::VisionAdapter;

/// Which path an event took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    UnknownSender,
    EmptyMessage,
    ImageAnalysis,
    AttachmentFailed,
    TranscriptionFailed,
    Tournaments,
    TrainingScenario,
    TrainingFeedback,
    SessionLogged,
    GeneralAnswer,
}

impl Branch {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnknownSender => "unknown_sender",
            Self::EmptyMessage => "empty_message",
            Self::ImageAnalysis => "image_analysis",
            Self::AttachmentFailed => "attachment_failed",
            Self::TranscriptionFailed => "transcription_failed",
            Self::Tournaments => "tournaments",
            Self::TrainingScenario => "training_scenario",
            Self::TrainingFeedback => "training_feedback",
            Self::SessionLogged => "session_logged",
            Self::GeneralAnswer => "general_answer",
        }
    }
}

/// Result of handling one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub branch: Branch,
    pub reply: String,
    /// Whether the transport accepted the reply
    pub delivered: bool,
}

/// A reply computed for a resolved sender
struct Reply {
    branch: Branch,
    text: String,
    /// What gets logged as the message content
    content: String,
    parsed: Option<serde_json::Value>,
}

impl Reply {
    fn new(branch: Branch, text: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            branch,
            text: text.into(),
            content: content.into(),
            parsed: None,
        }
    }
}

/// External collaborators the router is assembled from
#[derive(Clone)]
pub struct Services {
    pub chat: Arc<dyn ChatModel>,
    pub stt: Arc<dyn SpeechToText>,
    pub fetcher: Arc<dyn MediaFetcher>,
    pub channel: Arc<dyn Channel>,
}

/// Routes inbound events to exactly one reply
#[derive(Clone)]
pub struct ConversationRouter {
    identity: IdentityResolver,
    fetcher: Arc<dyn MediaFetcher>,
    transcription: TranscriptionAdapter,
    vision: VisionAdapter,
    extractor: SessionExtractor,
    training: TrainingEngine,
    advisor: Advisor,
    sessions: PokerSessionRepo,
    tournaments: TournamentRepo,
    log: MessageLogRepo,
    dispatcher: ReplyDispatcher,
    training_window: std::time::Duration,
    lookahead_days: u32,
}

impl ConversationRouter {
    /// Wire the pipeline from configuration, storage and collaborators
    #[must_use]
    pub fn new(config: &Config, pool: &DbPool, services: Services) -> Self {
        let pipeline = &config.pipeline;
        let timeout = pipeline.call_timeout;
        let chat_model = config.openai.chat_model.clone();

        Self {
            identity: IdentityResolver::new(
                AccountRepo::new(pool.clone()),
                pipeline.country_code.clone(),
            ),
            fetcher: services.fetcher.clone(),
            transcription: TranscriptionAdapter::new(services.stt, timeout),
            vision: VisionAdapter::new(
                services.chat.clone(),
                services.fetcher,
                config.openai.vision_model.clone(),
                timeout,
                pipeline.inline_images,
            ),
            extractor: SessionExtractor::new(services.chat.clone(), chat_model.clone(), timeout),
            training: TrainingEngine::new(
                TrainingRepo::new(pool.clone()),
                services.chat.clone(),
                chat_model.clone(),
                timeout,
            ),
            advisor: Advisor::new(services.chat, chat_model, timeout),
            sessions: PokerSessionRepo::new(pool.clone()),
            tournaments: TournamentRepo::new(pool.clone()),
            log: MessageLogRepo::new(pool.clone()),
            dispatcher: ReplyDispatcher::new(
                services.channel,
                RetryPolicy::with_retries(pipeline.dispatch_retries),
                pipeline.country_code.clone(),
            ),
            training_window: pipeline.training_window,
            lookahead_days: pipeline.tournament_lookahead_days,
        }
    }

    /// Handle one inbound event end to end
    pub async fn handle(&self, event: InboundEvent) -> Outcome {
        let Some(account) = self.identity.resolve(&event.sender_id) else {
            tracing::warn!(sender = %event.sender_id, kind = event.kind.as_str(), "unknown sender");
            let delivered = self
                .dispatcher
                .send(&event.sender_id, replies::UNRECOGNIZED_USER)
                .await;
            return Outcome {
                branch: Branch::UnknownSender,
                reply: replies::UNRECOGNIZED_USER.to_string(),
                delivered,
            };
        };

        let log_id = self.log_received(&account, &event);

        let reply = self.route(&account, &event).await;
        tracing::info!(
            sender = %event.sender_id,
            account = %account.id,
            kind = event.kind.as_str(),
            branch = reply.branch.as_str(),
            "event routed"
        );

        if let Some(id) = &log_id {
            self.log_outcome(id, &reply);
        }

        let delivered = self.dispatcher.send(&event.sender_id, &reply.text).await;
        Outcome {
            branch: reply.branch,
            reply: reply.text,
            delivered,
        }
    }

    async fn route(&self, account: &Account, event: &InboundEvent) -> Reply {
        match event.kind {
            MessageKind::Image => {
                let caption = event.trimmed_text();
                let Some(url) = &event.media_ref else {
                    return attachment_failed(caption.unwrap_or_default());
                };
                let analysis = self
                    .vision
                    .analyze(url, caption, event.mime_type.as_deref())
                    .await;
                let branch = if analysis == replies::ATTACHMENT_FAILED {
                    Branch::AttachmentFailed
                } else {
                    Branch::ImageAnalysis
                };
                Reply::new(branch, analysis, caption.unwrap_or_default())
            }
            MessageKind::Audio => {
                let Some(url) = &event.media_ref else {
                    return attachment_failed("");
                };
                match self.transcribe(url, event.mime_type.as_deref()).await {
                    Ok(transcript) => self.route_text(account, &transcript).await,
                    Err(reply) => reply,
                }
            }
            MessageKind::Text => match event.trimmed_text() {
                Some(text) => self.route_text(account, text).await,
                None => Reply::new(Branch::EmptyMessage, replies::EMPTY_MESSAGE, ""),
            },
        }
    }

    async fn transcribe(&self, url: &Url, mime_type: Option<&str>) -> Result<String, Reply> {
        let audio = self
            .fetcher
            .fetch(url, MediaKind::Audio, mime_type)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "voice note download failed");
                attachment_failed("")
            })?;

        self.transcription.transcribe(&audio).await.ok_or_else(|| {
            Reply::new(Branch::TranscriptionFailed, replies::TRANSCRIPTION_FAILED, "")
        })
    }

    async fn route_text(&self, account: &Account, text: &str) -> Reply {
        match intent::classify(text) {
            Intent::TournamentInquiry => self.tournament_reply(text),
            Intent::TrainingRequest => self.training_reply(account, text).await,
            Intent::General => self.session_or_answer(account, text).await,
        }
    }

    fn tournament_reply(&self, text: &str) -> Reply {
        let now = Local::now().naive_local();
        let (from, until) = lookup_range(now, intent::asks_about_today(text), self.lookahead_days);

        let body = match self.tournaments.upcoming(from, until) {
            Ok(list) if list.is_empty() => replies::NO_TOURNAMENTS.to_string(),
            Ok(list) => replies::tournament_list(&list),
            Err(e) => {
                tracing::error!(error = %e, "tournament lookup failed");
                replies::TOURNAMENT_LOOKUP_FAILED.to_string()
            }
        };
        Reply::new(Branch::Tournaments, body, text)
    }

    async fn training_reply(&self, account: &Account, text: &str) -> Reply {
        let body = match self.training.create_scenario(Some(&account.id)).await {
            Some(created) => replies::training_scenario(&created.scenario_text),
            None => replies::TRAINING_FAILED.to_string(),
        };
        Reply::new(Branch::TrainingScenario, body, text)
    }

    async fn session_or_answer(&self, account: &Account, text: &str) -> Reply {
        let today = Local::now().date_naive();
        match self.extractor.extract(text, today).await {
            Extraction::Recognized(record) => {
                let parsed = serde_json::to_value(&record).ok();
                let body = match self.sessions.insert(&account.id, &record) {
                    Ok(stored) => {
                        tracing::info!(
                            session = %stored.id,
                            profit = record.profit(),
                            "session logged"
                        );
                        replies::session_saved(&record)
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to store session");
                        replies::SESSION_SAVE_FAILED.to_string()
                    }
                };
                Reply {
                    parsed,
                    ..Reply::new(Branch::SessionLogged, body, text)
                }
            }
            Extraction::Declined | Extraction::Malformed(_) => {
                let pending = self.training.pending_for(&account.id, self.training_window);
                if let Some(pending) = pending {
                    tracing::debug!(
                        training_id = %pending.id,
                        "treating message as training answer"
                    );
                    return self.training_feedback(&pending.id, text).await;
                }
                let answer = self.advisor.answer(text).await;
                Reply::new(Branch::GeneralAnswer, answer, text)
            }
        }
    }

    async fn training_feedback(&self, training_id: &str, text: &str) -> Reply {
        let feedback = self.training.evaluate_response(training_id, text).await;
        let body = if is_canned(&feedback) {
            feedback
        } else {
            replies::training_feedback(&feedback)
        };
        Reply::new(Branch::TrainingFeedback, body, text)
    }

    /// Append the raw audit row; `None` if storage failed
    fn log_received(&self, account: &Account, event: &InboundEvent) -> Option<String> {
        let entry = LoggedMessage {
            account_id: Some(account.id.clone()),
            sender_id: event.sender_id.clone(),
            kind: event.kind,
            content: event.trimmed_text().unwrap_or_default().to_string(),
            media_ref: event.media_ref.as_ref().map(ToString::to_string),
            parsed_result: None,
        };
        match self.log.append(&entry) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::error!(
                    sender = %event.sender_id,
                    error = %e,
                    "failed to write message log"
                );
                None
            }
        }
    }

    fn log_outcome(&self, log_id: &str, reply: &Reply) {
        if let Err(e) = self
            .log
            .record_outcome(log_id, &reply.content, reply.parsed.as_ref())
        {
            tracing::error!(log_id, error = %e, "failed to update message log");
        }
    }
}

fn is_canned(text: &str) -> bool {
    text == replies::TRAINING_NOT_FOUND || text == replies::TRAINING_EVALUATION_FAILED
}

fn attachment_failed(content: &str) -> Reply {
    Reply::new(Branch::AttachmentFailed, replies::ATTACHMENT_FAILED, content)
}

/// Tournament search window `[from, until)`
///
/// Same-day questions cover the rest of today; others look ahead
/// `lookahead_days`.
#[must_use]
pub fn lookup_range(
    now: NaiveDateTime,
    same_day: bool,
    lookahead_days: u32,
) -> (NaiveDateTime, NaiveDateTime) {
    let until = if same_day {
        (now.date() + ChronoDuration::days(1)).and_time(NaiveTime::MIN)
    } else {
        now + ChronoDuration::days(i64::from(lookahead_days.max(1)))
    };
    (now, until)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn on(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        on(19, h, m)
    }

    #[test]
    fn same_day_range_ends_at_midnight() {
        let (from, until) = lookup_range(at(18, 30), true, 7);
        assert_eq!(from, at(18, 30));
        assert_eq!(until, on(20, 0, 0));
    }

    #[test]
    fn open_range_uses_lookahead() {
        let (_, until) = lookup_range(at(9, 0), false, 3);
        assert_eq!(until, on(22, 9, 0));
    }

    #[test]
    fn branch_names_are_distinct() {
        let all = [
            Branch::UnknownSender,
            Branch::EmptyMessage,
            Branch::ImageAnalysis,
            Branch::AttachmentFailed,
            Branch::TranscriptionFailed,
            Branch::Tournaments,
            Branch::TrainingScenario,
            Branch::TrainingFeedback,
            Branch::SessionLogged,
            Branch::GeneralAnswer,
        ];
        let names: std::collections::HashSet<_> = all.iter().map(|b| b.as_str()).collect();
        assert_eq!(names.len(), all.len());
    }
}
