//! Shared test utilities

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pokerlog_gateway::channels::{Channel, OutgoingMessage};
use pokerlog_gateway::db::{self, Account, AccountRepo};
use pokerlog_gateway::llm::{ChatModel, ChatRequest, SpeechToText};
use pokerlog_gateway::media::{MediaFetchError, MediaFetcher, MediaKind, MediaPayload};
use pokerlog_gateway::{Config, ConversationRouter, DbPool, Error, Result, Services};
use url::Url;

/// Set up an in-memory test database
#[must_use]
pub fn setup_test_db() -> DbPool {
    db::init_memory().expect("failed to init test db")
}

/// Register a player with a canonical phone
pub fn create_test_account(db: &DbPool, phone: &str) -> Account {
    AccountRepo::new(db.clone())
        .create("Test Player", phone)
        .expect("failed to create test account")
}

/// Configuration with short deadlines for tests
#[must_use]
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.pipeline.call_timeout = Duration::from_secs(2);
    config
}

/// Which pipeline stage a chat request came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extraction,
    Scenario,
    Evaluation,
    Vision,
    General,
}

fn stage_of(request: &ChatRequest) -> Stage {
    let system = request.system.as_deref().unwrap_or_default();
    if system.contains("extract poker session") {
        Stage::Extraction
    } else if system.contains("grading a student") {
        Stage::Evaluation
    } else if system.contains("demanding poker coach") {
        Stage::Scenario
    } else if system.contains("sent an image") {
        Stage::Vision
    } else {
        Stage::General
    }
}

/// Chat model answering with a canned reply per stage
pub struct ScriptedChat {
    /// Extraction answer when no entry in `extraction_when` matches
    pub extraction: String,
    /// `(needle, answer)`: answer used when the user text contains `needle`
    pub extraction_when: Vec<(String, String)>,
    pub scenario: String,
    pub evaluation: String,
    pub vision: String,
    pub general: String,
    /// Stage at which the model panics
    pub panic_at: Option<Stage>,
    calls: Mutex<Vec<(Stage, ChatRequest)>>,
}

impl Default for ScriptedChat {
    fn default() -> Self {
        Self {
            extraction: r#"{"session":null}"#.to_string(),
            extraction_when: Vec::new(),
            scenario: "Hero has AKo on the button facing a 3-bet. What now?".to_string(),
            evaluation: "Good call, the 4-bet is also fine.".to_string(),
            vision: "Hero should fold the river.".to_string(),
            general: "Position matters.".to_string(),
            panic_at: None,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedChat {
    #[must_use]
    pub fn extracting(json: &str) -> Self {
        Self {
            extraction: json.to_string(),
            ..Self::default()
        }
    }

    /// Extract `json` only from texts containing `needle`
    #[must_use]
    pub fn extracting_when(mut self, needle: &str, json: &str) -> Self {
        self.extraction_when.push((needle.to_string(), json.to_string()));
        self
    }

    /// Panic when called for `stage`
    #[must_use]
    pub fn panicking_at(stage: Stage) -> Self {
        Self {
            panic_at: Some(stage),
            ..Self::default()
        }
    }

    /// Number of calls made for a stage
    pub fn calls_for(&self, stage: Stage) -> usize {
        self.calls.lock().unwrap().iter().filter(|(s, _)| *s == stage).count()
    }

    /// All requests made for a stage, oldest first
    pub fn requests_for(&self, stage: Stage) -> Vec<ChatRequest> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| *s == stage)
            .map(|(_, r)| r.clone())
            .collect()
    }
}

#[async_trait]
impl ChatModel for ScriptedChat {
    async fn complete(&self, request: ChatRequest) -> Result<String> {
        let stage = stage_of(&request);
        let user_text = request.last_user_text().unwrap_or_default();
        self.calls.lock().unwrap().push((stage, request));
        assert_ne!(self.panic_at, Some(stage), "scripted model failure");

        Ok(match stage {
            Stage::Extraction => self
                .extraction_when
                .iter()
                .find(|(needle, _)| user_text.contains(needle.as_str()))
                .map_or_else(|| self.extraction.clone(), |(_, json)| json.clone()),
            Stage::Scenario => self.scenario.clone(),
            Stage::Evaluation => self.evaluation.clone(),
            Stage::Vision => self.vision.clone(),
            Stage::General => self.general.clone(),
        })
    }
}

/// Speech-to-text returning a fixed transcript, or failing when `None`
pub struct FixedTranscript(pub Option<String>);

#[async_trait]
impl SpeechToText for FixedTranscript {
    async fn transcribe(
        &self,
        _audio: &[u8],
        _file_name: &str,
        _mime_type: &str,
    ) -> Result<String> {
        self.0
            .clone()
            .ok_or_else(|| Error::Transcription("provider unavailable".to_string()))
    }
}

/// Media fetcher serving a small fixed payload
#[derive(Default)]
pub struct StubFetcher {
    pub fail: bool,
    fetched: Mutex<Vec<String>>,
}

impl StubFetcher {
    /// Fetcher whose downloads all fail
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaFetcher for StubFetcher {
    async fn fetch(
        &self,
        url: &Url,
        kind: MediaKind,
        declared_mime: Option<&str>,
    ) -> std::result::Result<MediaPayload, MediaFetchError> {
        self.fetched.lock().unwrap().push(url.to_string());
        if self.fail {
            return Err(MediaFetchError::Status(404));
        }
        Ok(MediaPayload {
            bytes: vec![0x4f, 0x67, 0x67, 0x53],
            kind,
            mime_type: declared_mime.unwrap_or(kind.default_mime()).to_string(),
        })
    }
}

/// Channel that records every outbound message
#[derive(Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<OutgoingMessage>>,
}

impl RecordingChannel {
    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Channel for RecordingChannel {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, message: &OutgoingMessage) -> Result<String> {
        let mut sent = self.sent.lock().unwrap();
        sent.push(message.clone());
        Ok(format!("msg-{}", sent.len()))
    }
}

/// A router wired to test doubles
pub struct Harness {
    pub db: DbPool,
    pub chat: Arc<ScriptedChat>,
    pub fetcher: Arc<StubFetcher>,
    pub channel: Arc<RecordingChannel>,
    pub router: ConversationRouter,
}

impl Harness {
    pub fn new(chat: ScriptedChat, transcript: Option<&str>) -> Self {
        Self::with_fetcher(chat, transcript, StubFetcher::default())
    }

    pub fn with_fetcher(
        chat: ScriptedChat,
        transcript: Option<&str>,
        fetcher: StubFetcher,
    ) -> Self {
        let db = setup_test_db();
        let chat = Arc::new(chat);
        let fetcher = Arc::new(fetcher);
        let channel = Arc::new(RecordingChannel::default());

        let services = Services {
            chat: chat.clone(),
            stt: Arc::new(FixedTranscript(transcript.map(ToString::to_string))),
            fetcher: fetcher.clone(),
            channel: channel.clone(),
        };
        let router = ConversationRouter::new(&test_config(), &db, services);

        Self {
            db,
            chat,
            fetcher,
            channel,
            router,
        }
    }
}
