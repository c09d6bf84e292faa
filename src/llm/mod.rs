//! Language-model collaborators
//!
//! [`ChatModel`] covers chat completions (extraction, vision, training,
//! general answers) and [`SpeechToText`] covers audio transcription. Both are
//! injected into the pipeline so tests can swap in scripted doubles.

mod openai;
mod whisper;

use async_trait::async_trait;

pub use openai::OpenAiChat;
pub use whisper::WhisperClient;

use crate::Result;

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One piece of message content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    /// Remote URL or `data:` URL
    ImageUrl(String),
}

/// A chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub parts: Vec<ContentPart>,
}

impl ChatMessage {
    /// User message with a single text part
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![ContentPart::Text(text.into())],
        }
    }

    /// Concatenated text parts
    #[must_use]
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                ContentPart::Text(t) => Some(t.as_str()),
                ContentPart::ImageUrl(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Requested output shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Text,
    /// Model must answer with a single JSON value
    JsonObject,
}

/// A single chat-completion call
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub system: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub response_format: ResponseFormat,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl ChatRequest {
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system: None,
            messages: Vec::new(),
            response_format: ResponseFormat::Text,
            max_tokens: None,
            temperature: None,
        }
    }

    #[must_use]
    pub fn system(mut self, prompt: impl Into<String>) -> Self {
        self.system = Some(prompt.into());
        self
    }

    #[must_use]
    pub fn message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    #[must_use]
    pub fn user_text(self, text: impl Into<String>) -> Self {
        self.message(ChatMessage::user(text))
    }

    #[must_use]
    pub const fn json(mut self) -> Self {
        self.response_format = ResponseFormat::JsonObject;
        self
    }

    #[must_use]
    pub const fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    #[must_use]
    pub const fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Text of the last user message
    #[must_use]
    pub fn last_user_text(&self) -> Option<String> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(ChatMessage::text)
    }
}

/// Chat-completion provider
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run one completion and return the assistant text
    ///
    /// # Errors
    ///
    /// Returns `Error::Llm` if the provider fails or answers with no content
    async fn complete(&self, request: ChatRequest) -> Result<String>;
}

/// Speech-to-text provider
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe an audio file
    ///
    /// # Errors
    ///
    /// Returns `Error::Transcription` if the provider fails
    async fn transcribe(&self, audio: &[u8], file_name: &str, mime_type: &str) -> Result<String>;
}
