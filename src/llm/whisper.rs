//! Whisper-style transcription over multipart upload

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};

use super::SpeechToText;
use crate::{Error, Result};

#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Transcription client for `/audio/transcriptions`
pub struct WhisperClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
    model: String,
    language: String,
}

impl WhisperClient {
    /// Create a client with a fixed model and language hint
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(
        base_url: &str,
        api_key: SecretString,
        model: impl Into<String>,
        language: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            language: language.into(),
        })
    }
}

#[async_trait]
impl SpeechToText for WhisperClient {
    async fn transcribe(&self, audio: &[u8], file_name: &str, mime_type: &str) -> Result<String> {
        tracing::debug!(
            audio_bytes = audio.len(),
            language = %self.language,
            "starting transcription"
        );

        let part = reqwest::multipart::Part::bytes(audio.to_vec())
            .file_name(file_name.to_string())
            .mime_str(mime_type)
            .map_err(|e| Error::Transcription(e.to_string()))?;

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("language", self.language.clone())
            .text("response_format", "json");

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Transcription(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Transcription(format!("API error {status}: {body}")));
        }

        let result: WhisperResponse = response
            .json()
            .await
            .map_err(|e| Error::Transcription(format!("failed to parse response: {e}")))?;

        tracing::debug!(chars = result.text.len(), "transcription complete");
        Ok(result.text)
    }
}
