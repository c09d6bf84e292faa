//! Voice-note transcription adapter

use std::sync::Arc;
use std::time::Duration;

use crate::error::with_deadline;
use crate::llm::SpeechToText;
use crate::media::MediaPayload;

/// Turns audio payloads into text, or `None`
///
/// Provider errors, timeouts and blank transcripts all collapse to `None` so
/// the caller can answer with the transcription-failure text instead of
/// treating silence as a message.
#[derive(Clone)]
pub struct TranscriptionAdapter {
    stt: Arc<dyn SpeechToText>,
    timeout: Duration,
}

impl TranscriptionAdapter {
    #[must_use]
    pub fn new(stt: Arc<dyn SpeechToText>, timeout: Duration) -> Self {
        Self { stt, timeout }
    }

    pub async fn transcribe(&self, audio: &MediaPayload) -> Option<String> {
        let file_name = audio.file_name();
        let call = self
            .stt
            .transcribe(&audio.bytes, &file_name, &audio.mime_type);

        match with_deadline(self.timeout, "transcription", call).await {
            Ok(text) => {
                let text = text.trim();
                if text.is_empty() {
                    tracing::warn!("transcription came back empty");
                    None
                } else {
                    Some(text.to_string())
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "transcription failed");
                None
            }
        }
    }
}
