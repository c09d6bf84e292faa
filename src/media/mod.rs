//! Attachment download
//!
//! Media is fetched by plain HTTP GET with no caching. The content kind comes
//! from the transport's declared message type; bytes are never sniffed.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use url::Url;

use crate::channels::MessageKind;

const DEFAULT_IMAGE_MIME: &str = "image/jpeg";
const DEFAULT_AUDIO_MIME: &str = "audio/ogg";

/// Why an attachment could not be retrieved
#[derive(Debug, thiserror::Error)]
pub enum MediaFetchError {
    #[error("invalid media url: {0}")]
    InvalidUrl(String),

    #[error("media download failed: {0}")]
    Network(String),

    #[error("media download returned status {0}")]
    Status(u16),

    #[error("media download timed out")]
    Timeout,

    #[error("media download returned no content")]
    Empty,
}

/// Declared kind of an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Audio,
}

impl MediaKind {
    /// Media kind for an inbound message kind, `None` for text
    #[must_use]
    pub const fn from_message_kind(kind: MessageKind) -> Option<Self> {
        match kind {
            MessageKind::Text => None,
            MessageKind::Image => Some(Self::Image),
            MessageKind::Audio => Some(Self::Audio),
        }
    }

    /// MIME type assumed when the transport declares none
    #[must_use]
    pub const fn default_mime(self) -> &'static str {
        match self {
            Self::Image => DEFAULT_IMAGE_MIME,
            Self::Audio => DEFAULT_AUDIO_MIME,
        }
    }
}

/// Downloaded attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPayload {
    pub bytes: Vec<u8>,
    pub kind: MediaKind,
    pub mime_type: String,
}

impl MediaPayload {
    /// Encode as a `data:` URL for inline model input
    #[must_use]
    pub fn to_data_url(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&self.bytes);
        format!("data:{};base64,{encoded}", self.mime_type)
    }

    /// File name hint for multipart uploads
    #[must_use]
    pub fn file_name(&self) -> String {
        let ext = self
            .mime_type
            .split('/')
            .nth(1)
            .and_then(|sub| sub.split(';').next())
            .map(str::trim)
            .filter(|sub| !sub.is_empty())
            .unwrap_or("bin");
        let ext = match ext {
            "mpeg" => "mp3",
            "jpeg" => "jpg",
            other => other,
        };
        format!("attachment.{ext}")
    }
}

/// Retrieves attachment bytes
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Download the attachment at `url`
    ///
    /// `declared_mime` is the transport's MIME hint; the kind default is used
    /// when it is absent.
    async fn fetch(
        &self,
        url: &Url,
        kind: MediaKind,
        declared_mime: Option<&str>,
    ) -> Result<MediaPayload, MediaFetchError>;
}

/// `MediaFetcher` over `reqwest`
pub struct HttpMediaFetcher {
    client: reqwest::Client,
}

impl HttpMediaFetcher {
    /// Create a fetcher whose requests are bounded by `timeout`
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(timeout: Duration) -> crate::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(
        &self,
        url: &Url,
        kind: MediaKind,
        declared_mime: Option<&str>,
    ) -> Result<MediaPayload, MediaFetchError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(MediaFetchError::InvalidUrl(url.to_string()));
        }

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaFetchError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await.map_err(classify)?;
        if bytes.is_empty() {
            return Err(MediaFetchError::Empty);
        }

        let mime_type = declared_mime
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(kind.default_mime())
            .to_string();

        tracing::debug!(bytes = bytes.len(), mime = %mime_type, "media downloaded");

        Ok(MediaPayload {
            bytes: bytes.to_vec(),
            kind,
            mime_type,
        })
    }
}

fn classify(e: reqwest::Error) -> MediaFetchError {
    if e.is_timeout() {
        MediaFetchError::Timeout
    } else {
        MediaFetchError::Network(e.without_url().to_string())
    }
}
