//! Error types for the pokerlog gateway

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::media::MediaFetchError;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Channel error (bad configuration, malformed provider response)
    #[error("channel error: {0}")]
    Channel(String),

    /// Outbound delivery failed
    ///
    /// `status` is `None` when the request never produced an HTTP response.
    #[error("delivery error ({status:?}): {message}")]
    Delivery {
        status: Option<u16>,
        message: String,
    },

    /// Language model error
    #[error("llm error: {0}")]
    Llm(String),

    /// Speech-to-text error
    #[error("transcription error: {0}")]
    Transcription(String),

    /// Attachment download error
    #[error("media fetch error: {0}")]
    MediaFetch(#[from] MediaFetchError),

    /// An external call exceeded its deadline
    #[error("timed out: {0}")]
    Timeout(String),

    /// Resource not found
    #[error("not found: {0}")]
    NotFound(String),
}

/// Run an external call under a deadline
///
/// # Errors
///
/// Returns `Error::Timeout` if `fut` does not finish within `limit`,
/// otherwise whatever `fut` returns.
pub async fn with_deadline<T, F>(limit: Duration, label: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .unwrap_or_else(|_| Err(Error::Timeout(format!("{label} after {}s", limit.as_secs()))))
}
