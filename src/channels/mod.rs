//! Messaging channel adapters
//!
//! A channel turns provider webhooks into [`InboundEvent`]s and delivers
//! [`OutgoingMessage`]s back through the provider.

pub mod retry;
mod whatsapp;

use async_trait::async_trait;
use url::Url;

pub use retry::RetryPolicy;
pub use whatsapp::{
    WhatsAppChannel, WhatsAppExtendedTextData, WhatsAppFileData, WhatsAppMessageData,
    WhatsAppSenderData, WhatsAppTextData, WhatsAppWebhook,
};

use crate::Result;

/// Kind of inbound message the pipeline understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Text,
    Image,
    Audio,
}

impl MessageKind {
    /// Stored/logged value
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Audio => "audio",
        }
    }

    /// Parse a stored value
    #[must_use]
    pub fn from_str_value(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            "audio" => Some(Self::Audio),
            _ => None,
        }
    }

    /// Whether the event carries a downloadable attachment
    #[must_use]
    pub const fn has_media(self) -> bool {
        !matches!(self, Self::Text)
    }
}

/// One inbound message, built per webhook call and never persisted as-is
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    /// Transport sender identifier, e.g. `972541234567@c.us`
    pub sender_id: String,

    /// Sender display name, when the transport provides one
    pub sender_name: Option<String>,

    pub kind: MessageKind,

    /// Message body, or the caption for media
    pub text: Option<String>,

    /// Download URL for image/audio
    pub media_ref: Option<Url>,

    /// Declared MIME type of the attachment
    pub mime_type: Option<String>,
}

impl InboundEvent {
    /// Create a text event
    #[must_use]
    pub fn text(sender_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            sender_name: None,
            kind: MessageKind::Text,
            text: Some(text.into()),
            media_ref: None,
            mime_type: None,
        }
    }

    /// Create an image event with an optional caption
    #[must_use]
    pub fn image(sender_id: impl Into<String>, media_ref: Url, caption: Option<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            sender_name: None,
            kind: MessageKind::Image,
            text: caption.filter(|c| !c.trim().is_empty()),
            media_ref: Some(media_ref),
            mime_type: None,
        }
    }

    /// Create an audio (voice note) event
    #[must_use]
    pub fn audio(sender_id: impl Into<String>, media_ref: Url, mime_type: Option<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            sender_name: None,
            kind: MessageKind::Audio,
            text: None,
            media_ref: Some(media_ref),
            mime_type,
        }
    }

    /// Text body trimmed, `None` when blank
    #[must_use]
    pub fn trimmed_text(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

/// A message to send to a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Transport recipient identifier
    pub recipient: String,

    /// Plain text body
    pub content: String,
}

impl OutgoingMessage {
    /// Create a simple `text` message
    #[must_use]
    pub fn text(recipient: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            content: content.into(),
        }
    }
}

/// Outbound side of a messaging transport
#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel name (e.g., "whatsapp")
    fn name(&self) -> &'static str;

    /// Send a message, returning the provider-assigned message ID
    ///
    /// # Errors
    ///
    /// Returns `Error::Delivery` if the provider did not accept the message
    async fn send(&self, message: &OutgoingMessage) -> Result<String>;
}
