//! `WhatsApp` channel adapter
//!
//! Talks to a Green-API style `WhatsApp` gateway. Outbound text goes through
//! `sendMessage`; inbound messages arrive as webhook notifications which are
//! converted into [`InboundEvent`]s here.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

use super::{Channel, InboundEvent, OutgoingMessage};
use crate::{Error, Result};

const INCOMING_MESSAGE: &str = "incomingMessageReceived";

/// `WhatsApp` gateway channel
pub struct WhatsAppChannel {
    api_url: String,
    instance_id: String,
    token: SecretString,
    client: Client,
}

impl WhatsAppChannel {
    /// Create a new `WhatsApp` channel adapter
    ///
    /// # Arguments
    ///
    /// * `api_url` - Gateway base URL, e.g. `https://api.green-api.com`
    /// * `instance_id` - Gateway instance identifier
    /// * `token` - Instance API token
    /// * `timeout` - Per-request timeout
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(
        api_url: &str,
        instance_id: impl Into<String>,
        token: SecretString,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            instance_id: instance_id.into(),
            token,
            client,
        })
    }

    /// Endpoint for a gateway method; contains the token, never log it
    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/waInstance{}/{method}/{}",
            self.api_url,
            self.instance_id,
            self.token.expose_secret()
        )
    }

    /// Send a text message to a chat
    ///
    /// # Errors
    ///
    /// Returns `Error::Delivery` if the request fails, the gateway answers with
    /// a non-2xx status, or the response carries no `idMessage`
    pub async fn send_text(&self, chat_id: &str, text: &str) -> Result<String> {
        let body = serde_json::json!({
            "chatId": chat_id,
            "message": text,
        });

        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Delivery {
                status: None,
                message: format!("WhatsApp gateway unreachable: {}", e.without_url()),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Delivery {
                status: Some(status.as_u16()),
                message: format!("WhatsApp gateway error: {status} - {body}"),
            });
        }

        let sent: SendMessageResponse = response.json().await.map_err(|e| Error::Delivery {
            status: Some(status.as_u16()),
            message: format!("invalid sendMessage response: {}", e.without_url()),
        })?;

        match sent.id_message.filter(|id| !id.is_empty()) {
            Some(id) => {
                tracing::debug!(chat_id, message_id = %id, "WhatsApp message sent");
                Ok(id)
            }
            None => Err(Error::Delivery {
                status: Some(status.as_u16()),
                message: "sendMessage response carried no idMessage".to_string(),
            }),
        }
    }
}

#[async_trait]
impl Channel for WhatsAppChannel {
    fn name(&self) -> &'static str {
        "whatsapp"
    }

    async fn send(&self, message: &OutgoingMessage) -> Result<String> {
        self.send_text(&message.recipient, &message.content).await
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageResponse {
    id_message: Option<String>,
}

/// Gateway webhook notification
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatsAppWebhook {
    /// Notification type, e.g. `incomingMessageReceived`
    pub type_webhook: String,
    /// Provider message ID
    pub id_message: Option<String>,
    pub sender_data: Option<WhatsAppSenderData>,
    pub message_data: Option<WhatsAppMessageData>,
}

/// Who sent the message
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatsAppSenderData {
    /// Chat the message arrived in
    pub chat_id: String,
    /// Individual sender (differs from `chat_id` in groups)
    pub sender: Option<String>,
    pub sender_name: Option<String>,
}

/// Message body, discriminated by `type_message`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatsAppMessageData {
    pub type_message: String,
    pub text_message_data: Option<WhatsAppTextData>,
    pub extended_text_message_data: Option<WhatsAppExtendedTextData>,
    pub file_message_data: Option<WhatsAppFileData>,
}

/// Plain text body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatsAppTextData {
    pub text_message: String,
}

/// Text with link preview or quote
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatsAppExtendedTextData {
    pub text: String,
}

/// Image, audio or document attachment
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatsAppFileData {
    pub download_url: String,
    pub caption: Option<String>,
    pub mime_type: Option<String>,
    pub file_name: Option<String>,
}

impl WhatsAppWebhook {
    /// Convert the notification into an inbound event
    ///
    /// Returns `Ok(None)` for notifications that are acknowledged but not
    /// routed: status updates, outgoing echoes and unsupported message types.
    ///
    /// # Errors
    ///
    /// Returns `Error::Channel` when an incoming message is missing the fields
    /// its type requires
    pub fn into_event(self) -> Result<Option<InboundEvent>> {
        if self.type_webhook != INCOMING_MESSAGE {
            tracing::debug!(type_webhook = %self.type_webhook, "ignoring non-message webhook");
            return Ok(None);
        }

        let sender = self
            .sender_data
            .ok_or_else(|| Error::Channel("incoming message without senderData".to_string()))?;
        let data = self
            .message_data
            .ok_or_else(|| Error::Channel("incoming message without messageData".to_string()))?;

        let sender_id = sender
            .sender
            .filter(|s| !s.is_empty())
            .unwrap_or(sender.chat_id);
        if sender_id.is_empty() {
            return Err(Error::Channel("empty sender identifier".to_string()));
        }

        let mut event = match data.type_message.as_str() {
            "textMessage" => {
                let text = data.text_message_data.ok_or_else(|| {
                    Error::Channel("textMessage without textMessageData".to_string())
                })?;
                InboundEvent::text(sender_id, text.text_message)
            }
            "extendedTextMessage" => {
                let text = data.extended_text_message_data.ok_or_else(|| {
                    Error::Channel(
                        "extendedTextMessage without extendedTextMessageData".to_string(),
                    )
                })?;
                InboundEvent::text(sender_id, text.text)
            }
            "imageMessage" => {
                let file = required_file(data.file_message_data, "imageMessage")?;
                let url = parse_download_url(&file.download_url)?;
                let mut event = InboundEvent::image(sender_id, url, file.caption);
                event.mime_type = file.mime_type;
                event
            }
            "audioMessage" => {
                let file = required_file(data.file_message_data, "audioMessage")?;
                let url = parse_download_url(&file.download_url)?;
                InboundEvent::audio(sender_id, url, file.mime_type)
            }
            other => {
                tracing::debug!(type_message = other, "ignoring unsupported message type");
                return Ok(None);
            }
        };

        event.sender_name = sender.sender_name.filter(|n| !n.is_empty());
        Ok(Some(event))
    }
}

fn required_file(file: Option<WhatsAppFileData>, type_message: &str) -> Result<WhatsAppFileData> {
    file.ok_or_else(|| Error::Channel(format!("{type_message} without fileMessageData")))
}

fn parse_download_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| Error::Channel(format!("invalid downloadUrl: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(Error::Channel(format!("unsupported downloadUrl scheme: {scheme}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::MessageKind;

    fn parse(value: serde_json::Value) -> WhatsAppWebhook {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn text_message_becomes_text_event() {
        let webhook = parse(serde_json::json!({
            "typeWebhook": "incomingMessageReceived",
            "idMessage": "ABC",
            "senderData": {
                "chatId": "972541234567@c.us",
                "sender": "972541234567@c.us",
                "senderName": "Dana"
            },
            "messageData": {
                "typeMessage": "textMessage",
                "textMessageData": { "textMessage": "שלום" }
            }
        }));

        let event = webhook.into_event().unwrap().unwrap();
        assert_eq!(event.kind, MessageKind::Text);
        assert_eq!(event.sender_id, "972541234567@c.us");
        assert_eq!(event.sender_name.as_deref(), Some("Dana"));
        assert_eq!(event.text.as_deref(), Some("שלום"));
    }

    #[test]
    fn extended_text_is_text() {
        let webhook = parse(serde_json::json!({
            "typeWebhook": "incomingMessageReceived",
            "senderData": { "chatId": "972541234567@c.us" },
            "messageData": {
                "typeMessage": "extendedTextMessage",
                "extendedTextMessageData": { "text": "https://example.com" }
            }
        }));

        let event = webhook.into_event().unwrap().unwrap();
        assert_eq!(event.kind, MessageKind::Text);
        assert_eq!(event.text.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn image_carries_url_and_caption() {
        let webhook = parse(serde_json::json!({
            "typeWebhook": "incomingMessageReceived",
            "senderData": { "chatId": "972541234567@c.us" },
            "messageData": {
                "typeMessage": "imageMessage",
                "fileMessageData": {
                    "downloadUrl": "https://media.example/img.jpg",
                    "caption": "מה דעתך?",
                    "mimeType": "image/jpeg"
                }
            }
        }));

        let event = webhook.into_event().unwrap().unwrap();
        assert_eq!(event.kind, MessageKind::Image);
        assert_eq!(event.media_ref.unwrap().as_str(), "https://media.example/img.jpg");
        assert_eq!(event.text.as_deref(), Some("מה דעתך?"));
        assert_eq!(event.mime_type.as_deref(), Some("image/jpeg"));
    }

    #[test]
    fn audio_requires_file_data() {
        let webhook = parse(serde_json::json!({
            "typeWebhook": "incomingMessageReceived",
            "senderData": { "chatId": "972541234567@c.us" },
            "messageData": { "typeMessage": "audioMessage" }
        }));

        assert!(webhook.into_event().is_err());
    }

    #[test]
    fn invalid_download_url_rejected() {
        let webhook = parse(serde_json::json!({
            "typeWebhook": "incomingMessageReceived",
            "senderData": { "chatId": "972541234567@c.us" },
            "messageData": {
                "typeMessage": "audioMessage",
                "fileMessageData": { "downloadUrl": "file:///etc/passwd" }
            }
        }));

        assert!(webhook.into_event().is_err());
    }

    #[test]
    fn status_notifications_are_ignored() {
        let webhook = parse(serde_json::json!({
            "typeWebhook": "outgoingMessageStatus",
            "idMessage": "ABC"
        }));

        assert!(webhook.into_event().unwrap().is_none());
    }

    #[test]
    fn unsupported_message_type_is_ignored() {
        let webhook = parse(serde_json::json!({
            "typeWebhook": "incomingMessageReceived",
            "senderData": { "chatId": "972541234567@c.us" },
            "messageData": { "typeMessage": "stickerMessage" }
        }));

        assert!(webhook.into_event().unwrap().is_none());
    }

    #[test]
    fn method_url_layout() {
        let channel = WhatsAppChannel::new(
            "https://api.green-api.com/",
            "1101",
            SecretString::from("tok"),
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(
            channel.method_url("sendMessage"),
            "https://api.green-api.com/waInstance1101/sendMessage/tok"
        );
    }
}
