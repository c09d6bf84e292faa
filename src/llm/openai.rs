//! OpenAI-compatible chat completions

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{ChatModel, ChatRequest, ContentPart, ResponseFormat};
use crate::{Error, Result};

/// Chat-completion client for any OpenAI-compatible endpoint
pub struct OpenAiChat {
    client: Client,
    base_url: String,
    api_key: SecretString,
}

impl OpenAiChat {
    /// Create a client for `base_url` (e.g. `https://api.openai.com/v1`)
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(base_url: &str, api_key: SecretString, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete(&self, request: ChatRequest) -> Result<String> {
        let body = WireRequest::from(&request);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Llm(format!("chat request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Llm(format!("chat API error: {status} - {body}")));
        }

        let result: WireResponse = response
            .json()
            .await
            .map_err(|e| Error::Llm(format!("failed to parse chat response: {e}")))?;

        let content = result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| Error::Llm("chat response had no content".to_string()))?;

        tracing::debug!(model = %request.model, chars = content.len(), "chat completion done");
        Ok(content)
    }
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<WireResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: WireContent<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum WireContent<'a> {
    Text(&'a str),
    Parts(Vec<WirePart<'a>>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WirePart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: WireImageUrl<'a> },
}

#[derive(Serialize)]
struct WireImageUrl<'a> {
    url: &'a str,
}

#[derive(Serialize)]
struct WireResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

impl<'a> From<&'a ChatRequest> for WireRequest<'a> {
    fn from(request: &'a ChatRequest) -> Self {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = &request.system {
            messages.push(WireMessage {
                role: "system",
                content: WireContent::Text(system),
            });
        }
        for message in &request.messages {
            let parts = message
                .parts
                .iter()
                .map(|p| match p {
                    ContentPart::Text(text) => WirePart::Text { text },
                    ContentPart::ImageUrl(url) => WirePart::ImageUrl {
                        image_url: WireImageUrl { url },
                    },
                })
                .collect();
            messages.push(WireMessage {
                role: message.role.as_str(),
                content: WireContent::Parts(parts),
            });
        }

        Self {
            model: &request.model,
            messages,
            response_format: match request.response_format {
                ResponseFormat::Text => None,
                ResponseFormat::JsonObject => Some(WireResponseFormat { kind: "json_object" }),
            },
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }
}

#[derive(Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(Deserialize)]
struct WireResponseMessage {
    content: Option<String>,
}
