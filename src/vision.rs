//! Image analysis adapter
//!
//! Screenshots of hands, tournament result screens and photos of the table
//! all go through one fixed prompt; the model decides which kind of answer
//! fits. The answer is sent to the user as-is.

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::error::with_deadline;
use crate::llm::{ChatMessage, ChatModel, ChatRequest, ContentPart, Role};
use crate::media::{MediaFetcher, MediaKind};
use crate::replies;

const SYSTEM_PROMPT: &str = "You are an experienced poker coach helping a player over WhatsApp. \
The user sent an image. Decide what it shows and answer accordingly:
- A hand history or a table screenshot: analyze the spot, the key decision and what you would do.
- A tournament or session result screen: extract the buy-in, prize, finishing position and profit.
- Anything else poker related: give short, useful commentary.
If the image is not poker related, say so briefly.
Always answer in Hebrew, in plain text suitable for WhatsApp, at most about 15 lines.";

/// Sends images to a vision-capable model
#[derive(Clone)]
pub struct VisionAdapter {
    model: Arc<dyn ChatModel>,
    fetcher: Arc<dyn MediaFetcher>,
    model_name: String,
    timeout: Duration,
    inline_images: bool,
}

impl VisionAdapter {
    /// Create a vision adapter
    ///
    /// With `inline_images`, the image is downloaded first and passed as a
    /// `data:` URL, for providers that cannot reach the transport's media host.
    #[must_use]
    pub fn new(
        model: Arc<dyn ChatModel>,
        fetcher: Arc<dyn MediaFetcher>,
        model_name: impl Into<String>,
        timeout: Duration,
        inline_images: bool,
    ) -> Self {
        Self {
            model,
            fetcher,
            model_name: model_name.into(),
            timeout,
            inline_images,
        }
    }

    /// Analyze an image, returning the reply text
    ///
    /// Never fails: download problems yield the attachment apology and model
    /// problems the vision apology.
    pub async fn analyze(
        &self,
        image: &Url,
        caption: Option<&str>,
        mime_type: Option<&str>,
    ) -> String {
        let image_url = if self.inline_images {
            match self.fetcher.fetch(image, MediaKind::Image, mime_type).await {
                Ok(payload) => payload.to_data_url(),
                Err(e) => {
                    tracing::warn!(error = %e, "image download failed");
                    return replies::ATTACHMENT_FAILED.to_string();
                }
            }
        } else {
            image.to_string()
        };

        let mut parts = Vec::with_capacity(2);
        if let Some(caption) = caption.map(str::trim).filter(|c| !c.is_empty()) {
            parts.push(ContentPart::Text(format!("The user wrote with the image: {caption}")));
        }
        parts.push(ContentPart::ImageUrl(image_url));

        let request = ChatRequest::new(&self.model_name)
            .system(SYSTEM_PROMPT)
            .message(ChatMessage {
                role: Role::User,
                parts,
            })
            .max_tokens(800);

        match with_deadline(self.timeout, "vision", self.model.complete(request)).await {
            Ok(analysis) => analysis.trim().to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "vision analysis failed");
                replies::VISION_FAILED.to_string()
            }
        }
    }
}
