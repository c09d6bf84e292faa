//! Reply dispatch
//!
//! Sends the final reply of each event through the channel. With the default
//! [`RetryPolicy`] a send is attempted once (at-most-once delivery); failures
//! are logged and reported as `false`.

use std::sync::Arc;

use crate::channels::retry::{delay_for_attempt, is_recoverable};
use crate::channels::{Channel, OutgoingMessage, RetryPolicy};
use crate::{Error, identity};

/// Delivers replies through a channel
#[derive(Clone)]
pub struct ReplyDispatcher {
    channel: Arc<dyn Channel>,
    policy: RetryPolicy,
    country_code: String,
}

impl ReplyDispatcher {
    #[must_use]
    pub fn new(
        channel: Arc<dyn Channel>,
        policy: RetryPolicy,
        country_code: impl Into<String>,
    ) -> Self {
        Self {
            channel,
            policy,
            country_code: country_code.into(),
        }
    }

    /// Send `text` to `recipient`, returning whether the provider accepted it
    pub async fn send(&self, recipient: &str, text: &str) -> bool {
        let Some(chat_id) = identity::chat_id(recipient, &self.country_code) else {
            tracing::error!(recipient, "cannot derive chat id for recipient");
            return false;
        };
        let message = OutgoingMessage::text(chat_id, text);

        let mut attempt = 0;
        loop {
            match self.channel.send(&message).await {
                Ok(message_id) => {
                    tracing::debug!(
                        channel = self.channel.name(),
                        recipient = %message.recipient,
                        message_id = %message_id,
                        "reply sent"
                    );
                    return true;
                }
                Err(e) => {
                    let status = match &e {
                        Error::Delivery { status, .. } => *status,
                        _ => None,
                    };
                    if attempt < self.policy.max_retries && is_recoverable(status) {
                        let delay = delay_for_attempt(&self.policy, attempt);
                        tracing::warn!(
                            recipient = %message.recipient,
                            attempt = attempt + 1,
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            error = %e,
                            "reply send failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    tracing::error!(
                        channel = self.channel.name(),
                        recipient = %message.recipient,
                        error = %e,
                        "reply send failed"
                    );
                    return false;
                }
            }
        }
    }
}
