//! Bot Handle
//!
//! One `Bot` per `chatbotCorpId`. Replies go over the event's session
//! webhook; proactive sends go to an explicitly configured custom-robot
//! webhook, signing the URL when the robot has a secret.

use std::sync::Arc;

use tracing::instrument;
use url::Url;

use crate::api::ApiClient;
use crate::error::AdapterError;
use crate::event::Event;
use crate::message::{Message, MessageSegment};
use crate::signing;

/// A custom-robot webhook destination.
#[derive(Debug, Clone)]
pub struct WebhookTarget {
    /// Webhook URL (carries the access token).
    pub url: String,
    /// Signing secret, when the robot has security set to "sign".
    pub secret: Option<String>,
}

#[derive(Debug)]
struct BotInner {
    corp_id: String,
    client: ApiClient,
    default_webhook: Option<WebhookTarget>,
}

/// Cheaply cloneable handle for sending messages as one bot.
#[derive(Debug, Clone)]
pub struct Bot {
    inner: Arc<BotInner>,
}

impl Bot {
    pub(crate) fn new(
        corp_id: impl Into<String>,
        client: ApiClient,
        default_webhook: Option<WebhookTarget>,
    ) -> Self {
        Self {
            inner: Arc::new(BotInner {
                corp_id: corp_id.into(),
                client,
                default_webhook,
            }),
        }
    }

    /// Corp ID this bot belongs to.
    pub fn corp_id(&self) -> &str {
        &self.inner.corp_id
    }

    /// Reply to an event over its session webhook.
    ///
    /// In group conversations the sender is @-mentioned; private
    /// conversations receive the message as-is. Fails with
    /// [`AdapterError::SessionExpired`] before any network I/O when the
    /// session webhook is past its expiry.
    #[instrument(skip(self, event, message), fields(corp_id = %self.inner.corp_id))]
    pub async fn send(
        &self,
        event: &Event,
        message: impl Into<Message>,
    ) -> Result<serde_json::Value, AdapterError> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        if event.is_session_expired(now_ms) {
            return Err(AdapterError::SessionExpired {
                expired_at: event.message().session_webhook_expired_time,
            });
        }

        let message = reply_message(event, message.into());
        let url = Url::parse(&event.message().session_webhook)?;
        self.inner.client.post_webhook(url, &message).await
    }

    /// Send to an explicit custom-robot webhook, signing the URL when the
    /// target has a secret.
    pub async fn send_to_webhook(
        &self,
        target: &WebhookTarget,
        message: impl Into<Message>,
    ) -> Result<serde_json::Value, AdapterError> {
        let url = match &target.secret {
            Some(secret) => {
                let now_ms = chrono::Utc::now().timestamp_millis();
                signing::signed_webhook_url(&target.url, secret, now_ms)?
            }
            None => Url::parse(&target.url)?,
        };
        self.inner.client.post_webhook(url, &message.into()).await
    }

    /// Send to the webhook configured as `DING_DEFAULT_WEBHOOK`.
    pub async fn send_to_default_webhook(
        &self,
        message: impl Into<Message>,
    ) -> Result<serde_json::Value, AdapterError> {
        let target = self
            .inner
            .default_webhook
            .as_ref()
            .ok_or(AdapterError::ApiNotAvailable)?;
        self.send_to_webhook(target, message).await
    }
}

/// Shape a reply for the event's conversation: group replies get an
/// `@{sender} ` text prefix and an at-segment for the sender.
fn reply_message(event: &Event, message: Message) -> Message {
    match event {
        Event::GroupMessage(group) => {
            let sender = group.message.sender_id.clone();
            let mut shaped = Message::from(format!("@{sender} "));
            shaped.extend(message);
            shaped.push(MessageSegment::at_dingtalk_ids([sender]));
            shaped
        }
        Event::PrivateMessage(_) => message,
    }
}
