//! Event Model
//!
//! Typed mapping of DingTalk chatbot callback payloads. Private and group
//! conversations share a common message body; group conversations add a
//! title and the at-list flag. Dispatch is on the string-encoded
//! `conversationType` field.

use serde::Deserialize;

use crate::error::AdapterError;

/// Conversation scene, string-encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum ConversationType {
    /// One-on-one chat with the bot.
    #[serde(rename = "1")]
    Private,
    /// Group chat the bot was @-mentioned in.
    #[serde(rename = "2")]
    Group,
}

/// A user mentioned alongside the bot.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtUser {
    /// Opaque per-app DingTalk user ID.
    pub dingtalk_id: String,
    /// Enterprise staff ID, present for internal-org members only.
    #[serde(default)]
    pub staff_id: Option<String>,
}

/// The `text` body of a callback message.
#[derive(Debug, Clone, Deserialize)]
pub struct TextContent {
    /// Raw message text, including the surrounding whitespace DingTalk
    /// leaves around a stripped @-mention.
    pub content: String,
}

/// Fields common to private and group message callbacks.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEvent {
    /// Message type reported by the platform (currently always `"text"`).
    pub msgtype: String,
    /// Unique message ID.
    pub msg_id: String,
    /// Message creation time in epoch milliseconds.
    pub create_at: i64,
    /// Conversation ID.
    pub conversation_id: String,
    /// Conversation scene.
    pub conversation_type: ConversationType,
    /// Sender's opaque DingTalk ID.
    pub sender_id: String,
    /// Sender's display name.
    pub sender_nick: String,
    /// Sender's corp ID, present for internal-org senders only.
    #[serde(default)]
    pub sender_corp_id: Option<String>,
    /// Sender's enterprise staff ID, present for internal-org senders only.
    #[serde(default)]
    pub sender_staff_id: Option<String>,
    /// Temporary webhook for replying within this session.
    pub session_webhook: String,
    /// Session webhook expiry in epoch milliseconds (~1.5h after delivery).
    pub session_webhook_expired_time: i64,
    /// The bot's own user ID.
    pub chatbot_user_id: String,
    /// Corp ID the bot belongs to; used as the bot registry key.
    pub chatbot_corp_id: String,
    /// Whether the sender is a conversation admin.
    #[serde(default)]
    pub is_admin: bool,
    /// Users @-mentioned together with the bot.
    #[serde(default)]
    pub at_users: Vec<AtUser>,
    /// Message text body.
    pub text: TextContent,
}

/// A message received in a group conversation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMessageEvent {
    /// Common message fields.
    #[serde(flatten)]
    pub message: MessageEvent,
    /// Group title.
    pub conversation_title: String,
    /// Whether the bot was in the message's at-list.
    #[serde(default)]
    pub is_in_at_list: bool,
}

/// A callback event delivered to the webhook endpoint.
#[derive(Debug, Clone)]
pub enum Event {
    /// Message from a one-on-one chat.
    PrivateMessage(MessageEvent),
    /// Message from a group chat.
    GroupMessage(GroupMessageEvent),
}

impl Event {
    /// Map a raw callback payload to an event, dispatching on
    /// `conversationType`.
    pub fn from_payload(payload: &serde_json::Value) -> Result<Self, AdapterError> {
        match payload.get("conversationType").and_then(|v| v.as_str()) {
            Some("1") => Ok(Self::PrivateMessage(serde_json::from_value(
                payload.clone(),
            )?)),
            Some("2") => Ok(Self::GroupMessage(serde_json::from_value(payload.clone())?)),
            other => Err(AdapterError::UnsupportedConversationType(
                other.map(str::to_owned),
            )),
        }
    }

    /// The common message body.
    pub const fn message(&self) -> &MessageEvent {
        match self {
            Self::PrivateMessage(message) => message,
            Self::GroupMessage(group) => &group.message,
        }
    }

    /// Conversation scene of this event.
    pub const fn conversation_type(&self) -> ConversationType {
        self.message().conversation_type
    }

    /// Message text with the whitespace left by the stripped @-mention
    /// removed.
    pub fn plain_text(&self) -> &str {
        self.message().text.content.trim()
    }

    /// Whether the session webhook has expired as of `now_ms`.
    pub const fn is_session_expired(&self, now_ms: i64) -> bool {
        now_ms > self.message().session_webhook_expired_time
    }
}
