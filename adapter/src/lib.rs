//! Gong DingTalk Adapter
//!
//! Bridges DingTalk's chatbot webhook callback API to a generic bot
//! event/handler model: inbound signature verification, payload-to-event
//! mapping, and the outbound robot send API.

pub mod adapter;
pub mod api;
pub mod bot;
pub mod config;
pub mod error;
pub mod event;
pub mod message;
pub mod signing;

pub use adapter::{Adapter, EventHandler};
pub use bot::{Bot, WebhookTarget};
pub use config::Config;
pub use error::AdapterError;
pub use event::{ConversationType, Event, GroupMessageEvent, MessageEvent};
pub use message::{Message, MessageSegment};
