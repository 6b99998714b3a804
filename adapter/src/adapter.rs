//! Webhook Receiver & Dispatch
//!
//! Serves the DingTalk callback endpoint: verify the `timestamp`/`sign`
//! headers, map the payload to an event, look up or register the `Bot` for
//! the corp, and hand `(bot, event)` to the registered handler on a
//! spawned task.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use dashmap::DashMap;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::api::ApiClient;
use crate::bot::{Bot, WebhookTarget};
use crate::config::Config;
use crate::error::AdapterError;
use crate::event::Event;
use crate::signing;

/// Handler seam for the hosting bot: receives every successfully parsed
/// event together with the bot it was addressed to.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// Handle one event. Runs on its own task; slow handlers do not block
    /// the webhook endpoint.
    async fn handle(&self, bot: Bot, event: Event);
}

struct AdapterInner {
    config: Config,
    client: ApiClient,
    bots: DashMap<String, Bot>,
    handler: Arc<dyn EventHandler>,
}

/// The DingTalk webhook adapter.
#[derive(Clone)]
pub struct Adapter {
    inner: Arc<AdapterInner>,
}

impl Adapter {
    /// Build an adapter from configuration and an event handler.
    pub fn new(config: Config, handler: impl EventHandler) -> Result<Self, AdapterError> {
        let client = ApiClient::new(Duration::from_secs(config.api_timeout_secs))?;
        Ok(Self {
            inner: Arc::new(AdapterInner {
                config,
                client,
                bots: DashMap::new(),
                handler: Arc::new(handler),
            }),
        })
    }

    /// Build the axum router serving the webhook endpoint.
    pub fn router(&self) -> Router {
        Router::new()
            .route(&self.inner.config.webhook_route(), post(handle_webhook))
            .layer(TraceLayer::new_for_http())
            .with_state(self.clone())
    }

    /// Look up the bot registered for a corp ID.
    pub fn get_bot(&self, corp_id: &str) -> Option<Bot> {
        self.inner.bots.get(corp_id).map(|bot| bot.clone())
    }

    /// Look up or register the bot for a corp ID.
    fn bot(&self, corp_id: &str) -> Bot {
        self.inner
            .bots
            .entry(corp_id.to_owned())
            .or_insert_with(|| {
                info!(corp_id = %corp_id, "Bot connected");
                Bot::new(corp_id, self.inner.client.clone(), self.default_target())
            })
            .clone()
    }

    fn default_target(&self) -> Option<WebhookTarget> {
        self.inner
            .config
            .default_webhook
            .as_ref()
            .map(|url| WebhookTarget {
                url: url.clone(),
                secret: self.inner.config.default_webhook_secret.clone(),
            })
    }

    /// Verify the `timestamp`/`sign` headers of an inbound request.
    fn check_signature(&self, headers: &HeaderMap) -> bool {
        let timestamp = headers.get("timestamp").and_then(|v| v.to_str().ok());
        let sign = headers.get("sign").and_then(|v| v.to_str().ok());
        let (Some(timestamp), Some(sign)) = (timestamp, sign) else {
            warn!("Missing timestamp/sign headers");
            return false;
        };

        if !signing::verify_signature(timestamp, sign, &self.inner.config.app_secret) {
            warn!("Signature header is invalid");
            return false;
        }

        let Ok(timestamp_ms) = timestamp.parse::<i64>() else {
            warn!("Timestamp header is not a millisecond epoch");
            return false;
        };
        let now_ms = chrono::Utc::now().timestamp_millis();
        if !signing::timestamp_in_window(timestamp_ms, now_ms, self.inner.config.sign_window_secs) {
            warn!(timestamp_ms, "Timestamp outside the allowed window");
            return false;
        }

        true
    }
}

/// POST `{webhook_path}` - the DingTalk callback endpoint.
async fn handle_webhook(
    State(adapter): State<Adapter>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if !adapter.check_signature(&headers) {
        return StatusCode::UNAUTHORIZED;
    }

    if body.is_empty() {
        return StatusCode::BAD_REQUEST;
    }
    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Invalid request body: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };

    let Some(corp_id) = payload.get("chatbotCorpId").and_then(|v| v.as_str()) else {
        warn!("Payload missing chatbotCorpId");
        return StatusCode::BAD_REQUEST;
    };
    let bot = adapter.bot(corp_id);

    match Event::from_payload(&payload) {
        Ok(event) => {
            let handler = adapter.inner.handler.clone();
            tokio::spawn(async move {
                handler.handle(bot, event).await;
            });
        }
        // Acknowledge anyway so the platform does not retry a poison
        // payload.
        Err(e) => error!(error = %e, "Event parse error"),
    }

    StatusCode::NO_CONTENT
}
