//! Adapter Configuration
//!
//! Loads configuration from environment variables.

use anyhow::{Context, Result};
use std::env;
use tracing::warn;

/// Adapter configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:8080")
    pub bind_address: String,

    /// URL path the webhook endpoint is served on (default: "/ding");
    /// a missing leading slash is normalized by [`Config::webhook_route`]
    pub webhook_path: String,

    /// App secret used to verify inbound callback signatures
    pub app_secret: String,

    /// Outbound API request timeout in seconds (default: 30)
    pub api_timeout_secs: u64,

    /// Allowed clock drift for inbound timestamps in seconds
    /// (default: 3600 = 1 hour, the platform's own window)
    pub sign_window_secs: u64,

    /// Custom-robot webhook for proactive sends (optional)
    pub default_webhook: Option<String>,

    /// Signing secret for the custom-robot webhook (optional)
    pub default_webhook_secret: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            webhook_path: env::var("DING_WEBHOOK_PATH").unwrap_or_else(|_| "/ding".into()),
            app_secret: env::var("DING_APP_SECRET").context("DING_APP_SECRET must be set")?,
            api_timeout_secs: env_u64("DING_API_TIMEOUT_SECS", 30),
            sign_window_secs: env_u64("DING_SIGN_WINDOW_SECS", 3600), // 1 hour
            default_webhook: env::var("DING_DEFAULT_WEBHOOK").ok(),
            default_webhook_secret: env::var("DING_DEFAULT_WEBHOOK_SECRET").ok(),
        })
    }

    /// Check if a default custom-robot webhook is configured.
    #[must_use]
    pub const fn has_default_webhook(&self) -> bool {
        self.default_webhook.is_some()
    }

    /// Webhook path with the leading slash the router requires.
    #[must_use]
    pub fn webhook_route(&self) -> String {
        if self.webhook_path.starts_with('/') {
            self.webhook_path.clone()
        } else {
            format!("/{}", self.webhook_path)
        }
    }

    /// Create a default configuration for testing.
    #[must_use]
    pub fn default_for_test() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".into(),
            webhook_path: "/ding".into(),
            app_secret: "this-is-a-secret".into(),
            api_timeout_secs: 30,
            sign_window_secs: 3600,
            default_webhook: None,
            default_webhook_secret: None,
        }
    }
}

/// Read an env var as u64, warning when a value is present but malformed.
fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name).map_or(default, |raw| parse_u64(name, &raw, default))
}

fn parse_u64(name: &str, raw: &str, default: u64) -> u64 {
    raw.parse().unwrap_or_else(|_| {
        warn!("Invalid {} value {:?}, using default {}", name, raw, default);
        default
    })
}
