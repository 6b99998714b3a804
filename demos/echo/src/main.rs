//! Echo Bot - Main Entry Point
//!
//! Minimal bot wired through the DingTalk webhook adapter: echoes every
//! received message back into the conversation.

use anyhow::Result;
use async_trait::async_trait;
use gong_adapter::{Adapter, Bot, Config, Event, EventHandler};
use tracing::{error, info};

/// Echoes each message back to its conversation.
struct Echo;

#[async_trait]
impl EventHandler for Echo {
    async fn handle(&self, bot: Bot, event: Event) {
        let text = event.plain_text().to_owned();
        if text.is_empty() {
            return;
        }
        match bot.send(&event, text.as_str()).await {
            Ok(_) => info!(corp_id = %bot.corp_id(), "Echoed message"),
            Err(e) => error!("Failed to echo message: {}", e),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gong_echo=debug,gong_adapter=debug,tower_http=debug".into()),
        )
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting echo bot");
    if config.has_default_webhook() {
        info!("Default custom-robot webhook configured, proactive sends enabled");
    }

    let adapter = Adapter::new(config.clone(), Echo)?;
    let app = adapter.router();

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(
        address = %config.bind_address,
        path = %config.webhook_route(),
        "Webhook endpoint listening"
    );

    // Graceful shutdown handler
    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
        info!("Received shutdown signal, cleaning up...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shutdown complete");

    Ok(())
}
