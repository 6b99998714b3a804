//! End-to-End Webhook Flow
//!
//! Exercises the full loop at the HTTP layer: a signed DingTalk callback
//! hits the adapter endpoint, the handler replies through the bot, and the
//! reply lands on a stub session-webhook server. Everything runs on
//! loopback.

use async_trait::async_trait;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use gong_adapter::{Adapter, Bot, Config, Event, EventHandler};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Stub for the platform's session-webhook endpoint: records each send
/// body and answers with a success envelope.
async fn stub_send(
    State(tx): State<mpsc::UnboundedSender<serde_json::Value>>,
    Json(body): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    tx.send(body).expect("test receiver alive");
    Json(json!({"errcode": 0, "errmsg": "ok"}))
}

async fn spawn_stub_platform() -> (String, mpsc::UnboundedReceiver<serde_json::Value>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let app = Router::new()
        .route("/robot/sendBySession", post(stub_send))
        .with_state(tx);
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
    let addr = listener.local_addr().expect("stub addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub serve");
    });
    (
        format!("http://{addr}/robot/sendBySession?session=s1"),
        rx,
    )
}

/// Replies to every message with its own text.
struct Echo;

#[async_trait]
impl EventHandler for Echo {
    async fn handle(&self, bot: Bot, event: Event) {
        let text = event.plain_text().to_owned();
        bot.send(&event, text.as_str()).await.expect("echo send");
    }
}

#[tokio::test]
async fn signed_callback_round_trips_to_the_session_webhook() {
    let (session_webhook, mut sent) = spawn_stub_platform().await;

    let adapter = Adapter::new(Config::default_for_test(), Echo).expect("adapter");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind adapter");
    let addr = listener.local_addr().expect("adapter addr");
    let router = adapter.router();
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("adapter serve");
    });

    let payload = json!({
        "conversationId": "cid1",
        "chatbotCorpId": "corp1",
        "chatbotUserId": "$:LWCP_v1:$bot000",
        "msgId": "msg1",
        "senderNick": "Alice",
        "sessionWebhookExpiredTime": i64::MAX,
        "createAt": 1_609_459_200_000_i64,
        "conversationType": "2",
        "senderId": "$:LWCP_v1:$snd222",
        "conversationTitle": "ops",
        "sessionWebhook": session_webhook,
        "text": {"content": " roll it back "},
        "msgtype": "text"
    });

    let timestamp = chrono::Utc::now().timestamp_millis().to_string();
    let sign = gong_adapter::signing::calc_signature(&timestamp, "this-is-a-secret");

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/ding"))
        .header("timestamp", timestamp)
        .header("sign", sign)
        .json(&payload)
        .send()
        .await
        .expect("callback request");
    assert_eq!(response.status().as_u16(), 204);

    let body = tokio::time::timeout(std::time::Duration::from_secs(5), sent.recv())
        .await
        .expect("reply within timeout")
        .expect("reply body");

    // Group reply: sender mentioned in text and in the at block.
    assert_eq!(body["msgtype"], "text");
    assert_eq!(body["text"]["content"], "@$:LWCP_v1:$snd222 roll it back");
    assert_eq!(body["at"]["atDingtalkIds"][0], "$:LWCP_v1:$snd222");
}
