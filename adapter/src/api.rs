//! Outbound API Client
//!
//! Posts produced message bodies to robot webhook URLs and maps the
//! platform's `errcode`/`errmsg` envelope onto adapter errors.

use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::error::AdapterError;
use crate::message::Message;

/// HTTP client for the robot send API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
}

impl ApiClient {
    /// Build a client with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self, AdapterError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    /// POST a message to a webhook URL and return the platform's response
    /// envelope.
    pub async fn post_webhook(
        &self,
        url: Url,
        message: &Message,
    ) -> Result<serde_json::Value, AdapterError> {
        let body = message.produce();
        // The URL query carries the access token and signature, so log the
        // path only.
        debug!(host = %url.host_str().unwrap_or("-"), path = %url.path(), "Calling robot send API");

        let response = self.http.post(url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::UnexpectedStatus(status.as_u16()));
        }

        let envelope: serde_json::Value = response.json().await?;
        parse_api_result(envelope)
    }
}

/// Interpret the `errcode`/`errmsg` envelope: zero is success, anything
/// else (including a missing errcode) is a failed action.
pub(crate) fn parse_api_result(
    envelope: serde_json::Value,
) -> Result<serde_json::Value, AdapterError> {
    let errcode = envelope
        .get("errcode")
        .and_then(serde_json::Value::as_i64)
        .unwrap_or(-1);
    if errcode == 0 {
        return Ok(envelope);
    }
    let errmsg = envelope
        .get("errmsg")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_owned();
    Err(AdapterError::ActionFailed { errcode, errmsg })
}
