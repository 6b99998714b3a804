//! Adapter Errors

use thiserror::Error;

/// Errors raised by the adapter library.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The platform accepted the request but reported a business error.
    #[error("DingTalk API call failed: errcode={errcode}, errmsg={errmsg}")]
    ActionFailed {
        /// Platform error code (nonzero).
        errcode: i64,
        /// Platform error message.
        errmsg: String,
    },

    /// Transport-level HTTP failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The platform answered with a non-2xx status.
    #[error("HTTP request received unexpected status code: {0}")]
    UnexpectedStatus(u16),

    /// The event's session webhook has already expired.
    #[error("Session webhook expired at {expired_at} (epoch ms)")]
    SessionExpired {
        /// Expiry instant in epoch milliseconds.
        expired_at: i64,
    },

    /// No webhook is available for this send (no event session webhook
    /// and no configured default webhook).
    #[error("No webhook available for this API call")]
    ApiNotAvailable,

    /// A webhook URL could not be parsed.
    #[error("Invalid webhook URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// An inbound payload could not be mapped to an event.
    #[error("Event parse error: {0}")]
    EventParse(#[from] serde_json::Error),

    /// The payload carried a `conversationType` we do not handle.
    #[error("Unsupported conversation type: {0:?}")]
    UnsupportedConversationType(Option<String>),
}
