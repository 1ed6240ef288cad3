//! Webhook delivery errors

use thiserror::Error;

/// A webhook could not be delivered
///
/// Never surfaces past the dispatcher: callers only see it in logs.
#[derive(Debug, Error)]
pub enum WebhookDeliveryError {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Endpoint {url} responded with status {status}")]
    Status { url: String, status: u16 },

    #[error("Invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("Gave up on {url} after {attempts} attempts: {last_error}")]
    Exhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },
}
