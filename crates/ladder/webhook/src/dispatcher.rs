//! Webhook dispatchers

use crate::error::WebhookDeliveryError;
use crate::payload::WebhookPayload;
use async_trait::async_trait;
use ladder_types::{WebhookConfig, WebhookEvent};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Delivers lifecycle events to one webhook endpoint
///
/// Implementations never return an error to the caller: delivery problems
/// are retried and logged internally.
#[async_trait]
pub trait WebhookDispatcher: Send + Sync {
    async fn dispatch(&self, event: WebhookEvent, payload: &WebhookPayload, config: &WebhookConfig);
}

/// Dispatcher posting JSON payloads over HTTP
pub struct HttpWebhookDispatcher {
    client: Client,
    /// Delay before the first retry; grows linearly with each attempt
    backoff: Duration,
}

impl HttpWebhookDispatcher {
    pub fn new() -> Result<Self, WebhookDeliveryError> {
        let client = Client::builder()
            .user_agent(concat!("ladder-webhook/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| WebhookDeliveryError::Transport {
                url: String::new(),
                source,
            })?;

        Ok(Self {
            client,
            backoff: Duration::from_millis(500),
        })
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Deliver with retries, returning the number of attempts used
    pub async fn deliver(
        &self,
        payload: &WebhookPayload,
        config: &WebhookConfig,
    ) -> Result<u32, WebhookDeliveryError> {
        let headers = build_headers(config)?;
        let max_attempts = config.retry_count.saturating_add(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match self.send_once(payload, config, headers.clone()).await {
                Ok(()) => {
                    debug!(url = %config.url, attempt, "Webhook delivered");
                    return Ok(attempt);
                }
                Err(e) => {
                    warn!(
                        url = %config.url,
                        attempt,
                        max_attempts,
                        error = %e,
                        "Webhook delivery attempt failed"
                    );
                    last_error = e.to_string();
                    if attempt < max_attempts {
                        tokio::time::sleep(self.backoff * attempt).await;
                    }
                }
            }
        }

        Err(WebhookDeliveryError::Exhausted {
            url: config.url.clone(),
            attempts: max_attempts,
            last_error,
        })
    }

    async fn send_once(
        &self,
        payload: &WebhookPayload,
        config: &WebhookConfig,
        headers: HeaderMap,
    ) -> Result<(), WebhookDeliveryError> {
        let response = self
            .client
            .post(&config.url)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .headers(headers)
            .json(payload)
            .send()
            .await
            .map_err(|source| WebhookDeliveryError::Transport {
                url: config.url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(WebhookDeliveryError::Status {
                url: config.url.clone(),
                status: status.as_u16(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl WebhookDispatcher for HttpWebhookDispatcher {
    async fn dispatch(
        &self,
        event: WebhookEvent,
        payload: &WebhookPayload,
        config: &WebhookConfig,
    ) {
        if let Err(e) = self.deliver(payload, config).await {
            error!(
                target: "ladder::audit",
                event = "webhook_delivery_failed",
                webhook_event = %event,
                promotion_id = %payload.promotion_id,
                url = %config.url,
                error = %e,
                "Webhook delivery failed"
            );
        }
    }
}

fn build_headers(config: &WebhookConfig) -> Result<HeaderMap, WebhookDeliveryError> {
    let mut headers = HeaderMap::new();
    for (name, value) in &config.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            WebhookDeliveryError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            }
        })?;
        let header_value =
            HeaderValue::from_str(value).map_err(|e| WebhookDeliveryError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}
