//! Webhook configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Promotion lifecycle events a webhook can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEvent {
    /// A real promotion completed
    Promote,

    /// A real promotion was rejected by a required gate
    GateFailed,
}

impl fmt::Display for WebhookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Promote => f.write_str("promote"),
            Self::GateFailed => f.write_str("gate_failed"),
        }
    }
}

/// An HTTP callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,

    /// Subscribed events
    #[serde(default = "default_events")]
    pub events: Vec<WebhookEvent>,

    /// Per-attempt timeout
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Extra attempts after the first failure
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Headers attached to every delivery
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            events: default_events(),
            timeout_seconds: default_timeout_seconds(),
            retry_count: default_retry_count(),
            headers: BTreeMap::new(),
        }
    }

    pub fn with_events(mut self, events: Vec<WebhookEvent>) -> Self {
        self.events = events;
        self
    }

    pub fn with_retries(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn subscribes_to(&self, event: WebhookEvent) -> bool {
        self.events.contains(&event)
    }
}

fn default_events() -> Vec<WebhookEvent> {
    vec![WebhookEvent::Promote]
}

fn default_timeout_seconds() -> u64 {
    10
}

fn default_retry_count() -> u32 {
    3
}
