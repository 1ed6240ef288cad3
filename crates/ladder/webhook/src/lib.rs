//! Ladder Webhooks
//!
//! Fires configured HTTP callbacks on promotion lifecycle events.
//! Delivery is best-effort: failures are retried per
//! [`WebhookConfig`](ladder_types::WebhookConfig), then logged and
//! swallowed. Nothing in this crate ever fails a promotion.

#![deny(unsafe_code)]

pub mod dispatcher;
pub mod error;
pub mod notifier;
pub mod payload;

pub use dispatcher::{HttpWebhookDispatcher, WebhookDispatcher};
pub use error::WebhookDeliveryError;
pub use notifier::WebhookNotifier;
pub use payload::WebhookPayload;
