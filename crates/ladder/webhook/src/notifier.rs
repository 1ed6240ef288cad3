//! Fan-out of lifecycle events to subscribed webhooks

use crate::dispatcher::WebhookDispatcher;
use crate::payload::WebhookPayload;
use ladder_types::{PromotionRecord, WebhookConfig, WebhookEvent};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Sends each event to every webhook subscribed to it
pub struct WebhookNotifier {
    dispatcher: Arc<dyn WebhookDispatcher>,
    webhooks: Arc<[WebhookConfig]>,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl WebhookNotifier {
    pub fn new(dispatcher: Arc<dyn WebhookDispatcher>, webhooks: Vec<WebhookConfig>) -> Self {
        Self {
            dispatcher,
            webhooks: webhooks.into(),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Number of webhooks subscribed to an event
    pub fn subscriber_count(&self, event: WebhookEvent) -> usize {
        self.webhooks
            .iter()
            .filter(|w| w.subscribes_to(event))
            .count()
    }

    /// Notify subscribers of an event about a promotion record
    pub async fn notify(&self, event: WebhookEvent, record: &PromotionRecord) {
        deliver(self.dispatcher.as_ref(), &self.webhooks, event, record).await;
    }

    /// Deliver in a background task and return immediately
    ///
    /// Must be called from within a tokio runtime. [`flush`](Self::flush)
    /// waits for every delivery started this way.
    pub fn notify_detached(&self, event: WebhookEvent, record: &PromotionRecord) {
        if self.subscriber_count(event) == 0 {
            return;
        }

        let dispatcher = self.dispatcher.clone();
        let webhooks = self.webhooks.clone();
        let record = record.clone();
        let handle = tokio::spawn(async move {
            deliver(dispatcher.as_ref(), &webhooks, event, &record).await;
        });

        let mut pending = self.pending.lock();
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    /// Wait for all background deliveries to finish
    pub async fn flush(&self) {
        let handles = std::mem::take(&mut *self.pending.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Webhook delivery task aborted");
            }
        }
    }

    /// Background deliveries not yet finished
    pub fn in_flight(&self) -> usize {
        self.pending.lock().iter().filter(|h| !h.is_finished()).count()
    }
}

async fn deliver(
    dispatcher: &dyn WebhookDispatcher,
    webhooks: &[WebhookConfig],
    event: WebhookEvent,
    record: &PromotionRecord,
) {
    let payload = WebhookPayload::from_record(event, record);

    for webhook in webhooks.iter().filter(|w| w.subscribes_to(event)) {
        debug!(
            webhook_event = %event,
            url = %webhook.url,
            promotion_id = %record.promotion_id,
            "Dispatching webhook"
        );
        dispatcher.dispatch(event, &payload, webhook).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use ladder_types::{Digest, PromotionId, VerificationResult};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingDispatcher {
        calls: Mutex<Vec<(WebhookEvent, String)>>,
    }

    #[async_trait]
    impl WebhookDispatcher for RecordingDispatcher {
        async fn dispatch(
            &self,
            event: WebhookEvent,
            _payload: &WebhookPayload,
            config: &WebhookConfig,
        ) {
            self.calls.lock().push((event, config.url.clone()));
        }
    }

    fn record() -> PromotionRecord {
        PromotionRecord {
            promotion_id: PromotionId::generate(),
            tag: "v1.0.0".into(),
            digest: Digest::new("sha256:aa"),
            from_env: "dev".into(),
            to_env: "staging".into(),
            operator: "alice".into(),
            dry_run: false,
            gate_results: Vec::new(),
            signature_verified: false,
            verification: VerificationResult::unsigned("none"),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_only_subscribers_notified() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let notifier = WebhookNotifier::new(
            dispatcher.clone(),
            vec![
                WebhookConfig::new("https://a.example/hook"),
                WebhookConfig::new("https://b.example/hook")
                    .with_events(vec![WebhookEvent::GateFailed]),
            ],
        );

        notifier.notify(WebhookEvent::Promote, &record()).await;
        notifier.notify(WebhookEvent::GateFailed, &record()).await;

        let calls = dispatcher.calls.lock();
        assert_eq!(
            *calls,
            vec![
                (WebhookEvent::Promote, "https://a.example/hook".to_string()),
                (WebhookEvent::GateFailed, "https://b.example/hook".to_string()),
            ]
        );
        assert_eq!(notifier.subscriber_count(WebhookEvent::Promote), 1);
    }

    struct GatedDispatcher {
        release: tokio::sync::Notify,
        delivered: Mutex<usize>,
    }

    #[async_trait]
    impl WebhookDispatcher for GatedDispatcher {
        async fn dispatch(&self, _: WebhookEvent, _: &WebhookPayload, _: &WebhookConfig) {
            self.release.notified().await;
            *self.delivered.lock() += 1;
        }
    }

    #[tokio::test]
    async fn test_detached_delivery_does_not_block_caller() {
        let dispatcher = Arc::new(GatedDispatcher {
            release: tokio::sync::Notify::new(),
            delivered: Mutex::new(0),
        });
        let notifier = WebhookNotifier::new(
            dispatcher.clone(),
            vec![WebhookConfig::new("https://a.example/hook")],
        );

        notifier.notify_detached(WebhookEvent::Promote, &record());
        assert_eq!(*dispatcher.delivered.lock(), 0);
        assert_eq!(notifier.in_flight(), 1);

        dispatcher.release.notify_one();
        notifier.flush().await;

        assert_eq!(*dispatcher.delivered.lock(), 1);
        assert_eq!(notifier.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_detached_without_subscribers_spawns_nothing() {
        let notifier = WebhookNotifier::new(
            Arc::new(RecordingDispatcher::default()),
            vec![WebhookConfig::new("https://a.example/hook")
                .with_events(vec![WebhookEvent::GateFailed])],
        );

        notifier.notify_detached(WebhookEvent::Promote, &record());
        assert_eq!(notifier.in_flight(), 0);
    }
}
