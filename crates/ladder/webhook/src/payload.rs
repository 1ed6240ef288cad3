//! Webhook payloads

use chrono::{DateTime, Utc};
use ladder_types::{Digest, GateResult, PromotionId, PromotionRecord, WebhookEvent};
use serde::{Deserialize, Serialize};

/// JSON body posted to webhook endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub event: WebhookEvent,
    pub promotion_id: PromotionId,
    pub tag: String,
    pub digest: Digest,
    pub from_env: String,
    pub to_env: String,
    pub operator: String,
    pub signature_verified: bool,
    pub gate_results: Vec<GateResult>,
    pub timestamp: DateTime<Utc>,
}

impl WebhookPayload {
    pub fn from_record(event: WebhookEvent, record: &PromotionRecord) -> Self {
        Self {
            event,
            promotion_id: record.promotion_id,
            tag: record.tag.clone(),
            digest: record.digest.clone(),
            from_env: record.from_env.clone(),
            to_env: record.to_env.clone(),
            operator: record.operator.clone(),
            signature_verified: record.signature_verified,
            gate_results: record.gate_results.clone(),
            timestamp: record.timestamp,
        }
    }
}
