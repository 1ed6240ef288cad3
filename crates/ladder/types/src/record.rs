//! Promotion records and status views

use crate::{Digest, GateResult, PromotionId, VerificationResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The auditable record of one promotion attempt
///
/// Persisted only when `dry_run` is false. A dry-run record is returned to
/// the caller and then discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionRecord {
    /// Fresh identifier per attempt
    pub promotion_id: PromotionId,

    /// Tag that was promoted
    pub tag: String,

    /// Digest the tag resolved to
    pub digest: Digest,

    pub from_env: String,
    pub to_env: String,

    /// Operator name
    pub operator: String,

    pub dry_run: bool,

    /// Every gate that ran, in configuration order
    pub gate_results: Vec<GateResult>,

    /// True only when the signature verified as valid
    pub signature_verified: bool,

    /// Full verification outcome
    pub verification: VerificationResult,

    pub timestamp: DateTime<Utc>,
}

impl PromotionRecord {
    /// Gates whose failure blocks a real promotion
    pub fn blocking_failures(&self) -> impl Iterator<Item = &GateResult> {
        self.gate_results.iter().filter(|g| g.is_blocking())
    }

    pub fn has_blocking_failures(&self) -> bool {
        self.blocking_failures().next().is_some()
    }
}

/// One entry in a tag's promotion history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionHistoryEntry {
    pub promotion_id: PromotionId,
    pub artifact_digest: Digest,
    pub source_environment: String,
    pub target_environment: String,
    pub operator: String,
    pub promoted_at: DateTime<Utc>,
}

impl From<&PromotionRecord> for PromotionHistoryEntry {
    fn from(record: &PromotionRecord) -> Self {
        Self {
            promotion_id: record.promotion_id,
            artifact_digest: record.digest.clone(),
            source_environment: record.from_env.clone(),
            target_environment: record.to_env.clone(),
            operator: record.operator.clone(),
            promoted_at: record.timestamp,
        }
    }
}

/// Promotion state of a tag within one environment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentStatus {
    /// The tag's current digest has been promoted into the environment
    pub promoted: bool,

    pub promoted_at: Option<DateTime<Utc>>,

    /// The environment's latest pointer references the tag's digest
    pub is_latest: bool,

    pub operator: Option<String>,
}

/// Where a tag currently sits in the promotion chain
///
/// Assembled on demand from the audit store; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionStatusResponse {
    pub tag: String,
    pub digest: Digest,
    pub environments: BTreeMap<String, EnvironmentStatus>,

    /// Most recent first
    pub history: Vec<PromotionHistoryEntry>,

    pub queried_at: DateTime<Utc>,
}
