//! Audit entries
//!
//! A persisted promotion record plus its position in the hash chain.

use chrono::{DateTime, Utc};
use ladder_types::PromotionRecord;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A promotion record sealed into the audit chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Position in the chain, starting at zero
    pub sequence: u64,

    /// When the store accepted the record
    pub recorded_at: DateTime<Utc>,

    pub record: PromotionRecord,

    /// Hash of the previous entry
    pub previous_hash: Option<String>,

    /// Hash of this entry
    pub entry_hash: String,
}

impl AuditEntry {
    /// Seal a record onto the end of a chain
    pub fn seal(record: PromotionRecord, sequence: u64, previous_hash: Option<String>) -> Self {
        let recorded_at = Utc::now();
        let entry_hash = compute_hash(sequence, &recorded_at, &record, previous_hash.as_deref());

        Self {
            sequence,
            recorded_at,
            record,
            previous_hash,
            entry_hash,
        }
    }

    /// Recompute this entry's hash from its contents
    pub fn computed_hash(&self) -> String {
        compute_hash(
            self.sequence,
            &self.recorded_at,
            &self.record,
            self.previous_hash.as_deref(),
        )
    }
}

fn compute_hash(
    sequence: u64,
    recorded_at: &DateTime<Utc>,
    record: &PromotionRecord,
    previous_hash: Option<&str>,
) -> String {
    let hash_input = format!(
        "{}{}{}{}",
        sequence,
        recorded_at.to_rfc3339(),
        serde_json::to_string(record).unwrap_or_default(),
        previous_hash.unwrap_or("")
    );

    let mut hasher = Sha256::new();
    hasher.update(hash_input.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ladder_types::{Digest as ArtifactDigest, PromotionId, VerificationResult};

    pub(crate) fn record(tag: &str, from: &str, to: &str, operator: &str) -> PromotionRecord {
        PromotionRecord {
            promotion_id: PromotionId::generate(),
            tag: tag.into(),
            digest: ArtifactDigest::new("sha256:1111"),
            from_env: from.into(),
            to_env: to.into(),
            operator: operator.into(),
            dry_run: false,
            gate_results: Vec::new(),
            signature_verified: true,
            verification: VerificationResult::valid("ci", None),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_seal_links_previous_hash() {
        let first = AuditEntry::seal(record("v1", "dev", "staging", "alice"), 0, None);
        let second = AuditEntry::seal(
            record("v1", "staging", "prod", "bob"),
            1,
            Some(first.entry_hash.clone()),
        );

        assert_eq!(second.previous_hash.as_deref(), Some(first.entry_hash.as_str()));
        assert_eq!(first.computed_hash(), first.entry_hash);
    }

    #[test]
    fn test_edit_changes_hash() {
        let mut entry = AuditEntry::seal(record("v1", "dev", "staging", "alice"), 0, None);
        entry.record.operator = "mallory".into();
        assert_ne!(entry.computed_hash(), entry.entry_hash);
    }
}
