//! Audit query support

use crate::entry::AuditEntry;
use ladder_types::{Digest, PromotionRecord};

/// Query over promotion history
///
/// Results are always ordered most recent first.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    /// Filter by tag
    pub tag: Option<String>,

    /// Filter by artifact digest
    pub digest: Option<Digest>,

    /// Filter by target environment
    pub environment: Option<String>,

    /// Filter by operator
    pub operator: Option<String>,

    /// Maximum number of results
    pub limit: Option<usize>,
}

impl AuditQuery {
    pub fn builder() -> AuditQueryBuilder {
        AuditQueryBuilder::default()
    }

    pub fn matches(&self, record: &PromotionRecord) -> bool {
        if let Some(ref tag) = self.tag {
            if &record.tag != tag {
                return false;
            }
        }

        if let Some(ref digest) = self.digest {
            if &record.digest != digest {
                return false;
            }
        }

        if let Some(ref environment) = self.environment {
            if &record.to_env != environment {
                return false;
            }
        }

        if let Some(ref operator) = self.operator {
            if &record.operator != operator {
                return false;
            }
        }

        true
    }

    /// Apply the query to a chain of entries
    pub fn apply(&self, entries: &[AuditEntry]) -> Vec<PromotionRecord> {
        let mut results: Vec<&AuditEntry> =
            entries.iter().filter(|e| self.matches(&e.record)).collect();

        // Newest first; insertion order breaks timestamp ties
        results.sort_by(|a, b| {
            b.record
                .timestamp
                .cmp(&a.record.timestamp)
                .then(b.sequence.cmp(&a.sequence))
        });

        if let Some(limit) = self.limit {
            results.truncate(limit);
        }

        results.into_iter().map(|e| e.record.clone()).collect()
    }
}

/// Builder for audit queries
#[derive(Debug, Default)]
pub struct AuditQueryBuilder {
    query: AuditQuery,
}

impl AuditQueryBuilder {
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.query.tag = Some(tag.into());
        self
    }

    pub fn digest(mut self, digest: Digest) -> Self {
        self.query.digest = Some(digest);
        self
    }

    /// Filter by target environment
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.query.environment = Some(environment.into());
        self
    }

    pub fn operator(mut self, operator: impl Into<String>) -> Self {
        self.query.operator = Some(operator.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    pub fn build(self) -> AuditQuery {
        self.query
    }
}
