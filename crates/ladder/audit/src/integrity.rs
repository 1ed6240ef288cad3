//! Integrity verification for the audit chain

use crate::entry::AuditEntry;

/// Running state of the hash chain
#[derive(Debug, Default)]
pub struct IntegrityChain {
    /// Hash of the last entry in the chain
    last_hash: Option<String>,

    /// Total number of entries
    entry_count: u64,
}

impl IntegrityChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from persisted state
    pub fn from_state(last_hash: Option<String>, entry_count: u64) -> Self {
        Self {
            last_hash,
            entry_count,
        }
    }

    /// Previous hash for the next entry
    pub fn previous_hash(&self) -> Option<String> {
        self.last_hash.clone()
    }

    /// Sequence number the next entry receives
    pub fn next_sequence(&self) -> u64 {
        self.entry_count
    }

    pub fn update(&mut self, entry: &AuditEntry) {
        self.last_hash = Some(entry.entry_hash.clone());
        self.entry_count += 1;
    }

    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }
}

/// Verifies the integrity of audit entries
pub struct IntegrityVerifier;

impl IntegrityVerifier {
    pub fn verify_entry(entry: &AuditEntry) -> bool {
        entry.computed_hash() == entry.entry_hash
    }

    /// Verify hashes and linkage of a chain, in sequence order
    pub fn verify_chain(entries: &[AuditEntry]) -> ChainVerificationResult {
        let mut result = ChainVerificationResult {
            valid: true,
            total_entries: entries.len(),
            verified_entries: 0,
            first_invalid_index: None,
            error_message: None,
        };

        for (i, entry) in entries.iter().enumerate() {
            if !Self::verify_entry(entry) {
                result.fail(
                    i,
                    format!("Entry {} has invalid hash", entry.record.promotion_id),
                );
                return result;
            }

            let expected_prev = if i > 0 {
                Some(&entries[i - 1].entry_hash)
            } else {
                None
            };
            if entry.previous_hash.as_ref() != expected_prev {
                result.fail(
                    i,
                    format!(
                        "Entry {} has broken chain link (expected prev: {:?}, got: {:?})",
                        entry.record.promotion_id, expected_prev, entry.previous_hash
                    ),
                );
                return result;
            }

            result.verified_entries = i + 1;
        }

        result
    }
}

/// Result of chain verification
#[derive(Debug, Clone)]
pub struct ChainVerificationResult {
    pub valid: bool,
    pub total_entries: usize,
    pub verified_entries: usize,
    pub first_invalid_index: Option<usize>,
    pub error_message: Option<String>,
}

impl ChainVerificationResult {
    fn fail(&mut self, index: usize, message: String) {
        self.valid = false;
        self.first_invalid_index = Some(index);
        self.error_message = Some(message);
    }
}
