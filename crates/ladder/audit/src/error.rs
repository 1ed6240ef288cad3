//! Error types for ladder-audit

use ladder_types::PromotionId;
use thiserror::Error;

/// Errors that can occur while persisting or reading promotion history
#[derive(Debug, Error)]
pub enum AuditError {
    /// Dry-run records must never reach the store
    #[error("Refusing to persist dry-run record {0}")]
    DryRunRecord(PromotionId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Integrity verification failed: {0}")]
    IntegrityFailed(String),
}

/// Result type alias for audit operations
pub type Result<T> = std::result::Result<T, AuditError>;
