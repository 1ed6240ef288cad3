//! Error types for the promotion engine

use ladder_audit::AuditError;
use ladder_types::{ConfigError, Digest, GateResult};
use thiserror::Error;

/// Errors surfaced by [`crate::PromotionController`]
#[derive(Debug, Error)]
pub enum PromotionError {
    #[error("Invalid transition {from} -> {to}: {reason}")]
    InvalidTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Artifact not found: tag '{tag}' does not resolve in {registry}")]
    ArtifactNotFound { tag: String, registry: String },

    /// Carries the full gate report, not just the blocking failures
    #[error(
        "Gate validation failed for {tag} ({digest}) into {environment}: {}",
        blocking_gate_names(.gate_results)
    )]
    GateValidation {
        tag: String,
        digest: Digest,
        environment: String,
        gate_results: Vec<GateResult>,
    },

    #[error("Signature verification failed for {artifact}: {reason}")]
    SignatureVerification { artifact: String, reason: String },

    #[error("Operator '{operator}' is not authorized to promote into {environment}: {reason}")]
    Authorization {
        operator: String,
        environment: String,
        reason: String,
    },

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Audit store error: {0}")]
    Audit(#[from] AuditError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PromotionError {
    /// Gate report attached to a gate validation failure
    pub fn gate_results(&self) -> Option<&[GateResult]> {
        match self {
            Self::GateValidation { gate_results, .. } => Some(gate_results),
            _ => None,
        }
    }
}

impl From<ConfigError> for PromotionError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

fn blocking_gate_names(results: &[GateResult]) -> String {
    results
        .iter()
        .filter(|r| r.is_blocking())
        .map(|r| r.gate.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, PromotionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_validation_message_names_blocking_gates() {
        let err = PromotionError::GateValidation {
            tag: "v1.0.0".into(),
            digest: Digest::new("sha256:aa"),
            environment: "staging".into(),
            gate_results: vec![
                GateResult::passed("policy_compliance", 3).with_required(true),
                GateResult::failed("tests", "2 failed", 9).with_required(true),
                GateResult::failed("lint", "style", 1),
            ],
        };

        let message = err.to_string();
        assert!(message.contains("tests"));
        assert!(!message.contains("lint"));
        assert_eq!(err.gate_results().map(|r| r.len()), Some(3));
    }
}
