//! Signature verification results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Verification outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Valid,
    Invalid,
    Unsigned,
}

/// Result of verifying an artifact's signature
///
/// Never mutated after creation. Cached per digest for the lifetime of the
/// owning controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub status: VerificationStatus,

    #[serde(default)]
    pub signer_identity: Option<String>,

    #[serde(default)]
    pub issuer: Option<String>,

    /// Whether a transparency log inclusion proof was checked
    #[serde(default)]
    pub rekor_verified: bool,

    #[serde(default)]
    pub failure_reason: Option<String>,

    pub verified_at: DateTime<Utc>,
}

impl VerificationResult {
    /// A valid signature by the given signer
    pub fn valid(signer_identity: impl Into<String>, issuer: Option<String>) -> Self {
        Self {
            status: VerificationStatus::Valid,
            signer_identity: Some(signer_identity.into()),
            issuer,
            rekor_verified: false,
            failure_reason: None,
            verified_at: Utc::now(),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            status: VerificationStatus::Invalid,
            signer_identity: None,
            issuer: None,
            rekor_verified: false,
            failure_reason: Some(reason.into()),
            verified_at: Utc::now(),
        }
    }

    pub fn unsigned(reason: impl Into<String>) -> Self {
        Self {
            status: VerificationStatus::Unsigned,
            signer_identity: None,
            issuer: None,
            rekor_verified: false,
            failure_reason: Some(reason.into()),
            verified_at: Utc::now(),
        }
    }

    pub fn with_rekor(mut self, rekor_verified: bool) -> Self {
        self.rekor_verified = rekor_verified;
        self
    }

    pub fn is_valid(&self) -> bool {
        self.status == VerificationStatus::Valid
    }
}
