//! Signature verification enforcement
//!
//! Three enforcement modes decide what a verification failure means:
//!
//! - `off`: the verifier is never built or called; the result is a
//!   synthesized `unsigned`
//! - `warn`: failures are logged and recorded as `invalid`, never raised
//! - `enforce`: failures abort the promotion with
//!   [`PromotionError::SignatureVerification`]
//!
//! Results are memoized per (digest, policy) in a [`VerificationCache`]
//! owned by the controller. Content at a digest is immutable, so one
//! verification per digest and policy is enough. A stricter policy on a
//! later environment is checked on its own.

use crate::error::PromotionError;
use async_trait::async_trait;
use dashmap::DashMap;
use ladder_types::{
    ArtifactRef, Digest, EnforcementMode, VerificationPolicy, VerificationResult,
    VerificationStatus,
};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

/// Reason recorded when enforcement is off
pub const VERIFICATION_DISABLED: &str = "verification disabled (enforcement=off)";

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("artifact is not signed: {0}")]
    Unsigned(String),

    #[error("verifier unavailable: {0}")]
    Unavailable(String),

    #[error("could not fetch artifact content: {0}")]
    Content(String),
}

/// Signature verification backend
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(
        &self,
        artifact: &ArtifactRef,
        digest: &Digest,
        content: &[u8],
        policy: &VerificationPolicy,
    ) -> Result<VerificationResult, VerifyError>;
}

/// Constructs the verification backend on first use
pub trait VerifierProvider: Send + Sync {
    fn build(&self) -> Result<Arc<dyn Verifier>, VerifyError>;
}

impl<F> VerifierProvider for F
where
    F: Fn() -> Result<Arc<dyn Verifier>, VerifyError> + Send + Sync,
{
    fn build(&self) -> Result<Arc<dyn Verifier>, VerifyError> {
        self()
    }
}

/// Provider handing out an already constructed verifier
pub struct PrebuiltVerifier(Arc<dyn Verifier>);

impl PrebuiltVerifier {
    pub fn new(verifier: Arc<dyn Verifier>) -> Self {
        Self(verifier)
    }
}

impl VerifierProvider for PrebuiltVerifier {
    fn build(&self) -> Result<Arc<dyn Verifier>, VerifyError> {
        Ok(self.0.clone())
    }
}

/// Verifier built at most once, on first demand
pub struct LazyVerifier {
    provider: Arc<dyn VerifierProvider>,
    cell: OnceCell<Arc<dyn Verifier>>,
}

impl LazyVerifier {
    pub fn new(provider: Arc<dyn VerifierProvider>) -> Self {
        Self {
            provider,
            cell: OnceCell::new(),
        }
    }

    pub async fn get(&self) -> Result<Arc<dyn Verifier>, VerifyError> {
        self.cell
            .get_or_try_init(|| async { self.provider.build() })
            .await
            .cloned()
    }

    pub fn is_built(&self) -> bool {
        self.cell.initialized()
    }
}

type CacheKey = (Digest, VerificationPolicy);

/// Memo of verification outcomes keyed by digest and policy
///
/// Each key gets its own once-cell, so concurrent requests for the same
/// digest share a single verifier call. Failed initializations are not
/// stored and will be retried.
#[derive(Default)]
pub struct VerificationCache {
    entries: DashMap<CacheKey, Arc<OnceCell<VerificationResult>>>,
}

impl VerificationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, digest: &Digest, policy: &VerificationPolicy) -> Option<VerificationResult> {
        self.entries
            .get(&(digest.clone(), policy.clone()))
            .and_then(|cell| cell.value().get().cloned())
    }

    /// Return the cached result for `digest` under `policy`, running
    /// `verify` on a miss
    pub async fn get_or_try_verify<F, Fut, E>(
        &self,
        digest: &Digest,
        policy: &VerificationPolicy,
        verify: F,
    ) -> Result<VerificationResult, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<VerificationResult, E>>,
    {
        // Clone the cell out so the map shard is not locked across the await
        let cell = Arc::clone(
            &self
                .entries
                .entry((digest.clone(), policy.clone()))
                .or_default(),
        );
        cell.get_or_try_init(verify).await.cloned()
    }

    /// Number of (digest, policy) pairs with a stored result
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.value().initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Apply an enforcement mode to a verifier call
///
/// `verify` is only invoked for `warn` and `enforce`. Non-valid results
/// count as failures.
pub async fn apply_enforcement<F, Fut>(
    mode: EnforcementMode,
    artifact: &ArtifactRef,
    verify: F,
) -> Result<VerificationResult, PromotionError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<VerificationResult, VerifyError>>,
{
    match mode {
        EnforcementMode::Off => Ok(skipped(artifact)),
        EnforcementMode::Warn => match verify().await.and_then(require_valid) {
            Ok(result) => Ok(result),
            Err(e) => {
                error!(
                    target: "ladder::audit",
                    event = "verification_failed",
                    artifact = %artifact,
                    enforcement = %mode,
                    error = %e,
                    "Signature verification failed, continuing"
                );
                Ok(VerificationResult::invalid(e.to_string()))
            }
        },
        EnforcementMode::Enforce => verify().await.and_then(require_valid).map_err(|e| {
            warn!(artifact = %artifact, error = %e, "Signature verification rejected artifact");
            rejected(artifact, e.to_string())
        }),
    }
}

/// Result synthesized when enforcement is off
pub fn skipped(artifact: &ArtifactRef) -> VerificationResult {
    info!(
        target: "ladder::audit",
        event = "verification_skipped",
        artifact = %artifact,
        "Signature verification skipped"
    );
    VerificationResult::unsigned(VERIFICATION_DISABLED)
}

pub(crate) fn rejected(artifact: &ArtifactRef, reason: impl Into<String>) -> PromotionError {
    PromotionError::SignatureVerification {
        artifact: artifact.to_string(),
        reason: reason.into(),
    }
}

fn require_valid(result: VerificationResult) -> Result<VerificationResult, VerifyError> {
    match result.status {
        VerificationStatus::Valid => Ok(result),
        VerificationStatus::Unsigned => Err(VerifyError::Unsigned(
            result
                .failure_reason
                .unwrap_or_else(|| "no signature found".to_string()),
        )),
        VerificationStatus::Invalid => Err(VerifyError::InvalidSignature(
            result
                .failure_reason
                .unwrap_or_else(|| "signature rejected".to_string()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn artifact() -> ArtifactRef {
        ArtifactRef::new("registry.local/app", "v1.0.0", Digest::new("sha256:aa"))
    }

    async fn failing() -> Result<VerificationResult, VerifyError> {
        Err(VerifyError::InvalidSignature("certificate identity mismatch".into()))
    }

    async fn passing() -> Result<VerificationResult, VerifyError> {
        Ok(VerificationResult::valid("ci@example.com", None))
    }

    #[tokio::test]
    async fn test_off_never_calls_verifier() {
        let calls = AtomicUsize::new(0);
        let result = apply_enforcement(EnforcementMode::Off, &artifact(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            passing()
        })
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(result.status, VerificationStatus::Unsigned);
        assert_eq!(result.failure_reason.as_deref(), Some(VERIFICATION_DISABLED));
    }

    #[tokio::test]
    async fn test_warn_converts_failure() {
        let result = apply_enforcement(EnforcementMode::Warn, &artifact(), failing)
            .await
            .unwrap();
        assert_eq!(result.status, VerificationStatus::Invalid);
        assert!(result
            .failure_reason
            .as_deref()
            .unwrap()
            .contains("certificate identity mismatch"));

        let unsigned = apply_enforcement(EnforcementMode::Warn, &artifact(), || async {
            Ok(VerificationResult::unsigned("no signature"))
        })
        .await
        .unwrap();
        assert_eq!(unsigned.status, VerificationStatus::Invalid);
    }

    #[tokio::test]
    async fn test_enforce_raises_failure() {
        let err = apply_enforcement(EnforcementMode::Enforce, &artifact(), failing)
            .await
            .unwrap_err();
        assert!(matches!(err, PromotionError::SignatureVerification { .. }));

        let ok = apply_enforcement(EnforcementMode::Enforce, &artifact(), passing)
            .await
            .unwrap();
        assert!(ok.is_valid());
    }

    #[tokio::test]
    async fn test_cache_verifies_each_digest_once() {
        let cache = VerificationCache::new();
        let policy = VerificationPolicy::default();
        let calls = &AtomicUsize::new(0);
        let verify = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            passing().await
        };

        let a = Digest::new("sha256:aa");
        let b = Digest::new("sha256:bb");
        cache.get_or_try_verify::<_, _, VerifyError>(&a, &policy, verify).await.unwrap();
        cache.get_or_try_verify::<_, _, VerifyError>(&a, &policy, verify).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.get_or_try_verify::<_, _, VerifyError>(&b, &policy, verify).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&a, &policy).unwrap().is_valid());
    }

    #[tokio::test]
    async fn test_stricter_policy_is_verified_separately() {
        let cache = VerificationCache::new();
        let digest = Digest::new("sha256:aa");
        let lenient = VerificationPolicy::default();
        let strict = VerificationPolicy {
            identity: Some("ci@example.com".into()),
            require_rekor: true,
            ..Default::default()
        };

        cache
            .get_or_try_verify::<_, _, VerifyError>(&digest, &lenient, passing)
            .await
            .unwrap();
        assert!(cache.get(&digest, &strict).is_none());

        let err = cache.get_or_try_verify(&digest, &strict, failing).await;
        assert!(err.is_err());
        assert!(cache.get(&digest, &lenient).unwrap().is_valid());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_call() {
        let cache = VerificationCache::new();
        let policy = VerificationPolicy::default();
        let calls = &AtomicUsize::new(0);
        let digest = Digest::new("sha256:aa");
        let verify = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            passing().await
        };

        let (first, second) = tokio::join!(
            cache.get_or_try_verify::<_, _, VerifyError>(&digest, &policy, verify),
            cache.get_or_try_verify::<_, _, VerifyError>(&digest, &policy, verify),
        );

        assert!(first.is_ok() && second.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let cache = VerificationCache::new();
        let policy = VerificationPolicy::default();
        let digest = Digest::new("sha256:aa");

        assert!(cache.get_or_try_verify(&digest, &policy, failing).await.is_err());
        assert!(cache.get(&digest, &policy).is_none());
        assert!(cache.is_empty());

        assert!(cache.get_or_try_verify(&digest, &policy, passing).await.is_ok());
        assert_eq!(cache.len(), 1);
    }

    struct AlwaysValid;

    #[async_trait]
    impl Verifier for AlwaysValid {
        async fn verify(
            &self,
            _: &ArtifactRef,
            _: &Digest,
            _: &[u8],
            _: &VerificationPolicy,
        ) -> Result<VerificationResult, VerifyError> {
            passing().await
        }
    }

    #[tokio::test]
    async fn test_lazy_verifier_builds_once() {
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = builds.clone();
        let provider = move || -> Result<Arc<dyn Verifier>, VerifyError> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(AlwaysValid))
        };
        let lazy = LazyVerifier::new(Arc::new(provider));
        assert!(!lazy.is_built());

        lazy.get().await.unwrap();
        lazy.get().await.unwrap();

        assert!(lazy.is_built());
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }
}
