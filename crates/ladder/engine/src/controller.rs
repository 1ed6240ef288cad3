//! Promotion controller
//!
//! Orchestrates one promotion attempt:
//!
//! 1. Validate the environment transition
//! 2. Resolve the tag to its digest
//! 3. Run every gate configured for the target environment
//! 4. Verify the signature per the target's enforcement mode
//! 5. Authorize the operator
//! 6. For real promotions: block on required gate failures, then move
//!    tags, append the audit record and fire webhooks
//!
//! Dry runs perform steps 1-5 identically and stop before any side effect.
//!
//! If a tag move or the audit append fails, both tags are put back where
//! they were, so a promotion never lands without its record. Webhooks are
//! delivered in the background after the call returns.

use crate::authorization::AuthorizationGuard;
use crate::builder::PromotionControllerBuilder;
use crate::error::{PromotionError, Result};
use crate::gates::{self, GateRunner};
use crate::registry::{env_tag, latest_tag, ArtifactRegistry, RegistryError};
use crate::state_machine::PromotionStateMachine;
use crate::verification::{self, LazyVerifier, VerificationCache, VerifyError};
use chrono::Utc;
use ladder_audit::{AuditEntry, AuditQuery, AuditStore};
use ladder_types::{
    ArtifactRef, Digest, EnforcementMode, Environment, EnvironmentStatus, Operator,
    PromotionConfig, PromotionHistoryEntry, PromotionId, PromotionRecord,
    PromotionStatusResponse, VerificationPolicy, VerificationResult, WebhookEvent,
};
use ladder_webhook::WebhookNotifier;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Promotion controller
///
/// Owns the verification cache: results live as long as the controller.
/// Hosts that keep a controller for a long time should recycle it
/// periodically.
pub struct PromotionController {
    config: Arc<PromotionConfig>,
    registry_uri: String,
    registry: Arc<dyn ArtifactRegistry>,
    gates: Arc<dyn GateRunner>,
    verifier: LazyVerifier,
    cache: VerificationCache,
    state_machine: PromotionStateMachine,
    authorization: AuthorizationGuard,
    audit: Arc<dyn AuditStore>,
    notifier: WebhookNotifier,
}

impl PromotionController {
    pub fn builder(
        config: PromotionConfig,
        registry_uri: impl Into<String>,
    ) -> PromotionControllerBuilder {
        PromotionControllerBuilder::new(config, registry_uri)
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        config: Arc<PromotionConfig>,
        registry_uri: String,
        registry: Arc<dyn ArtifactRegistry>,
        gates: Arc<dyn GateRunner>,
        verifier: LazyVerifier,
        audit: Arc<dyn AuditStore>,
        notifier: WebhookNotifier,
    ) -> Self {
        Self {
            state_machine: PromotionStateMachine::new(config.clone()),
            authorization: AuthorizationGuard::new(audit.clone()),
            cache: VerificationCache::new(),
            config,
            registry_uri,
            registry,
            gates,
            verifier,
            audit,
            notifier,
        }
    }

    /// Promote `tag` from `from_env` into `to_env`
    ///
    /// With `dry_run` set, gate failures are reported in the returned record
    /// instead of raised, and nothing is written anywhere.
    #[instrument(skip(self, operator), fields(operator = %operator))]
    pub async fn promote(
        &self,
        tag: &str,
        from_env: &str,
        to_env: &str,
        operator: &Operator,
        dry_run: bool,
    ) -> Result<PromotionRecord> {
        self.state_machine.validate_transition(from_env, to_env)?;
        let target = self.environment(to_env)?;

        let artifact = self.resolve(tag).await?;
        let gate_results = gates::run_gates(self.gates.as_ref(), &artifact, target, dry_run).await;
        let verification = self.verify_signature(&artifact, target).await?;
        self.authorization
            .authorize(operator, tag, from_env, target)
            .await?;

        let record = PromotionRecord {
            promotion_id: PromotionId::generate(),
            tag: tag.to_string(),
            digest: artifact.digest.clone(),
            from_env: from_env.to_string(),
            to_env: to_env.to_string(),
            operator: operator.name.clone(),
            dry_run,
            gate_results,
            signature_verified: verification.is_valid(),
            verification,
            timestamp: Utc::now(),
        };

        if dry_run {
            info!(
                promotion_id = %record.promotion_id,
                digest = %record.digest,
                would_block = record.has_blocking_failures(),
                "Dry run complete"
            );
            return Ok(record);
        }

        if record.has_blocking_failures() {
            warn!(
                promotion_id = %record.promotion_id,
                digest = %record.digest,
                failed = record.blocking_failures().count(),
                "Required gates failed, promotion rejected"
            );
            self.notifier.notify_detached(WebhookEvent::GateFailed, &record);
            return Err(PromotionError::GateValidation {
                tag: record.tag,
                digest: record.digest,
                environment: record.to_env,
                gate_results: record.gate_results,
            });
        }

        for gate in record.gate_results.iter().filter(|g| g.is_failed() && !g.required) {
            warn!(
                gate = %gate.gate,
                error = gate.error.as_deref().unwrap_or_default(),
                "Optional gate failed"
            );
        }

        let snapshot = self.snapshot_tags(to_env, tag).await?;
        let entry = match self.commit(&artifact, &record).await {
            Ok(entry) => entry,
            Err(e) => {
                self.restore_tags(&record, &snapshot, &e).await;
                return Err(e);
            }
        };
        info!(
            target: "ladder::audit",
            event = "promotion_recorded",
            promotion_id = %record.promotion_id,
            sequence = entry.sequence,
            tag = %record.tag,
            digest = %record.digest,
            from_env = %record.from_env,
            to_env = %record.to_env,
            operator = %record.operator,
            signature_verified = record.signature_verified,
            "Promotion recorded"
        );

        self.notifier.notify_detached(WebhookEvent::Promote, &record);
        Ok(record)
    }

    /// Simulate a promotion without side effects
    pub async fn dry_run(
        &self,
        tag: &str,
        from_env: &str,
        to_env: &str,
        operator: &Operator,
    ) -> Result<PromotionRecord> {
        self.promote(tag, from_env, to_env, operator, true).await
    }

    /// Where `tag` currently sits in the chain
    ///
    /// Reports every environment, or only `environment` when given, plus up
    /// to `history` most recent promotions of the tag.
    #[instrument(skip(self))]
    pub async fn get_status(
        &self,
        tag: &str,
        environment: Option<&str>,
        history: usize,
    ) -> Result<PromotionStatusResponse> {
        let digest = self.resolve(tag).await?.digest;

        let names: Vec<&str> = match environment {
            Some(name) => vec![self.known_environment(name)?.name.as_str()],
            None => self.config.environment_names().collect(),
        };

        let records = self
            .audit
            .query(&AuditQuery::builder().tag(tag).build())
            .await?;

        let mut environments = BTreeMap::new();
        for name in names {
            let latest = records
                .iter()
                .find(|r| r.to_env == name && r.digest == digest);
            let status = EnvironmentStatus {
                promoted: latest.is_some(),
                promoted_at: latest.map(|r| r.timestamp),
                is_latest: self.is_latest(name, &digest).await?,
                operator: latest.map(|r| r.operator.clone()),
            };
            environments.insert(name.to_string(), status);
        }

        let history = records
            .iter()
            .take(history)
            .map(PromotionHistoryEntry::from)
            .collect();

        Ok(PromotionStatusResponse {
            tag: tag.to_string(),
            digest,
            environments,
            history,
            queried_at: Utc::now(),
        })
    }

    pub fn config(&self) -> &PromotionConfig {
        &self.config
    }

    pub fn verification_cache(&self) -> &VerificationCache {
        &self.cache
    }

    /// Wait for background webhook deliveries to finish
    ///
    /// Hosts should call this before shutting down.
    pub async fn flush_webhooks(&self) {
        self.notifier.flush().await;
    }

    // --- Internal helpers ---

    fn environment(&self, name: &str) -> Result<&Environment> {
        self.config
            .environment(name)
            .ok_or_else(|| PromotionError::InvalidTransition {
                from: String::new(),
                to: name.to_string(),
                reason: format!("unknown environment '{}'", name),
            })
    }

    fn known_environment(&self, name: &str) -> Result<&Environment> {
        self.config
            .environment(name)
            .ok_or_else(|| PromotionError::Config(format!("unknown environment '{}'", name)))
    }

    async fn resolve(&self, tag: &str) -> Result<ArtifactRef> {
        match self.registry.resolve_digest(&self.registry_uri, tag).await {
            Ok(digest) => Ok(ArtifactRef::new(&self.registry_uri, tag, digest)),
            Err(RegistryError::NotFound { .. }) => Err(PromotionError::ArtifactNotFound {
                tag: tag.to_string(),
                registry: self.registry_uri.clone(),
            }),
            Err(e) => Err(registry_error(e)),
        }
    }

    async fn is_latest(&self, environment: &str, digest: &Digest) -> Result<bool> {
        match self
            .registry
            .resolve_digest(&self.registry_uri, &latest_tag(environment))
            .await
        {
            Ok(latest) => Ok(latest == *digest),
            Err(RegistryError::NotFound { .. }) => Ok(false),
            Err(e) => Err(registry_error(e)),
        }
    }

    /// Current targets of the tags a promotion into `environment` moves
    async fn snapshot_tags(&self, environment: &str, tag: &str) -> Result<Vec<TagSnapshot>> {
        let mut snapshot = Vec::with_capacity(2);
        for name in [env_tag(environment, tag), latest_tag(environment)] {
            let previous = match self.registry.resolve_digest(&self.registry_uri, &name).await {
                Ok(digest) => Some(digest),
                Err(RegistryError::NotFound { .. }) => None,
                Err(e) => return Err(registry_error(e)),
            };
            snapshot.push((name, previous));
        }
        Ok(snapshot)
    }

    async fn commit(&self, artifact: &ArtifactRef, record: &PromotionRecord) -> Result<AuditEntry> {
        self.registry
            .create_tag(artifact, &env_tag(&record.to_env, &record.tag))
            .await
            .map_err(registry_error)?;
        self.registry
            .update_latest(artifact, &record.to_env)
            .await
            .map_err(registry_error)?;
        Ok(self.audit.append(record.clone()).await?)
    }

    async fn restore_tags(
        &self,
        record: &PromotionRecord,
        snapshot: &[TagSnapshot],
        cause: &PromotionError,
    ) {
        error!(
            target: "ladder::audit",
            event = "promotion_rolled_back",
            promotion_id = %record.promotion_id,
            tag = %record.tag,
            digest = %record.digest,
            to_env = %record.to_env,
            error = %cause,
            "Promotion not recorded, restoring tags"
        );

        for (name, previous) in snapshot {
            let restored = match previous {
                Some(digest) => {
                    let target = ArtifactRef::new(&self.registry_uri, name, digest.clone());
                    self.registry.create_tag(&target, name).await
                }
                None => self.registry.remove_tag(&self.registry_uri, name).await,
            };
            if let Err(e) = restored {
                error!(
                    target: "ladder::audit",
                    event = "tag_restore_failed",
                    promotion_id = %record.promotion_id,
                    tag = %name,
                    error = %e,
                    "Could not restore tag"
                );
            }
        }
    }

    async fn verify_signature(
        &self,
        artifact: &ArtifactRef,
        environment: &Environment,
    ) -> Result<VerificationResult> {
        let mode = environment.signature.enforcement;
        if mode == EnforcementMode::Off {
            return Ok(verification::skipped(artifact));
        }

        let policy = &environment.signature.policy;
        let result = self
            .cache
            .get_or_try_verify(&artifact.digest, policy, || {
                verification::apply_enforcement(mode, artifact, || {
                    self.call_verifier(artifact, policy)
                })
            })
            .await?;

        // A cached non-valid result still blocks under enforce
        if mode == EnforcementMode::Enforce && !result.is_valid() {
            return Err(verification::rejected(
                artifact,
                result
                    .failure_reason
                    .unwrap_or_else(|| "signature not valid".to_string()),
            ));
        }

        debug!(artifact = %artifact, status = ?result.status, "Signature checked");
        Ok(result)
    }

    async fn call_verifier(
        &self,
        artifact: &ArtifactRef,
        policy: &VerificationPolicy,
    ) -> std::result::Result<VerificationResult, VerifyError> {
        let verifier = self.verifier.get().await?;
        let content = self
            .registry
            .fetch_content(artifact)
            .await
            .map_err(|e| VerifyError::Content(e.to_string()))?;
        verifier
            .verify(artifact, &artifact.digest, &content, policy)
            .await
    }
}

/// A tag and the digest it pointed at, if it existed
type TagSnapshot = (String, Option<Digest>);

fn registry_error(err: RegistryError) -> PromotionError {
    PromotionError::Registry(err.to_string())
}
