//! Gate execution
//!
//! Every configured gate runs, whatever happened to the ones before it.
//! Whether the collected results block a promotion is decided later, on the
//! assembled record (`PromotionRecord::blocking_failures`).

use async_trait::async_trait;
use ladder_types::{ArtifactRef, Environment, GateConfig, GateResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum GateError {
    #[error("no check registered for gate '{0}'")]
    Unregistered(String),

    #[error("{0}")]
    Check(String),

    #[error("gate timed out after {0}s")]
    Timeout(u64),
}

/// Executes one named compliance check
#[async_trait]
pub trait GateRunner: Send + Sync {
    async fn run_gate(
        &self,
        name: &str,
        artifact: &ArtifactRef,
        environment: &Environment,
        dry_run: bool,
    ) -> Result<GateResult, GateError>;
}

/// Outcome reported by a single gate check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateVerdict {
    Pass,
    Fail(String),
    Skip(String),
}

/// A compliance check that can be registered in a [`GateTable`]
///
/// `dry_run` lets a check fall back to cheaper read-only validation.
#[async_trait]
pub trait GateCheck: Send + Sync {
    async fn check(
        &self,
        artifact: &ArtifactRef,
        environment: &Environment,
        dry_run: bool,
    ) -> Result<GateVerdict, GateError>;
}

/// Dispatches gate names to registered checks
#[derive(Default, Clone)]
pub struct GateTable {
    checks: HashMap<String, Arc<dyn GateCheck>>,
}

impl GateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_check(mut self, name: impl Into<String>, check: Arc<dyn GateCheck>) -> Self {
        self.checks.insert(name.into(), check);
        self
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.checks.contains_key(name)
    }
}

#[async_trait]
impl GateRunner for GateTable {
    async fn run_gate(
        &self,
        name: &str,
        artifact: &ArtifactRef,
        environment: &Environment,
        dry_run: bool,
    ) -> Result<GateResult, GateError> {
        let check = self
            .checks
            .get(name)
            .ok_or_else(|| GateError::Unregistered(name.to_string()))?;

        let start = Instant::now();
        let verdict = check.check(artifact, environment, dry_run).await?;
        let duration_ms = elapsed_ms(start);

        Ok(match verdict {
            GateVerdict::Pass => GateResult::passed(name, duration_ms),
            GateVerdict::Fail(reason) => GateResult::failed(name, reason, duration_ms),
            GateVerdict::Skip(reason) => GateResult::skipped(name, reason),
        })
    }
}

/// Run every gate configured for `environment`, in configuration order
///
/// Always yields one result per configured gate. Runner errors and
/// timeouts are recorded as failed results.
pub async fn run_gates(
    runner: &dyn GateRunner,
    artifact: &ArtifactRef,
    environment: &Environment,
    dry_run: bool,
) -> Vec<GateResult> {
    let mut results = Vec::with_capacity(environment.gates.len());
    for gate in &environment.gates {
        results.push(run_gate(runner, gate, artifact, environment, dry_run).await);
    }
    results
}

async fn run_gate(
    runner: &dyn GateRunner,
    gate: &GateConfig,
    artifact: &ArtifactRef,
    environment: &Environment,
    dry_run: bool,
) -> GateResult {
    let start = Instant::now();
    let call = runner.run_gate(&gate.name, artifact, environment, dry_run);

    let outcome = match gate.timeout_seconds {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), call)
            .await
            .unwrap_or_else(|_| Err(GateError::Timeout(secs))),
        None => call.await,
    };

    let mut result = match outcome {
        Ok(result) => result,
        Err(e) => {
            warn!(gate = %gate.name, environment = %environment.name, error = %e, "Gate errored");
            GateResult::failed(&gate.name, e.to_string(), elapsed_ms(start))
        }
    };

    // The configured entry is authoritative for identity and weight
    result.gate = gate.name.clone();
    result.required = gate.required;

    debug!(
        gate = %result.gate,
        status = %result.status,
        required = result.required,
        duration_ms = result.duration_ms,
        dry_run,
        "Gate finished"
    );
    result
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
