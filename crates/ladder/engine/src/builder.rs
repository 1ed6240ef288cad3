//! Builder for PromotionController

use crate::controller::PromotionController;
use crate::error::{PromotionError, Result};
use crate::gates::GateRunner;
use crate::registry::ArtifactRegistry;
use crate::verification::{LazyVerifier, VerifierProvider};
use ladder_audit::AuditStore;
use ladder_types::PromotionConfig;
use ladder_webhook::{HttpWebhookDispatcher, WebhookDispatcher, WebhookNotifier};
use std::sync::Arc;

/// Assembles a controller from its collaborators
pub struct PromotionControllerBuilder {
    config: PromotionConfig,
    registry_uri: String,
    registry: Option<Arc<dyn ArtifactRegistry>>,
    gate_runner: Option<Arc<dyn GateRunner>>,
    verifier_provider: Option<Arc<dyn VerifierProvider>>,
    audit_store: Option<Arc<dyn AuditStore>>,
    webhook_dispatcher: Option<Arc<dyn WebhookDispatcher>>,
}

impl PromotionControllerBuilder {
    pub fn new(config: PromotionConfig, registry_uri: impl Into<String>) -> Self {
        Self {
            config,
            registry_uri: registry_uri.into(),
            registry: None,
            gate_runner: None,
            verifier_provider: None,
            audit_store: None,
            webhook_dispatcher: None,
        }
    }

    pub fn with_registry(mut self, registry: Arc<dyn ArtifactRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_gate_runner(mut self, runner: Arc<dyn GateRunner>) -> Self {
        self.gate_runner = Some(runner);
        self
    }

    /// Set the verifier provider; it is only invoked when a verification
    /// actually has to run
    pub fn with_verifier_provider(mut self, provider: Arc<dyn VerifierProvider>) -> Self {
        self.verifier_provider = Some(provider);
        self
    }

    pub fn with_audit_store(mut self, store: Arc<dyn AuditStore>) -> Self {
        self.audit_store = Some(store);
        self
    }

    /// Override the webhook transport (defaults to HTTP)
    pub fn with_webhook_dispatcher(mut self, dispatcher: Arc<dyn WebhookDispatcher>) -> Self {
        self.webhook_dispatcher = Some(dispatcher);
        self
    }

    /// Validate the configuration and build the controller
    pub fn build(self) -> Result<PromotionController> {
        self.config.validate()?;

        if self.registry_uri.trim().is_empty() {
            return Err(PromotionError::Config("registry uri required".into()));
        }
        let registry = self
            .registry
            .ok_or_else(|| PromotionError::Config("registry required".into()))?;
        let gate_runner = self
            .gate_runner
            .ok_or_else(|| PromotionError::Config("gate_runner required".into()))?;
        let verifier_provider = self
            .verifier_provider
            .ok_or_else(|| PromotionError::Config("verifier_provider required".into()))?;
        let audit_store = self
            .audit_store
            .ok_or_else(|| PromotionError::Config("audit_store required".into()))?;

        let dispatcher: Arc<dyn WebhookDispatcher> = match self.webhook_dispatcher {
            Some(dispatcher) => dispatcher,
            None => Arc::new(
                HttpWebhookDispatcher::new().map_err(|e| PromotionError::Config(e.to_string()))?,
            ),
        };
        let notifier = WebhookNotifier::new(dispatcher, self.config.webhooks.clone());

        Ok(PromotionController::from_parts(
            Arc::new(self.config),
            self.registry_uri,
            registry,
            gate_runner,
            LazyVerifier::new(verifier_provider),
            audit_store,
            notifier,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::GateTable;
    use crate::registry::InMemoryRegistry;
    use crate::verification::{Verifier, VerifyError};
    use ladder_audit::MemoryAuditStore;
    use ladder_types::Environment;

    fn unreachable_verifier() -> Arc<dyn VerifierProvider> {
        Arc::new(|| -> std::result::Result<Arc<dyn Verifier>, VerifyError> {
            Err(VerifyError::Unavailable("not configured".into()))
        })
    }

    fn chain() -> PromotionConfig {
        PromotionConfig::new(vec![Environment::new("dev"), Environment::new("staging")])
    }

    #[test]
    fn test_build_requires_collaborators() {
        let result = PromotionControllerBuilder::new(chain(), "registry.local/app")
            .with_registry(Arc::new(InMemoryRegistry::new()))
            .build();
        assert!(matches!(result, Err(PromotionError::Config(msg)) if msg.contains("gate_runner")));
    }

    #[test]
    fn test_build_validates_config() {
        let config = PromotionConfig::default();
        let result = PromotionControllerBuilder::new(config, "registry.local/app")
            .with_registry(Arc::new(InMemoryRegistry::new()))
            .with_gate_runner(Arc::new(GateTable::new()))
            .with_verifier_provider(unreachable_verifier())
            .with_audit_store(Arc::new(MemoryAuditStore::new()))
            .build();
        assert!(matches!(result, Err(PromotionError::Config(_))));
    }

    #[test]
    fn test_build_complete() {
        let controller = PromotionController::builder(chain(), "registry.local/app")
            .with_registry(Arc::new(InMemoryRegistry::new()))
            .with_gate_runner(Arc::new(GateTable::new()))
            .with_verifier_provider(unreachable_verifier())
            .with_audit_store(Arc::new(MemoryAuditStore::new()))
            .build()
            .unwrap();

        assert_eq!(controller.config().environments.len(), 2);
        assert!(controller.verification_cache().is_empty());
    }
}
