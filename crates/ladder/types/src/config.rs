//! Promotion chain configuration
//!
//! Loaded once and treated as immutable for the lifetime of a controller.

use crate::error::ConfigError;
use crate::{Environment, WebhookConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Ordered promotion chain plus webhook subscriptions
///
/// The order of `environments` defines the only legal transitions: each
/// environment may only be promoted into from its immediate predecessor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromotionConfig {
    /// Environments in promotion order
    #[serde(default)]
    pub environments: Vec<Environment>,

    /// Webhooks notified on promotion lifecycle events
    #[serde(default)]
    pub webhooks: Vec<WebhookConfig>,
}

impl PromotionConfig {
    pub fn new(environments: Vec<Environment>) -> Self {
        Self {
            environments,
            webhooks: Vec::new(),
        }
    }

    pub fn with_webhook(mut self, webhook: WebhookConfig) -> Self {
        self.webhooks.push(webhook);
        self
    }

    /// Position of an environment in the chain
    pub fn position(&self, name: &str) -> Option<usize> {
        self.environments.iter().position(|e| e.name == name)
    }

    pub fn environment(&self, name: &str) -> Option<&Environment> {
        self.environments.iter().find(|e| e.name == name)
    }

    pub fn environment_names(&self) -> impl Iterator<Item = &str> {
        self.environments.iter().map(|e| e.name.as_str())
    }

    /// Check the structural invariants of the chain
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.environments.is_empty() {
            return Err(ConfigError::NoEnvironments);
        }

        let mut seen = HashSet::new();
        for env in &self.environments {
            if env.name.trim().is_empty() {
                return Err(ConfigError::EmptyEnvironmentName);
            }
            if !seen.insert(env.name.as_str()) {
                return Err(ConfigError::DuplicateEnvironment(env.name.clone()));
            }

            let mut gates = HashSet::new();
            for gate in &env.gates {
                if !gates.insert(gate.name.as_str()) {
                    return Err(ConfigError::DuplicateGate {
                        environment: env.name.clone(),
                        gate: gate.name.clone(),
                    });
                }
                if gate.timeout_seconds == Some(0) {
                    return Err(ConfigError::InvalidTimeout(format!(
                        "gate '{}' in '{}'",
                        gate.name, env.name
                    )));
                }
            }
        }

        for webhook in &self.webhooks {
            if webhook.url.trim().is_empty() {
                return Err(ConfigError::InvalidWebhook("url must not be empty".into()));
            }
            if webhook.timeout_seconds == 0 {
                return Err(ConfigError::InvalidTimeout(format!("webhook {}", webhook.url)));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> PromotionConfig {
        PromotionConfig::new(vec![
            Environment::new("dev"),
            Environment::new("staging"),
            Environment::new("prod"),
        ])
    }

    #[test]
    fn test_positions() {
        let config = chain();
        assert_eq!(config.position("dev"), Some(0));
        assert_eq!(config.position("prod"), Some(2));
        assert_eq!(config.position("qa"), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duplicate_environment_rejected() {
        let config = PromotionConfig::new(vec![Environment::new("dev"), Environment::new("dev")]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateEnvironment(name)) if name == "dev"
        ));
    }

    #[test]
    fn test_empty_chain_rejected() {
        assert!(matches!(
            PromotionConfig::default().validate(),
            Err(ConfigError::NoEnvironments)
        ));
    }

    #[test]
    fn test_duplicate_gate_rejected() {
        let config = PromotionConfig::new(vec![Environment::new("dev")
            .with_gate("tests")
            .with_optional_gate("tests")]);
        assert!(matches!(config.validate(), Err(ConfigError::DuplicateGate { .. })));
    }

    #[test]
    fn test_webhook_without_url_rejected() {
        let config = chain().with_webhook(WebhookConfig::new(" "));
        assert!(matches!(config.validate(), Err(ConfigError::InvalidWebhook(_))));
    }
}
