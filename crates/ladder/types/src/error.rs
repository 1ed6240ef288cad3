//! Configuration validation errors

use thiserror::Error;

/// Errors found while validating a promotion configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("At least one environment must be configured")]
    NoEnvironments,

    #[error("Environment name must not be empty")]
    EmptyEnvironmentName,

    #[error("Duplicate environment: {0}")]
    DuplicateEnvironment(String),

    #[error("Duplicate gate '{gate}' in environment '{environment}'")]
    DuplicateGate { environment: String, gate: String },

    #[error("Invalid webhook: {0}")]
    InvalidWebhook(String),

    #[error("Timeout must be greater than zero: {0}")]
    InvalidTimeout(String),
}
