//! Engine configuration
//!
//! Layered in order: built-in defaults, an optional file (YAML, TOML or
//! JSON by extension), then `LADDER_`-prefixed environment variables with
//! `__` between nested keys, e.g. `LADDER_LOGGING__LEVEL=debug`.

use crate::error::{PromotionError, Result};
use ladder_audit::{AuditStore, FileAuditStore, MemoryAuditStore};
use ladder_types::PromotionConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LadderConfig {
    /// Repository the promoted artifacts live in, e.g. `registry.local/app`
    #[serde(default)]
    pub registry: String,

    #[serde(default)]
    pub promotion: PromotionConfig,

    #[serde(default)]
    pub audit: AuditStorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where promotion records are persisted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuditStorageConfig {
    /// Lost on restart
    #[default]
    Memory,

    /// Append-only JSON lines file
    File { path: PathBuf },
}

impl AuditStorageConfig {
    pub async fn open(&self) -> Result<Arc<dyn AuditStore>> {
        Ok(match self {
            Self::Memory => Arc::new(MemoryAuditStore::new()),
            Self::File { path } => Arc::new(FileAuditStore::open(path.clone()).await?),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directives, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,

    #[serde(default = "default_true")]
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            timestamps: true,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl LadderConfig {
    /// Load and validate configuration
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(
            config::Config::try_from(&LadderConfig::default()).map_err(config_error)?,
        );

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("LADDER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(config_error)?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.registry.trim().is_empty() {
            return Err(PromotionError::Config("registry must be set".into()));
        }
        self.promotion.validate()?;
        Ok(())
    }
}

fn config_error(err: config::ConfigError) -> PromotionError {
    PromotionError::Config(err.to_string())
}
