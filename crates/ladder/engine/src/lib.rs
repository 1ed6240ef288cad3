//! Ladder Engine - Promotion and verification
//!
//! Moves content-addressed artifacts one environment at a time through a
//! configured chain. Each promotion is checked in a fixed order:
//!
//! - **Transition**: only the next environment in the chain is reachable
//! - **Gates**: every configured compliance check runs; required failures
//!   block real promotions
//! - **Signature**: verified per the target's enforcement mode and cached
//!   per digest
//! - **Authorization**: allow-lists and separation of duties
//!
//! Real promotions then move registry tags, append a tamper-evident audit
//! record and notify webhooks. Dry runs stop before any of that.
//!
//! ## Example
//!
//! ```rust,ignore
//! use ladder_engine::{GateTable, InMemoryRegistry, PromotionController, PrebuiltVerifier};
//! use ladder_audit::MemoryAuditStore;
//!
//! let controller = PromotionController::builder(config, "registry.local/app")
//!     .with_registry(Arc::new(InMemoryRegistry::new()))
//!     .with_gate_runner(Arc::new(GateTable::new()))
//!     .with_verifier_provider(Arc::new(PrebuiltVerifier::new(verifier)))
//!     .with_audit_store(Arc::new(MemoryAuditStore::new()))
//!     .build()?;
//!
//! let record = controller
//!     .promote("v1.0.0", "dev", "staging", &"alice".into(), false)
//!     .await?;
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod authorization;
pub mod builder;
pub mod config;
pub mod controller;
pub mod error;
pub mod gates;
pub mod registry;
pub mod state_machine;
pub mod telemetry;
pub mod verification;

pub use authorization::AuthorizationGuard;
pub use builder::PromotionControllerBuilder;
pub use config::{AuditStorageConfig, LadderConfig, LoggingConfig};
pub use controller::PromotionController;
pub use error::{PromotionError, Result};
pub use gates::{run_gates, GateCheck, GateError, GateRunner, GateTable, GateVerdict};
pub use registry::{ArtifactRegistry, InMemoryRegistry, RegistryError};
pub use state_machine::PromotionStateMachine;
pub use telemetry::init_tracing;
pub use verification::{
    apply_enforcement, LazyVerifier, PrebuiltVerifier, VerificationCache, Verifier,
    VerifierProvider, VerifyError,
};
