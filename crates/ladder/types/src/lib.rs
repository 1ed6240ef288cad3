//! Ladder Types - Core types for artifact promotion
//!
//! Ladder moves immutable, content-addressed artifacts through an ordered
//! chain of deployment environments (e.g. `dev -> staging -> prod`). Every
//! transition is gated by compliance checks, signature verification and
//! authorization, and every real attempt leaves an audit record.
//!
//! ## Key Concepts
//!
//! - **Environment**: One rung of the promotion chain, with its gates,
//!   authorization rules and signature enforcement mode
//! - **ArtifactRef**: A tag resolved to its immutable digest
//! - **GateResult**: Outcome of one compliance check
//! - **VerificationResult**: Outcome of signature verification
//! - **PromotionRecord**: The auditable record of one promotion attempt
//! - **PromotionStatusResponse**: Where a tag currently sits in the chain

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod artifact;
pub mod config;
pub mod environment;
pub mod error;
pub mod gate;
pub mod ids;
pub mod operator;
pub mod record;
pub mod verification;
pub mod webhook;

// Re-export main types
pub use artifact::ArtifactRef;
pub use config::PromotionConfig;
pub use environment::{
    AuthorizationConfig, EnforcementMode, Environment, GateConfig, SignatureConfig,
    VerificationPolicy,
};
pub use error::ConfigError;
pub use gate::{GateResult, GateStatus};
pub use ids::{Digest, PromotionId};
pub use operator::Operator;
pub use record::{
    EnvironmentStatus, PromotionHistoryEntry, PromotionRecord, PromotionStatusResponse,
};
pub use verification::{VerificationResult, VerificationStatus};
pub use webhook::{WebhookConfig, WebhookEvent};
