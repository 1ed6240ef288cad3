//! Ladder Audit - Promotion history
//!
//! Append-only persistence of [`PromotionRecord`]s with a SHA-256 hash
//! chain for tamper evidence. Records are queryable by tag, digest and
//! environment, most recent first.
//!
//! Dry-run records are never accepted: every store rejects them.
//!
//! [`PromotionRecord`]: ladder_types::PromotionRecord

#![deny(unsafe_code)]

pub mod entry;
pub mod error;
pub mod integrity;
pub mod query;
pub mod store;

pub use entry::AuditEntry;
pub use error::{AuditError, Result};
pub use integrity::{ChainVerificationResult, IntegrityChain, IntegrityVerifier};
pub use query::{AuditQuery, AuditQueryBuilder};
pub use store::{AuditStore, FileAuditStore, MemoryAuditStore};
