//! Gate results

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a single gate execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateStatus {
    Passed,
    Failed,
    Skipped,
}

impl fmt::Display for GateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => f.write_str("PASSED"),
            Self::Failed => f.write_str("FAILED"),
            Self::Skipped => f.write_str("SKIPPED"),
        }
    }
}

/// Result of running one gate during one promotion attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateResult {
    /// Gate name
    pub gate: String,

    /// Pass/fail/skip outcome
    pub status: GateStatus,

    /// Wall-clock time spent in the gate
    pub duration_ms: u64,

    /// Failure detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Whether a failure of this gate blocks a real promotion
    #[serde(default)]
    pub required: bool,
}

impl GateResult {
    pub fn passed(gate: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            gate: gate.into(),
            status: GateStatus::Passed,
            duration_ms,
            error: None,
            required: false,
        }
    }

    pub fn failed(gate: impl Into<String>, error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            gate: gate.into(),
            status: GateStatus::Failed,
            duration_ms,
            error: Some(error.into()),
            required: false,
        }
    }

    pub fn skipped(gate: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            gate: gate.into(),
            status: GateStatus::Skipped,
            duration_ms: 0,
            error: Some(reason.into()),
            required: false,
        }
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn is_failed(&self) -> bool {
        self.status == GateStatus::Failed
    }

    /// A failed required gate blocks a real promotion
    pub fn is_blocking(&self) -> bool {
        self.required && self.is_failed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocking_only_for_required_failures() {
        assert!(GateResult::failed("tests", "2 failed", 10)
            .with_required(true)
            .is_blocking());
        assert!(!GateResult::failed("lint", "warnings", 10).is_blocking());
        assert!(!GateResult::passed("tests", 10).with_required(true).is_blocking());
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&GateStatus::Failed).unwrap();
        assert_eq!(json, "\"FAILED\"");
    }
}
