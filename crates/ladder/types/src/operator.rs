//! Operator identity

use serde::{Deserialize, Serialize};
use std::fmt;

/// The human or service account requesting a promotion
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Operator {
    /// Operator name as recorded in the audit trail
    pub name: String,

    /// Groups the operator belongs to
    #[serde(default)]
    pub groups: Vec<String>,
}

impl Operator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: Vec::new(),
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for Operator {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Operator {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}
