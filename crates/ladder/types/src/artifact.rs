//! Artifact references

use crate::Digest;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A tag in a registry, resolved to its immutable digest
///
/// Created by the artifact resolver at promotion time and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactRef {
    /// Registry the artifact lives in (e.g. `registry.example.com/platform/app`)
    pub registry_uri: String,

    /// Tag that was resolved
    pub tag: String,

    /// Resolved content digest
    pub digest: Digest,
}

impl ArtifactRef {
    pub fn new(registry_uri: impl Into<String>, tag: impl Into<String>, digest: Digest) -> Self {
        Self {
            registry_uri: registry_uri.into(),
            tag: tag.into(),
            digest,
        }
    }

    /// Fully qualified reference pinned by digest (`registry@digest`)
    pub fn pinned(&self) -> String {
        format!("{}@{}", self.registry_uri, self.digest)
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}@{}", self.registry_uri, self.tag, self.digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_display() {
        let artifact = ArtifactRef::new("registry.local/app", "v1.0.0", Digest::new("sha256:aa"));
        assert_eq!(artifact.to_string(), "registry.local/app:v1.0.0@sha256:aa");
        assert_eq!(artifact.pinned(), "registry.local/app@sha256:aa");
    }
}
