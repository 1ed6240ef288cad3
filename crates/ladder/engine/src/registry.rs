//! Artifact registry boundary
//!
//! The engine never speaks a registry wire protocol. It resolves tags to
//! digests, fetches the bytes handed to the verifier, and moves tags.

use async_trait::async_trait;
use dashmap::DashMap;
use ladder_types::{ArtifactRef, Digest};
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("tag '{tag}' not found in {registry}")]
    NotFound { tag: String, registry: String },

    #[error("no content stored for {0}")]
    ContentMissing(Digest),

    #[error("registry unavailable: {0}")]
    Unavailable(String),
}

/// Registry operations the promotion engine depends on
#[async_trait]
pub trait ArtifactRegistry: Send + Sync {
    /// Resolve a tag to the digest it currently points at
    async fn resolve_digest(
        &self,
        registry_uri: &str,
        tag: &str,
    ) -> Result<Digest, RegistryError>;

    /// Raw manifest bytes for a resolved artifact
    async fn fetch_content(&self, artifact: &ArtifactRef) -> Result<Vec<u8>, RegistryError>;

    /// Point `new_tag` at the artifact's digest
    async fn create_tag(&self, artifact: &ArtifactRef, new_tag: &str) -> Result<(), RegistryError>;

    /// Move the environment's latest pointer to the artifact's digest
    async fn update_latest(
        &self,
        artifact: &ArtifactRef,
        environment: &str,
    ) -> Result<(), RegistryError> {
        self.create_tag(artifact, &latest_tag(environment)).await
    }

    /// Delete a tag; deleting a tag that does not exist succeeds
    async fn remove_tag(&self, registry_uri: &str, tag: &str) -> Result<(), RegistryError>;
}

/// Tag naming an artifact promoted into an environment
pub fn env_tag(environment: &str, tag: &str) -> String {
    format!("{}-{}", environment, tag)
}

/// Tag tracking the most recent promotion into an environment
pub fn latest_tag(environment: &str) -> String {
    format!("{}-latest", environment)
}

/// In-memory registry for development and tests
#[derive(Default)]
pub struct InMemoryRegistry {
    tags: DashMap<(String, String), Digest>,
    content: DashMap<Digest, Vec<u8>>,
    tag_writes: AtomicUsize,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish an artifact under a tag
    pub fn push(
        &self,
        registry_uri: impl Into<String>,
        tag: impl Into<String>,
        digest: Digest,
        content: impl Into<Vec<u8>>,
    ) {
        self.content.insert(digest.clone(), content.into());
        self.tags.insert((registry_uri.into(), tag.into()), digest);
    }

    pub fn digest_of(&self, registry_uri: &str, tag: &str) -> Option<Digest> {
        self.tags
            .get(&(registry_uri.to_string(), tag.to_string()))
            .map(|d| d.value().clone())
    }

    /// Number of tag mutations performed through [`ArtifactRegistry`]
    pub fn tag_writes(&self) -> usize {
        self.tag_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArtifactRegistry for InMemoryRegistry {
    async fn resolve_digest(
        &self,
        registry_uri: &str,
        tag: &str,
    ) -> Result<Digest, RegistryError> {
        self.digest_of(registry_uri, tag)
            .ok_or_else(|| RegistryError::NotFound {
                tag: tag.to_string(),
                registry: registry_uri.to_string(),
            })
    }

    async fn fetch_content(&self, artifact: &ArtifactRef) -> Result<Vec<u8>, RegistryError> {
        self.content
            .get(&artifact.digest)
            .map(|c| c.value().clone())
            .ok_or_else(|| RegistryError::ContentMissing(artifact.digest.clone()))
    }

    async fn create_tag(&self, artifact: &ArtifactRef, new_tag: &str) -> Result<(), RegistryError> {
        debug!(
            registry = %artifact.registry_uri,
            tag = new_tag,
            digest = %artifact.digest,
            "Moving tag"
        );
        self.tags.insert(
            (artifact.registry_uri.clone(), new_tag.to_string()),
            artifact.digest.clone(),
        );
        self.tag_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove_tag(&self, registry_uri: &str, tag: &str) -> Result<(), RegistryError> {
        debug!(registry = registry_uri, tag, "Removing tag");
        self.tags.remove(&(registry_uri.to_string(), tag.to_string()));
        self.tag_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTRY: &str = "registry.local/app";

    #[tokio::test]
    async fn test_resolve_and_fetch() {
        let registry = InMemoryRegistry::new();
        registry.push(REGISTRY, "v1.0.0", Digest::new("sha256:aa"), b"manifest".to_vec());

        let digest = registry.resolve_digest(REGISTRY, "v1.0.0").await.unwrap();
        assert_eq!(digest, Digest::new("sha256:aa"));

        let artifact = ArtifactRef::new(REGISTRY, "v1.0.0", digest);
        assert_eq!(registry.fetch_content(&artifact).await.unwrap(), b"manifest");

        assert!(matches!(
            registry.resolve_digest(REGISTRY, "v9.9.9").await,
            Err(RegistryError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_env_and_latest_tags() {
        let registry = InMemoryRegistry::new();
        registry.push(REGISTRY, "v1.0.0", Digest::new("sha256:aa"), Vec::new());
        let artifact = ArtifactRef::new(REGISTRY, "v1.0.0", Digest::new("sha256:aa"));

        registry
            .create_tag(&artifact, &env_tag("staging", "v1.0.0"))
            .await
            .unwrap();
        registry.update_latest(&artifact, "staging").await.unwrap();

        assert_eq!(
            registry.digest_of(REGISTRY, "staging-v1.0.0"),
            Some(Digest::new("sha256:aa"))
        );
        assert_eq!(
            registry.digest_of(REGISTRY, "staging-latest"),
            Some(Digest::new("sha256:aa"))
        );
        assert_eq!(registry.tag_writes(), 2);
    }

    #[tokio::test]
    async fn test_remove_tag() {
        let registry = InMemoryRegistry::new();
        registry.push(REGISTRY, "staging-latest", Digest::new("sha256:aa"), Vec::new());

        registry.remove_tag(REGISTRY, "staging-latest").await.unwrap();
        assert_eq!(registry.digest_of(REGISTRY, "staging-latest"), None);

        // Missing tags are not an error
        registry.remove_tag(REGISTRY, "staging-latest").await.unwrap();
    }
}
