//! Audit stores for promotion records

use crate::entry::AuditEntry;
use crate::error::{AuditError, Result};
use crate::integrity::{IntegrityChain, IntegrityVerifier};
use crate::query::AuditQuery;
use async_trait::async_trait;
use ladder_types::PromotionRecord;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::debug;

/// Append-only persistence of promotion records
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Append a record to the history
    ///
    /// Dry-run records are rejected with [`AuditError::DryRunRecord`].
    async fn append(&self, record: PromotionRecord) -> Result<AuditEntry>;

    /// Records matching the query, most recent first
    async fn query(&self, query: &AuditQuery) -> Result<Vec<PromotionRecord>>;

    /// Every entry in chain order
    async fn entries(&self) -> Result<Vec<AuditEntry>>;

    /// Most recent promotion of `tag` into `environment`
    async fn latest_into(&self, tag: &str, environment: &str) -> Result<Option<PromotionRecord>> {
        let query = AuditQuery::builder()
            .tag(tag)
            .environment(environment)
            .limit(1)
            .build();
        Ok(self.query(&query).await?.into_iter().next())
    }
}

fn reject_dry_run(record: &PromotionRecord) -> Result<()> {
    if record.dry_run {
        return Err(AuditError::DryRunRecord(record.promotion_id));
    }
    Ok(())
}

/// In-memory audit store for development and tests
pub struct MemoryAuditStore {
    entries: RwLock<Vec<AuditEntry>>,
    chain: RwLock<IntegrityChain>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            chain: RwLock::new(IntegrityChain::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for MemoryAuditStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn append(&self, record: PromotionRecord) -> Result<AuditEntry> {
        reject_dry_run(&record)?;

        let mut chain = self.chain.write();
        let entry = AuditEntry::seal(record, chain.next_sequence(), chain.previous_hash());
        chain.update(&entry);
        self.entries.write().push(entry.clone());

        Ok(entry)
    }

    async fn query(&self, query: &AuditQuery) -> Result<Vec<PromotionRecord>> {
        Ok(query.apply(&self.entries.read()))
    }

    async fn entries(&self) -> Result<Vec<AuditEntry>> {
        Ok(self.entries.read().clone())
    }
}

/// File-backed audit store writing one JSON entry per line
pub struct FileAuditStore {
    path: PathBuf,
    // Held across the file write so lines land in sequence order
    chain: Mutex<IntegrityChain>,
}

impl FileAuditStore {
    /// Open a store, resuming the chain if the file already exists
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let chain = if tokio::fs::try_exists(&path).await? {
            let entries = read_entries(&path).await?;
            let verification = IntegrityVerifier::verify_chain(&entries);
            if !verification.valid {
                return Err(AuditError::IntegrityFailed(
                    verification
                        .error_message
                        .unwrap_or_else(|| format!("{} is corrupt", path.display())),
                ));
            }
            let last_hash = entries.last().map(|e| e.entry_hash.clone());
            IntegrityChain::from_state(last_hash, entries.len() as u64)
        } else {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            IntegrityChain::new()
        };

        debug!(path = %path.display(), entries = chain.entry_count(), "Opened audit store");

        Ok(Self {
            path,
            chain: Mutex::new(chain),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditStore for FileAuditStore {
    async fn append(&self, record: PromotionRecord) -> Result<AuditEntry> {
        reject_dry_run(&record)?;

        let mut chain = self.chain.lock().await;
        let entry = AuditEntry::seal(record, chain.next_sequence(), chain.previous_hash());
        let json = serde_json::to_string(&entry)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(json.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;

        chain.update(&entry);
        Ok(entry)
    }

    async fn query(&self, query: &AuditQuery) -> Result<Vec<PromotionRecord>> {
        let entries = self.entries().await?;
        Ok(query.apply(&entries))
    }

    async fn entries(&self) -> Result<Vec<AuditEntry>> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(Vec::new());
        }
        read_entries(&self.path).await
    }
}

async fn read_entries(path: &Path) -> Result<Vec<AuditEntry>> {
    let file = File::open(path).await?;
    let mut lines = BufReader::new(file).lines();
    let mut entries = Vec::new();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        entries.push(serde_json::from_str(&line)?);
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::tests::record;

    #[tokio::test]
    async fn test_memory_store_chains_entries() {
        let store = MemoryAuditStore::new();

        let first = store.append(record("v1", "dev", "staging", "alice")).await.unwrap();
        let second = store.append(record("v1", "staging", "prod", "bob")).await.unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(second.previous_hash, Some(first.entry_hash));
        assert!(IntegrityVerifier::verify_chain(&store.entries().await.unwrap()).valid);
    }

    #[tokio::test]
    async fn test_dry_run_record_rejected() {
        let store = MemoryAuditStore::new();
        let mut r = record("v1", "dev", "staging", "alice");
        r.dry_run = true;

        assert!(matches!(
            store.append(r).await,
            Err(AuditError::DryRunRecord(_))
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_latest_into() {
        let store = MemoryAuditStore::new();
        store.append(record("v1", "dev", "staging", "alice")).await.unwrap();
        store.append(record("v1", "dev", "staging", "carol")).await.unwrap();

        let latest = store.latest_into("v1", "staging").await.unwrap().unwrap();
        assert_eq!(latest.operator, "carol");
        assert!(store.latest_into("v1", "prod").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_persistence() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("audit").join("promotions.jsonl");

        {
            let store = FileAuditStore::open(&path).await.unwrap();
            store.append(record("v1", "dev", "staging", "alice")).await.unwrap();
            store.append(record("v1", "staging", "prod", "bob")).await.unwrap();
        }

        // Reopen and continue the chain
        let store = FileAuditStore::open(&path).await.unwrap();
        let third = store.append(record("v2", "dev", "staging", "alice")).await.unwrap();
        assert_eq!(third.sequence, 2);

        let entries = store.entries().await.unwrap();
        assert_eq!(entries.len(), 3);
        assert!(IntegrityVerifier::verify_chain(&entries).valid);

        let v1 = store
            .query(&AuditQuery::builder().tag("v1").build())
            .await
            .unwrap();
        assert_eq!(v1.len(), 2);
    }

    #[tokio::test]
    async fn test_file_store_refuses_tampered_chain() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("promotions.jsonl");

        {
            let store = FileAuditStore::open(&path).await.unwrap();
            store.append(record("v1", "dev", "staging", "alice")).await.unwrap();
            store.append(record("v1", "staging", "prod", "bob")).await.unwrap();
        }

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        tokio::fs::write(&path, contents.replacen("\"bob\"", "\"mallory\"", 1))
            .await
            .unwrap();

        assert!(matches!(
            FileAuditStore::open(&path).await,
            Err(AuditError::IntegrityFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_file_store_missing_file_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileAuditStore::open(temp_dir.path().join("none.jsonl"))
            .await
            .unwrap();
        assert!(store.entries().await.unwrap().is_empty());
    }
}
