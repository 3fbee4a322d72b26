//! Record store interface
//!
//! Downstream persistence is an idempotent upsert keyed on record id, so the
//! same export can be imported any number of times.

use super::reader::{is_importable, read_export};
use super::types::ImportStats;
use crate::error::Result;
use crate::normalize::CanonicalRecord;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Persistent home of imported records
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert records not already stored
    ///
    /// Records missing an id, creation time or text are skipped as invalid;
    /// records whose id is already stored are counted as deduped and left
    /// untouched.
    async fn upsert_batch(&self, records: Vec<CanonicalRecord>) -> Result<ImportStats>;

    /// Number of stored records
    async fn count(&self) -> Result<usize>;
}

#[derive(Debug, Default)]
struct MemoryInner {
    ids: HashSet<String>,
    records: Vec<CanonicalRecord>,
}

/// In-memory store, used for dry-run imports and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryInner>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored records in insertion order
    pub async fn records(&self) -> Vec<CanonicalRecord> {
        self.inner.read().await.records.clone()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn upsert_batch(&self, records: Vec<CanonicalRecord>) -> Result<ImportStats> {
        let mut inner = self.inner.write().await;
        let mut stats = ImportStats::default();

        for record in records {
            if !is_importable(&record) {
                stats.skipped_invalid += 1;
                continue;
            }
            if !inner.ids.insert(record.id.clone()) {
                stats.deduped += 1;
                continue;
            }
            inner.records.push(record);
            stats.imported += 1;
        }
        Ok(stats)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.inner.read().await.records.len())
    }
}

/// Read an export file and upsert its rows into `store`
///
/// Rows the reader could not resolve count towards `skipped_invalid`.
pub async fn import_file(store: &dyn RecordStore, path: impl AsRef<Path>) -> Result<ImportStats> {
    let path = path.as_ref();
    let contents = read_export(path)?;
    let invalid = contents.invalid;

    let mut stats = store.upsert_batch(contents.records).await?;
    stats.skipped_invalid += invalid;

    info!(
        "Imported {} from {} ({} invalid, {} duplicates)",
        stats.imported,
        path.display(),
        stats.skipped_invalid,
        stats.deduped
    );
    Ok(stats)
}
