//! Bounded, process-wide dataset cache.
//!
//! Every ingested table lives here under a freshly generated [`DatasetKey`].
//! Entries are immutable once inserted and handed out as `Arc`s, so readers
//! never hold the cache lock while they work on a table.
//!
//! ## Eviction
//!
//! - **LRU**: at most `max_entries` datasets; inserting one more drops the
//!   least recently used.
//! - **TTL**: entries older than `ttl` are treated as absent and removed on
//!   the next access.
//!
//! Evicted keys are reported so the caller can drop the overlays that belong
//! to them.

use crate::constants::{DEFAULT_CACHE_ENTRIES, DEFAULT_CACHE_TTL_SECS};
use crate::data::error::{DataError, DataResult};
use crate::types::{DatasetKey, SourceDescriptor, Table};
use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Size and age limits of the dataset cache
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    /// Datasets kept before the least recently used one is evicted (min 1)
    pub max_entries: usize,
    /// Maximum age of a dataset; `None` keeps entries until LRU eviction
    pub ttl: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_CACHE_ENTRIES,
            ttl: Some(Duration::from_secs(DEFAULT_CACHE_TTL_SECS)),
        }
    }
}

/// One cached dataset
#[derive(Debug)]
pub struct DatasetEntry {
    pub key: DatasetKey,
    pub table: Table,
    pub source: SourceDescriptor,
    /// Wall-clock ingestion time (seconds since the Unix epoch)
    pub ingested_at: u64,
    created: Instant,
}

impl DatasetEntry {
    pub fn age(&self) -> Duration {
        self.created.elapsed()
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            key: self.key.clone(),
            filename: self.source.filename.clone(),
            rows: self.table.row_count(),
            columns: self.table.columns().to_vec(),
            ingested_at: self.ingested_at,
        }
    }
}

/// Lightweight description of a cached dataset for listings and API replies
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DatasetSummary {
    pub key: DatasetKey,
    pub filename: String,
    pub rows: usize,
    pub columns: Vec<String>,
    pub ingested_at: u64,
}

/// Result of inserting a dataset
#[derive(Debug)]
pub struct CachePut {
    pub key: DatasetKey,
    pub entry: Arc<DatasetEntry>,
    /// Keys dropped to make room (LRU) or because they expired
    pub evicted: Vec<DatasetKey>,
}

struct Inner {
    entries: LruCache<DatasetKey, Arc<DatasetEntry>>,
    /// Keys expired during lookups, waiting to be collected by `drain_evicted`
    expired: Vec<DatasetKey>,
}

/// Dataset cache with LRU and TTL eviction.
pub struct DatasetCache {
    config: CacheConfig,
    inner: Mutex<Inner>,
}

impl Default for DatasetCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl DatasetCache {
    pub fn new(mut config: CacheConfig) -> Self {
        config.max_entries = config.max_entries.max(1);
        let cap = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            config,
            inner: Mutex::new(Inner {
                entries: LruCache::new(cap),
                expired: Vec::new(),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Store a table under a new unique key. Never overwrites an existing entry.
    pub fn put(&self, table: Table, source: SourceDescriptor) -> CachePut {
        let ingested_at = unix_now();
        let mut inner = self.inner.lock();

        let mut evicted = self.purge_expired_locked(&mut inner);
        evicted.append(&mut inner.expired);

        let mut key = generate_key(&source, ingested_at);
        while inner.entries.contains(&key) {
            key = generate_key(&source, ingested_at);
        }

        let rows = table.row_count();
        let entry = Arc::new(DatasetEntry {
            key: key.clone(),
            table,
            source,
            ingested_at,
            created: Instant::now(),
        });

        if let Some((old_key, _)) = inner.entries.push(key.clone(), Arc::clone(&entry)) {
            debug!(key = %old_key, "Evicted least recently used dataset");
            evicted.push(old_key);
        }

        info!(key = %key, rows, cached = inner.entries.len(), "Cached dataset");
        CachePut {
            key,
            entry,
            evicted,
        }
    }

    /// Look up a dataset, refreshing its recency.
    ///
    /// Expired entries are removed and reported as [`DataError::NotFound`].
    pub fn get(&self, key: &DatasetKey) -> DataResult<Arc<DatasetEntry>> {
        let mut inner = self.inner.lock();

        let expired = match inner.entries.get(key) {
            Some(entry) if !self.is_expired(entry) => return Ok(Arc::clone(entry)),
            Some(_) => true,
            None => false,
        };

        if expired {
            inner.entries.pop(key);
            inner.expired.push(key.clone());
            debug!(key = %key, "Dataset expired");
        }
        Err(DataError::NotFound(key.clone()))
    }

    /// Remove every expired entry, returning the keys removed (including
    /// those expired earlier during lookups)
    pub fn purge_expired(&self) -> Vec<DatasetKey> {
        let mut inner = self.inner.lock();
        let mut removed = self.purge_expired_locked(&mut inner);
        removed.append(&mut inner.expired);
        removed
    }

    /// Take the keys that expired during lookups since the last call
    pub fn drain_evicted(&self) -> Vec<DatasetKey> {
        std::mem::take(&mut self.inner.lock().expired)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys of the live datasets, most recently used first
    pub fn keys(&self) -> Vec<DatasetKey> {
        let inner = self.inner.lock();
        inner
            .entries
            .iter()
            .filter(|(_, entry)| !self.is_expired(entry))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Summaries of the live datasets, most recently used first
    pub fn list(&self) -> Vec<DatasetSummary> {
        let inner = self.inner.lock();
        inner
            .entries
            .iter()
            .filter(|(_, entry)| !self.is_expired(entry))
            .map(|(_, entry)| entry.summary())
            .collect()
    }

    fn is_expired(&self, entry: &DatasetEntry) -> bool {
        self.config.ttl.is_some_and(|ttl| entry.age() >= ttl)
    }

    fn purge_expired_locked(&self, inner: &mut Inner) -> Vec<DatasetKey> {
        if self.config.ttl.is_none() {
            return Vec::new();
        }

        let stale: Vec<DatasetKey> = inner
            .entries
            .iter()
            .filter(|(_, entry)| self.is_expired(entry))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &stale {
            inner.entries.pop(key);
        }
        if !stale.is_empty() {
            debug!(count = stale.len(), "Purged expired datasets");
        }
        stale
    }
}

/// `{prefix}_{sha256(filename)[..8]}_{unix_secs}_{nonce}`
fn generate_key(source: &SourceDescriptor, ingested_at: u64) -> DatasetKey {
    let digest = Sha256::digest(source.filename.as_bytes());
    let name_hash: String = digest.iter().take(4).map(|b| format!("{b:02x}")).collect();
    let nonce = uuid::Uuid::new_v4().simple().to_string();

    DatasetKey::new(format!(
        "{}_{}_{}_{}",
        source.key_prefix(),
        name_hash,
        ingested_at,
        &nonce[..8]
    ))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
