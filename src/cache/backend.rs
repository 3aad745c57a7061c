use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::key::CacheKey;

/// A cache storage failure. Logged by the listing endpoint, never returned
/// to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheError {
    pub operation: &'static str,
    pub message: String,
}

impl CacheError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cache {} failed: {}", self.operation, self.message)
    }
}

impl std::error::Error for CacheError {}

/// Storage for rendered listing responses.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheError>;

    async fn set(&self, key: &CacheKey, value: Bytes) -> Result<(), CacheError>;
}

#[derive(Debug, Default)]
struct Counters {
    reads: AtomicUsize,
    hits: AtomicUsize,
    writes: AtomicUsize,
}

/// In-process backend over a [`DashMap`].
///
/// Clones share the same storage. Entries live until invalidated; there is no
/// expiry.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<DashMap<CacheKey, Bytes>>,
    counters: Arc<Counters>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop one entry. Returns whether it existed.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn read_count(&self) -> usize {
        self.counters.reads.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn hit_count(&self) -> usize {
        self.counters.hits.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn write_count(&self) -> usize {
        self.counters.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheError> {
        self.counters.reads.fetch_add(1, Ordering::SeqCst);
        let value = self.entries.get(key).map(|entry| entry.value().clone());
        if value.is_some() {
            self.counters.hits.fetch_add(1, Ordering::SeqCst);
        }
        Ok(value)
    }

    async fn set(&self, key: &CacheKey, value: Bytes) -> Result<(), CacheError> {
        self.counters.writes.fetch_add(1, Ordering::SeqCst);
        self.entries.insert(key.clone(), value);
        Ok(())
    }
}
