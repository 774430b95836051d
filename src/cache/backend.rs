//! Cache backends
//!
//! One implementation per storage target, chosen when the context is built.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::client::CacheClient;
use crate::error::Result;

use super::entry::CacheEntry;

/// Storage target for cache entries
pub trait CacheBackend: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    fn put(&self, key: &str, entry: &CacheEntry) -> Result<()>;

    fn get(&self, key: &str) -> Result<Option<CacheEntry>>;

    fn delete(&self, key: &str) -> Result<()>;

    fn exists(&self, key: &str) -> Result<bool>;

    /// Store several entries; no rollback on partial failure
    fn put_many(&self, entries: &[(String, CacheEntry)]) -> Result<()> {
        for (key, entry) in entries {
            self.put(key, entry)?;
        }
        Ok(())
    }

    /// Release backend resources
    fn shutdown(&self) {}
}

// =============================================================================
// Memory Backend
// =============================================================================

/// In-process map; also the fallback when the cache server is unreachable
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self, now: i64) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        before - entries.len()
    }
}

impl CacheBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn put(&self, key: &str, entry: &CacheEntry) -> Result<()> {
        self.entries.write().insert(key.to_string(), entry.clone());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.entries.read().contains_key(key))
    }
}

// =============================================================================
// Remote Backend
// =============================================================================

/// Entries stored as encoded envelopes on the cache server
pub struct RemoteBackend {
    client: CacheClient,
}

impl RemoteBackend {
    pub fn new(client: CacheClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &CacheClient {
        &self.client
    }
}

impl CacheBackend for RemoteBackend {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn put(&self, key: &str, entry: &CacheEntry) -> Result<()> {
        self.client.set(key, &entry.encode())
    }

    fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        match self.client.get(key)? {
            Some(bytes) => CacheEntry::decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.client.delete(key)
    }

    fn exists(&self, key: &str) -> Result<bool> {
        self.client.exists(key)
    }

    fn put_many(&self, entries: &[(String, CacheEntry)]) -> Result<()> {
        let encoded: Vec<(&str, Vec<u8>)> = entries
            .iter()
            .map(|(key, entry)| (key.as_str(), entry.encode()))
            .collect();
        self.client.batch_set(&encoded).map(|_| ())
    }

    fn shutdown(&self) {
        self.client.shutdown();
    }
}
