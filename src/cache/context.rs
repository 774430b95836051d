//! Cache context
//!
//! Owns the selected backend and the TTL table. Built once at startup and
//! passed to whatever needs caching; there is no global instance.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::client::CacheClient;
use crate::config::{BackendKind, CacheKind, Config, TtlPolicy};
use crate::error::Result;

use super::backend::{CacheBackend, MemoryBackend, RemoteBackend};
use super::entry::{unix_now, CacheEntry};

/// Backend plus TTL policy
pub struct CacheContext {
    backend: Box<dyn CacheBackend>,
    ttl: TtlPolicy,
    /// Set when a remote backend was requested but memory is in use
    degraded: bool,
}

impl CacheContext {
    /// Build the backend named by `config.backend`
    ///
    /// If the cache server cannot be reached the context falls back to an
    /// in-memory backend and logs the downgrade once.
    pub fn connect(config: &Config) -> Result<Self> {
        config.validate()?;

        match config.backend {
            BackendKind::Memory => Ok(Self::in_memory(config)),
            BackendKind::Remote => match CacheClient::connect(config.clone()) {
                Ok(client) => {
                    tracing::info!("Cache backend: remote ({})", config.address());
                    Ok(Self::with_backend(Box::new(RemoteBackend::new(client)), config.ttl))
                }
                Err(e) => {
                    tracing::warn!(
                        "Cache server {} unavailable ({}), falling back to in-memory cache",
                        config.address(),
                        e
                    );
                    let mut context = Self::in_memory(config);
                    context.degraded = true;
                    Ok(context)
                }
            },
        }
    }

    pub fn in_memory(config: &Config) -> Self {
        Self::with_backend(Box::new(MemoryBackend::new()), config.ttl)
    }

    pub fn with_backend(backend: Box<dyn CacheBackend>, ttl: TtlPolicy) -> Self {
        Self {
            backend,
            ttl,
            degraded: false,
        }
    }

    // =========================================================================
    // Raw content
    // =========================================================================

    /// Store `content` under the TTL of `kind`
    pub fn put(&self, key: &str, content: Vec<u8>, kind: CacheKind, source_type: u8) -> Result<()> {
        let entry = CacheEntry::new(content, self.ttl.ttl_for(kind), source_type);
        self.put_entry(key, &entry)
    }

    pub fn put_entry(&self, key: &str, entry: &CacheEntry) -> Result<()> {
        tracing::trace!("cache put {} ({} bytes)", key, entry.content.len());
        self.backend.put(key, entry)
    }

    /// Store several entries under one TTL kind
    pub fn put_many(&self, items: Vec<(String, Vec<u8>)>, kind: CacheKind, source_type: u8) -> Result<()> {
        let ttl = self.ttl.ttl_for(kind);
        let entries: Vec<(String, CacheEntry)> = items
            .into_iter()
            .map(|(key, content)| (key, CacheEntry::new(content, ttl, source_type)))
            .collect();
        self.backend.put_many(&entries)
    }

    /// Content of a live entry
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.get_entry(key)?.map(|entry| entry.content))
    }

    /// Live entry with its metadata; an expired entry is deleted and
    /// reported as a miss
    pub fn get_entry(&self, key: &str) -> Result<Option<CacheEntry>> {
        let entry = match self.backend.get(key)? {
            Some(entry) => entry,
            None => return Ok(None),
        };

        if entry.is_expired_at(unix_now()) {
            tracing::debug!("cache entry {} expired", key);
            self.backend.delete(key)?;
            return Ok(None);
        }

        Ok(Some(entry))
    }

    pub fn delete(&self, key: &str) -> Result<()> {
        self.backend.delete(key)
    }

    pub fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get_entry(key)?.is_some())
    }

    // =========================================================================
    // Typed records
    // =========================================================================

    /// Store a serde value encoded with bincode
    pub fn put_serialized<T: Serialize>(&self, key: &str, value: &T, kind: CacheKind) -> Result<()> {
        let content = bincode::serialize(value)?;
        self.put(key, content, kind, 0)
    }

    /// Load a value stored by `put_serialized`
    pub fn get_deserialized<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key)? {
            Some(content) => Ok(Some(bincode::deserialize(&content)?)),
            None => Ok(None),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn ttl_policy(&self) -> &TtlPolicy {
        &self.ttl
    }

    pub fn shutdown(&self) {
        tracing::debug!("Shutting down {} cache backend", self.backend.name());
        self.backend.shutdown();
    }
}

impl std::fmt::Debug for CacheContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheContext")
            .field("backend", &self.backend.name())
            .field("degraded", &self.degraded)
            .finish()
    }
}
