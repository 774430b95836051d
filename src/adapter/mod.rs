//! Cache Adapter
//!
//! Persists a `HotColdNewsStorage` as two blobs (hot, cold) through a
//! `CacheContext` and restores it on a later run.
//!
//! ## Keys
//! `"{source}_hot:{hash}"` and `"{source}_cold:{hash}"`, where `source` is
//! the source type prefix (e.g. `reddit`) and `hash` is the xxh3-64 of the
//! caller's source key.
//!
//! A load is a hit only when both blobs are present and valid. Any failure
//! on the load path is reported as a miss.

mod serializer;
mod stats;

pub use serializer::{
    deserialize_cold, deserialize_hot, serialize_cold, serialize_hot, BLOB_HEADER_SIZE,
    COLD_MAGIC, COLD_RECORD_SIZE, FORMAT_VERSION, HOT_MAGIC, HOT_RECORD_SIZE,
};
pub use stats::{
    AdapterStats, StatsSnapshot, TuningHint, COLD_HIT_RATE_THRESHOLD, HOT_HIT_RATE_THRESHOLD,
    MIN_SAMPLES,
};

use std::sync::Arc;

use crate::cache::{cache_key, CacheContext};
use crate::config::{CacheKind, StorageConfig};
use crate::error::Result;
use crate::storage::{HotColdNewsStorage, MemoryPools, NewsItemCold, NewsItemHot, SourceType};

/// Hot/cold storage persistence over a cache context
pub struct CacheAdapter {
    context: Arc<CacheContext>,
    storage: StorageConfig,
    stats: AdapterStats,
}

impl CacheAdapter {
    /// `storage` sizes the pools of restored storages
    pub fn new(context: Arc<CacheContext>, storage: StorageConfig) -> Self {
        Self {
            context,
            storage,
            stats: AdapterStats::new(),
        }
    }

    pub fn hot_key(source_key: &str, source_type: SourceType) -> String {
        cache_key(&format!("{}_hot", source_type.prefix()), source_key)
    }

    pub fn cold_key(source_key: &str, source_type: SourceType) -> String {
        cache_key(&format!("{}_cold", source_type.prefix()), source_key)
    }

    /// Write both blobs, hot under the hot-data TTL and cold under the
    /// cold-data TTL
    ///
    /// Storages within the `Config::validate` bounds always fit one wire
    /// payload. A larger one fails with `PayloadTooLarge` on a remote
    /// backend and nothing is sent.
    pub fn cache_hot_cold_data(
        &self,
        source_key: &str,
        source_type: SourceType,
        storage: &HotColdNewsStorage,
    ) -> Result<()> {
        let hot = serialize_hot(storage.hot_items());
        let cold = serialize_cold(storage.cold_items(), storage.pools());

        tracing::debug!(
            "Caching {} hot / {} cold records for {} ({} + {} bytes)",
            storage.hot_items().len(),
            storage.cold_items().len(),
            source_key,
            hot.len(),
            cold.len()
        );

        let tag = source_type as u8;
        self.context
            .put(&Self::hot_key(source_key, source_type), hot, CacheKind::HotData, tag)?;
        self.context
            .put(&Self::cold_key(source_key, source_type), cold, CacheKind::ColdData, tag)?;
        Ok(())
    }

    /// Restore a storage written by `cache_hot_cold_data`
    ///
    /// Returns `None` unless both blobs load and the hot records line up
    /// with the cold ones.
    pub fn load_cached_hot_cold_data(
        &self,
        source_key: &str,
        source_type: SourceType,
    ) -> Option<HotColdNewsStorage> {
        let hot = self.load_hot(source_key, source_type);
        let cold = self.load_cold(source_key, source_type);
        self.stats.record_hot(hot.is_some());
        self.stats.record_cold(cold.is_some());

        let (hot, (cold, pools)) = match (hot, cold) {
            (Some(hot), Some(cold)) => (hot, cold),
            (hot, cold) => {
                if hot.is_some() != cold.is_some() {
                    tracing::debug!("Partial cache entry for {}, treating as miss", source_key);
                }
                return None;
            }
        };

        match HotColdNewsStorage::from_parts(self.storage.capacity, hot, cold, pools) {
            Ok(storage) => Some(storage),
            Err(e) => {
                tracing::debug!("Cached data for {} is inconsistent: {}", source_key, e);
                None
            }
        }
    }

    /// Remove both blobs
    pub fn invalidate(&self, source_key: &str, source_type: SourceType) -> Result<()> {
        self.context.delete(&Self::hot_key(source_key, source_type))?;
        self.context.delete(&Self::cold_key(source_key, source_type))
    }

    pub fn stats(&self) -> &AdapterStats {
        &self.stats
    }

    pub fn context(&self) -> &Arc<CacheContext> {
        &self.context
    }

    /// Log a line per tuning hint
    pub fn log_recommendations(&self) {
        for hint in self.stats.recommendations() {
            tracing::info!("Cache tuning: {}", hint);
        }
    }

    fn load_hot(&self, source_key: &str, source_type: SourceType) -> Option<Vec<NewsItemHot>> {
        let key = Self::hot_key(source_key, source_type);
        match self.context.get(&key) {
            Ok(Some(bytes)) => deserialize_hot(&bytes)
                .map_err(|e| tracing::debug!("Discarding hot blob {}: {}", key, e))
                .ok(),
            Ok(None) => None,
            Err(e) => {
                tracing::debug!("Hot blob {} unavailable: {}", key, e);
                None
            }
        }
    }

    fn load_cold(
        &self,
        source_key: &str,
        source_type: SourceType,
    ) -> Option<(Vec<NewsItemCold>, MemoryPools)> {
        let key = Self::cold_key(source_key, source_type);
        match self.context.get(&key) {
            Ok(Some(bytes)) => deserialize_cold(&bytes, self.storage.string_pool_bytes)
                .map_err(|e| tracing::debug!("Discarding cold blob {}: {}", key, e))
                .ok(),
            Ok(None) => None,
            Err(e) => {
                tracing::debug!("Cold blob {} unavailable: {}", key, e);
                None
            }
        }
    }
}
