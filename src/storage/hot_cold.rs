//! Hot/cold record storage
//!
//! Bulk operations (dedup, filter, sort) only move `NewsItemHot` records.
//! Each hot record carries the index of its cold record, so reordering or
//! compacting the hot array never touches the cold array.

use std::collections::HashSet;

use xxhash_rust::xxh3::xxh3_64;

use crate::config::StorageConfig;
use crate::error::{CacheError, Result};
use crate::memory::StringRef;

use super::item::{
    ArticleInfo, CommunityPostInfo, NewsItemCold, NewsItemHot, NewsRecord, PaperInfo,
    RepositoryInfo, VideoInfo, NO_INDEX,
};
use super::pools::MemoryPools;

/// What counts as a duplicate in `deduplicate_by`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupKey {
    /// Same title
    #[default]
    Title,
    /// Same title and same URL
    TitleAndUrl,
}

/// Data-oriented record store
///
/// ## Cold array policy
/// The cold array is append-only within a batch. Dedup and filter leave
/// cold records of dropped items orphaned; `compact_cold()` reclaims them
/// explicitly and `clear()` drops everything at a batch boundary.
///
/// Not synchronized: one instance per worker, merged by the caller.
#[derive(Debug)]
pub struct HotColdNewsStorage {
    hot: Vec<NewsItemHot>,
    cold: Vec<NewsItemCold>,
    pools: MemoryPools,
    capacity: usize,
}

impl HotColdNewsStorage {
    /// Create an empty storage with its own pools
    pub fn new(config: StorageConfig) -> Self {
        Self::with_pools(config.capacity, MemoryPools::new(config.string_pool_bytes))
    }

    pub fn with_pools(capacity: usize, pools: MemoryPools) -> Self {
        Self {
            hot: Vec::with_capacity(capacity),
            cold: Vec::with_capacity(capacity),
            pools,
            capacity,
        }
    }

    /// Reassemble a storage from restored parts
    ///
    /// Every hot record must address an existing cold record.
    pub fn from_parts(
        capacity: usize,
        hot: Vec<NewsItemHot>,
        cold: Vec<NewsItemCold>,
        pools: MemoryPools,
    ) -> Result<Self> {
        if cold.len() > capacity || hot.len() > capacity {
            return Err(CacheError::OutOfMemory(format!(
                "{} hot / {} cold records exceed capacity {}",
                hot.len(),
                cold.len(),
                capacity
            )));
        }
        if let Some(bad) = hot.iter().find(|h| h.cold_data_index as usize >= cold.len()) {
            return Err(CacheError::Serialization(format!(
                "hot record points at cold slot {} of {}",
                bad.cold_data_index,
                cold.len()
            )));
        }

        let mut storage = Self::with_pools(capacity, pools);
        storage.hot.extend(hot);
        storage.cold.extend(cold);
        Ok(storage)
    }

    // =========================================================================
    // Ingest
    // =========================================================================

    /// Split a record into hot and cold halves and append both
    ///
    /// Fails only on capacity: storage full, string pool full, or a
    /// metadata pool with no free slot. Room is checked before anything is
    /// interned, so a failed call leaves the arena and pools untouched.
    pub fn add_item(&mut self, record: &NewsRecord) -> Result<usize> {
        if self.cold.len() >= self.capacity {
            return Err(CacheError::OutOfMemory(format!(
                "storage full ({} records)",
                self.capacity
            )));
        }
        self.pools.ensure_room_for(record)?;

        let cold = self.intern(record)?;
        self.cold.push(cold);

        self.hot.push(NewsItemHot {
            relevance_score: record.relevance_score,
            timestamp: record.timestamp,
            source_type: record.source_type,
            title_hash: hash_str(&record.title),
            url_hash: hash_str(&record.url),
            cold_data_index: (self.cold.len() - 1) as u32,
        });

        Ok(self.hot.len())
    }

    fn intern(&mut self, record: &NewsRecord) -> Result<NewsItemCold> {
        let strings = &mut self.pools.strings;
        let mut cold = NewsItemCold {
            title: strings.alloc_string(&record.title)?,
            summary: strings.alloc_string(&record.summary)?,
            url: strings.alloc_string(&record.url)?,
            source: strings.alloc_string(&record.source)?,
            ..NewsItemCold::default()
        };

        if let Err(e) = self.intern_metadata(record, &mut cold) {
            // Give back slots taken before the failure
            self.pools.release_metadata(&cold);
            return Err(e);
        }

        Ok(cold)
    }

    fn intern_metadata(&mut self, record: &NewsRecord, cold: &mut NewsItemCold) -> Result<()> {
        if let Some(info) = &record.community {
            cold.community_index = self.pools.intern_community(info)?;
        }
        if let Some(info) = &record.video {
            cold.video_index = self.pools.intern_video(info)?;
        }
        if let Some(info) = &record.paper {
            cold.paper_index = self.pools.intern_paper(info)?;
        }
        if let Some(info) = &record.article {
            cold.article_index = self.pools.intern_article(info)?;
        }
        if let Some(info) = &record.repository {
            cold.repository_index = self.pools.intern_repository(info)?;
        }
        Ok(())
    }

    // =========================================================================
    // Bulk Operations (hot array only)
    // =========================================================================

    /// Drop items whose title was already seen, keeping the first
    pub fn deduplicate_hot(&mut self) -> usize {
        self.deduplicate_by(DedupKey::Title)
    }

    /// Single left-to-right pass keeping the first occurrence of each key
    pub fn deduplicate_by(&mut self, key: DedupKey) -> usize {
        let mut seen: HashSet<(u64, u64)> = HashSet::with_capacity(self.hot.len());

        // Vec::retain visits elements in order, exactly once
        self.hot.retain(|item| {
            let identity = match key {
                DedupKey::Title => (item.title_hash, 0),
                DedupKey::TitleAndUrl => (item.title_hash, item.url_hash),
            };
            seen.insert(identity)
        });

        self.hot.len()
    }

    /// Keep items with `relevance_score >= threshold`, preserving order
    pub fn filter_by_relevance_hot(&mut self, threshold: f32) -> usize {
        self.hot.retain(|item| item.relevance_score >= threshold);
        self.hot.len()
    }

    /// Newest first. Order among equal timestamps is unspecified.
    pub fn sort_by_timestamp(&mut self) {
        self.hot
            .sort_unstable_by(|a, b| b.timestamp.cmp(&a.timestamp));
    }

    /// Highest score first. Order among equal scores is unspecified.
    pub fn sort_by_relevance(&mut self) {
        self.hot
            .sort_unstable_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
    }

    /// Keep at most `n` items from the front of the hot array
    pub fn truncate(&mut self, n: usize) {
        self.hot.truncate(n);
    }

    // =========================================================================
    // Cold Maintenance
    // =========================================================================

    /// Drop cold records no hot record points at
    ///
    /// Rewrites `cold_data_index` for every surviving hot record and returns
    /// the metadata slots of dropped records to their pools. String bytes
    /// stay in the arena until `clear()`. Returns the number of cold records
    /// removed.
    pub fn compact_cold(&mut self) -> usize {
        let before = self.cold.len();
        let mut remap = vec![NO_INDEX; before];
        let mut compacted = Vec::with_capacity(self.capacity);

        for item in self.hot.iter_mut() {
            let old = item.cold_data_index as usize;
            if remap[old] == NO_INDEX {
                remap[old] = compacted.len() as u32;
                compacted.push(self.cold[old]);
            }
            item.cold_data_index = remap[old];
        }

        for (old, cold) in self.cold.iter().enumerate() {
            if remap[old] == NO_INDEX {
                self.pools.release_metadata(cold);
            }
        }

        self.cold = compacted;
        before - self.cold.len()
    }

    /// Drop everything and recycle the pools
    pub fn clear(&mut self) {
        self.hot.clear();
        self.cold.clear();
        self.pools.reset();
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    pub fn get_title(&self, cold: &NewsItemCold) -> &str {
        self.pools.text(cold.title)
    }

    pub fn get_summary(&self, cold: &NewsItemCold) -> &str {
        self.pools.text(cold.summary)
    }

    pub fn get_url(&self, cold: &NewsItemCold) -> &str {
        self.pools.text(cold.url)
    }

    pub fn get_source(&self, cold: &NewsItemCold) -> &str {
        self.pools.text(cold.source)
    }

    pub fn get_string(&self, string_ref: StringRef) -> Option<&str> {
        self.pools.get_string(string_ref)
    }

    /// Cold half of a hot record
    pub fn cold_for(&self, hot: &NewsItemHot) -> Option<&NewsItemCold> {
        self.cold.get(hot.cold_data_index as usize)
    }

    /// Rebuild the full record at position `index` of the hot array
    pub fn record(&self, index: usize) -> Option<NewsRecord> {
        let hot = self.hot.get(index)?;
        let cold = self.cold_for(hot)?;
        let pools = &self.pools;

        Some(NewsRecord {
            title: pools.text(cold.title).to_string(),
            summary: pools.text(cold.summary).to_string(),
            url: pools.text(cold.url).to_string(),
            source: pools.text(cold.source).to_string(),
            source_type: hot.source_type,
            relevance_score: hot.relevance_score,
            timestamp: hot.timestamp,
            community: pools.community(cold.community_index).map(|m| CommunityPostInfo {
                community: pools.text(m.community).to_string(),
                score: m.score,
                comment_count: m.comment_count,
            }),
            video: pools.video(cold.video_index).map(|m| VideoInfo {
                channel: pools.text(m.channel).to_string(),
                view_count: m.view_count,
                duration_secs: m.duration_secs,
            }),
            paper: pools.paper(cold.paper_index).map(|m| PaperInfo {
                authors: pools.text(m.authors).to_string(),
                paper_id: pools.text(m.paper_id).to_string(),
                citation_count: m.citation_count,
            }),
            article: pools.article(cold.article_index).map(|m| ArticleInfo {
                author: pools.text(m.author).to_string(),
                word_count: m.word_count,
            }),
            repository: pools.repository(cold.repository_index).map(|m| RepositoryInfo {
                language: pools.text(m.language).to_string(),
                stars: m.stars,
                forks: m.forks,
            }),
        })
    }

    /// All records in hot-array order
    pub fn records(&self) -> Vec<NewsRecord> {
        (0..self.hot.len()).filter_map(|i| self.record(i)).collect()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Live item count
    pub fn len(&self) -> usize {
        self.hot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hot.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn hot_items(&self) -> &[NewsItemHot] {
        &self.hot
    }

    pub fn cold_items(&self) -> &[NewsItemCold] {
        &self.cold
    }

    /// Cold records not reachable from the hot array
    pub fn orphaned_cold_count(&self) -> usize {
        let mut reachable = vec![false; self.cold.len()];
        for item in &self.hot {
            reachable[item.cold_data_index as usize] = true;
        }
        reachable.iter().filter(|r| !**r).count()
    }

    pub fn pools(&self) -> &MemoryPools {
        &self.pools
    }
}

/// 64-bit content hash used for dedup identity and cache keys
pub fn hash_str(s: &str) -> u64 {
    xxh3_64(s.as_bytes())
}
