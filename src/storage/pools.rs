//! Memory pools backing one storage instance
//!
//! One string arena plus one typed slot pool per metadata kind. Metadata
//! text lives in the same string arena as the item strings.

use crate::error::{CacheError, Result};
use crate::memory::{FixedSizePool, StringPool, StringRef};

use super::item::{
    ArticleInfo, ArticleMeta, CommunityPostInfo, CommunityPostMeta, NewsItemCold, NewsRecord,
    PaperInfo, PaperMeta, RepositoryInfo, RepositoryMeta, VideoInfo, VideoMeta, NO_INDEX,
};

/// Slots per metadata pool
pub const METADATA_POOL_SIZE: usize = 1024;

pub type CommunityPostPool = FixedSizePool<CommunityPostMeta, METADATA_POOL_SIZE>;
pub type VideoPool = FixedSizePool<VideoMeta, METADATA_POOL_SIZE>;
pub type PaperPool = FixedSizePool<PaperMeta, METADATA_POOL_SIZE>;
pub type ArticlePool = FixedSizePool<ArticleMeta, METADATA_POOL_SIZE>;
pub type RepositoryPool = FixedSizePool<RepositoryMeta, METADATA_POOL_SIZE>;

/// String arena and metadata pools
#[derive(Debug)]
pub struct MemoryPools {
    pub strings: StringPool,
    pub community_posts: CommunityPostPool,
    pub videos: VideoPool,
    pub papers: PaperPool,
    pub articles: ArticlePool,
    pub repositories: RepositoryPool,
}

impl MemoryPools {
    pub fn new(string_pool_bytes: usize) -> Self {
        Self::with_string_pool(StringPool::new(string_pool_bytes))
    }

    pub fn with_string_pool(strings: StringPool) -> Self {
        Self {
            strings,
            community_posts: FixedSizePool::new(),
            videos: FixedSizePool::new(),
            papers: FixedSizePool::new(),
            articles: FixedSizePool::new(),
            repositories: FixedSizePool::new(),
        }
    }

    /// Resolve a string handle
    pub fn get_string(&self, string_ref: StringRef) -> Option<&str> {
        self.strings.get_string(string_ref)
    }

    /// Resolve a string handle, falling back to "" for stale handles
    pub fn text(&self, string_ref: StringRef) -> &str {
        self.strings.get_string(string_ref).unwrap_or_default()
    }

    /// Recycle everything. Invalidates every handle issued so far.
    pub fn reset(&mut self) {
        self.strings.reset();
        self.community_posts.reset();
        self.videos.reset();
        self.papers.reset();
        self.articles.reset();
        self.repositories.reset();
    }

    // =========================================================================
    // Interning
    // =========================================================================

    pub fn intern_community(&mut self, info: &CommunityPostInfo) -> Result<u32> {
        let meta = CommunityPostMeta {
            community: self.strings.alloc_string(&info.community)?,
            score: info.score,
            comment_count: info.comment_count,
        };
        store(&mut self.community_posts, meta, "community_post")
    }

    pub fn intern_video(&mut self, info: &VideoInfo) -> Result<u32> {
        let meta = VideoMeta {
            channel: self.strings.alloc_string(&info.channel)?,
            view_count: info.view_count,
            duration_secs: info.duration_secs,
        };
        store(&mut self.videos, meta, "video")
    }

    pub fn intern_paper(&mut self, info: &PaperInfo) -> Result<u32> {
        let meta = PaperMeta {
            authors: self.strings.alloc_string(&info.authors)?,
            paper_id: self.strings.alloc_string(&info.paper_id)?,
            citation_count: info.citation_count,
        };
        store(&mut self.papers, meta, "paper")
    }

    pub fn intern_article(&mut self, info: &ArticleInfo) -> Result<u32> {
        let meta = ArticleMeta {
            author: self.strings.alloc_string(&info.author)?,
            word_count: info.word_count,
        };
        store(&mut self.articles, meta, "article")
    }

    pub fn intern_repository(&mut self, info: &RepositoryInfo) -> Result<u32> {
        let meta = RepositoryMeta {
            language: self.strings.alloc_string(&info.language)?,
            stars: info.stars,
            forks: info.forks,
        };
        store(&mut self.repositories, meta, "repository")
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    pub fn community(&self, index: u32) -> Option<&CommunityPostMeta> {
        lookup(&self.community_posts, index)
    }

    pub fn video(&self, index: u32) -> Option<&VideoMeta> {
        lookup(&self.videos, index)
    }

    pub fn paper(&self, index: u32) -> Option<&PaperMeta> {
        lookup(&self.papers, index)
    }

    pub fn article(&self, index: u32) -> Option<&ArticleMeta> {
        lookup(&self.articles, index)
    }

    pub fn repository(&self, index: u32) -> Option<&RepositoryMeta> {
        lookup(&self.repositories, index)
    }

    /// Check that a record fits before anything is interned
    pub fn ensure_room_for(&self, record: &NewsRecord) -> Result<()> {
        let requested = record.string_bytes();
        let available = self.strings.available();
        if requested > available {
            return Err(CacheError::StringPoolFull {
                requested,
                available,
            });
        }

        let full = [
            (record.community.is_some() && self.community_posts.is_full(), "community_post"),
            (record.video.is_some() && self.videos.is_full(), "video"),
            (record.paper.is_some() && self.papers.is_full(), "paper"),
            (record.article.is_some() && self.articles.is_full(), "article"),
            (record.repository.is_some() && self.repositories.is_full(), "repository"),
        ];
        match full.iter().find(|(is_full, _)| *is_full) {
            Some((_, kind)) => Err(CacheError::MetadataPoolExhausted { kind: *kind }),
            None => Ok(()),
        }
    }

    /// Return every metadata slot a cold record holds
    pub fn release_metadata(&mut self, cold: &NewsItemCold) {
        release(&mut self.community_posts, cold.community_index);
        release(&mut self.videos, cold.video_index);
        release(&mut self.papers, cold.paper_index);
        release(&mut self.articles, cold.article_index);
        release(&mut self.repositories, cold.repository_index);
    }

    /// Total occupied metadata slots across all pools
    pub fn metadata_in_use(&self) -> usize {
        self.community_posts.allocated_count()
            + self.videos.allocated_count()
            + self.papers.allocated_count()
            + self.articles.allocated_count()
            + self.repositories.allocated_count()
    }
}

fn store<T, const N: usize>(
    pool: &mut FixedSizePool<T, N>,
    value: T,
    kind: &'static str,
) -> Result<u32> {
    pool.acquire_with(value)
        .map(|handle| handle.index())
        .ok_or(CacheError::MetadataPoolExhausted { kind })
}

fn lookup<T, const N: usize>(pool: &FixedSizePool<T, N>, index: u32) -> Option<&T> {
    if index == NO_INDEX {
        return None;
    }
    pool.handle_at(index).and_then(|handle| pool.get(handle))
}

fn release<T, const N: usize>(pool: &mut FixedSizePool<T, N>, index: u32) {
    if index == NO_INDEX {
        return;
    }
    if let Some(handle) = pool.handle_at(index) {
        pool.release(handle);
    }
}
