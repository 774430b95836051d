//! Record types
//!
//! `NewsRecord` is what producers hand in. Storage splits it into a small
//! `NewsItemHot` (scanned in bulk) and a `NewsItemCold` (string handles and
//! metadata slots, touched only when rendering).

use serde::{Deserialize, Serialize};

use crate::memory::StringRef;

/// Sentinel for an absent metadata slot index
pub const NO_INDEX: u32 = u32::MAX;

// =============================================================================
// Source Type
// =============================================================================

/// Content source category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SourceType {
    Reddit = 0,
    HackerNews = 1,
    YouTube = 2,
    Research = 3,
    GitHub = 4,
    Rss = 5,
    Web = 6,
}

impl SourceType {
    pub const ALL: [SourceType; 7] = [
        SourceType::Reddit,
        SourceType::HackerNews,
        SourceType::YouTube,
        SourceType::Research,
        SourceType::GitHub,
        SourceType::Rss,
        SourceType::Web,
    ];

    pub fn from_u8(tag: u8) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }

    /// Cache key prefix ("reddit", "youtube", ...)
    pub fn prefix(&self) -> &'static str {
        match self {
            SourceType::Reddit => "reddit",
            SourceType::HackerNews => "hackernews",
            SourceType::YouTube => "youtube",
            SourceType::Research => "research",
            SourceType::GitHub => "github",
            SourceType::Rss => "rss",
            SourceType::Web => "web",
        }
    }
}

// =============================================================================
// Producer Input
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityPostInfo {
    pub community: String,
    pub score: i32,
    pub comment_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub channel: String,
    pub view_count: u64,
    pub duration_secs: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperInfo {
    pub authors: String,
    pub paper_id: String,
    pub citation_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleInfo {
    pub author: String,
    pub word_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    pub language: String,
    pub stars: u32,
    pub forks: u32,
}

/// A record as produced by a content source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsRecord {
    pub title: String,
    pub summary: String,
    pub url: String,
    /// Human-readable source name ("r/rust", "arXiv cs.DB", ...)
    pub source: String,
    pub source_type: SourceType,
    pub relevance_score: f32,
    /// Unix seconds
    pub timestamp: i64,
    pub community: Option<CommunityPostInfo>,
    pub video: Option<VideoInfo>,
    pub paper: Option<PaperInfo>,
    pub article: Option<ArticleInfo>,
    pub repository: Option<RepositoryInfo>,
}

impl NewsRecord {
    pub fn new(source_type: SourceType, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            summary: String::new(),
            url: url.into(),
            source: source_type.prefix().to_string(),
            source_type,
            relevance_score: 0.0,
            timestamp: 0,
            community: None,
            video: None,
            paper: None,
            article: None,
            repository: None,
        }
    }

    /// Bytes this record takes in a string arena, metadata text included
    pub fn string_bytes(&self) -> usize {
        let mut total = self.title.len() + self.summary.len() + self.url.len() + self.source.len();
        if let Some(info) = &self.community {
            total += info.community.len();
        }
        if let Some(info) = &self.video {
            total += info.channel.len();
        }
        if let Some(info) = &self.paper {
            total += info.authors.len() + info.paper_id.len();
        }
        if let Some(info) = &self.article {
            total += info.author.len();
        }
        if let Some(info) = &self.repository {
            total += info.language.len();
        }
        total
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.relevance_score = score;
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_community(mut self, info: CommunityPostInfo) -> Self {
        self.community = Some(info);
        self
    }

    pub fn with_video(mut self, info: VideoInfo) -> Self {
        self.video = Some(info);
        self
    }

    pub fn with_paper(mut self, info: PaperInfo) -> Self {
        self.paper = Some(info);
        self
    }

    pub fn with_article(mut self, info: ArticleInfo) -> Self {
        self.article = Some(info);
        self
    }

    pub fn with_repository(mut self, info: RepositoryInfo) -> Self {
        self.repository = Some(info);
        self
    }
}

// =============================================================================
// Pooled Metadata
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommunityPostMeta {
    pub community: StringRef,
    pub score: i32,
    pub comment_count: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VideoMeta {
    pub channel: StringRef,
    pub view_count: u64,
    pub duration_secs: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaperMeta {
    pub authors: StringRef,
    pub paper_id: StringRef,
    pub citation_count: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArticleMeta {
    pub author: StringRef,
    pub word_count: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepositoryMeta {
    pub language: StringRef,
    pub stars: u32,
    pub forks: u32,
}

// =============================================================================
// Hot / Cold Records
// =============================================================================

/// Fields touched by dedup, filter and sort
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct NewsItemHot {
    pub relevance_score: f32,
    pub timestamp: i64,
    pub source_type: SourceType,
    pub title_hash: u64,
    pub url_hash: u64,
    /// Slot in the cold array holding this item's strings
    pub cold_data_index: u32,
}

/// Fields touched only when an item is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewsItemCold {
    pub title: StringRef,
    pub summary: StringRef,
    pub url: StringRef,
    pub source: StringRef,
    pub community_index: u32,
    pub video_index: u32,
    pub paper_index: u32,
    pub article_index: u32,
    pub repository_index: u32,
}

impl Default for NewsItemCold {
    fn default() -> Self {
        Self {
            title: StringRef::default(),
            summary: StringRef::default(),
            url: StringRef::default(),
            source: StringRef::default(),
            community_index: NO_INDEX,
            video_index: NO_INDEX,
            paper_index: NO_INDEX,
            article_index: NO_INDEX,
            repository_index: NO_INDEX,
        }
    }
}

impl NewsItemCold {
    /// The five metadata slot indices, in pool order
    pub fn metadata_indices(&self) -> [u32; 5] {
        [
            self.community_index,
            self.video_index,
            self.paper_index,
            self.article_index,
            self.repository_index,
        ]
    }
}
