//! Storage Module
//!
//! Data-oriented record store split into hot and cold halves.
//!
//! ## Layout
//! ```text
//!   hot: [NewsItemHot; count]          cold: [NewsItemCold; appended]
//!   ┌───────┬────┬───┬──────┬──────┬───┐      ┌─────────────────────────┐
//!   │ score │ ts │ t │ h(t) │ h(u) │ i │ ───► │ title/summary/url/source │
//!   └───────┴────┴───┴──────┴──────┴───┘      │ StringRefs + meta slots  │
//!                                             └───────────┬─────────────┘
//!                                                         ▼
//!                                     StringPool + FixedSizePool per kind
//! ```
//!
//! Dedup, filter and sort run over the hot array only.

mod hot_cold;
mod item;
mod pools;

pub use hot_cold::{hash_str, DedupKey, HotColdNewsStorage};
pub use item::{
    ArticleInfo, ArticleMeta, CommunityPostInfo, CommunityPostMeta, NewsItemCold, NewsItemHot,
    NewsRecord, PaperInfo, PaperMeta, RepositoryInfo, RepositoryMeta, SourceType, VideoInfo,
    VideoMeta, NO_INDEX,
};
pub use pools::{MemoryPools, METADATA_POOL_SIZE};
