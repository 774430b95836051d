//! Tests for CacheAdapter
//!
//! These tests verify:
//! - Hot/cold storage survives a cache round trip with its strings and metadata
//! - Partial or corrupt blobs are misses, never partial storages
//! - Hit/miss counters and tuning hints

use std::sync::Arc;

use newscache::adapter::{serialize_cold, serialize_hot, CacheAdapter, TuningHint};
use newscache::cache::CacheContext;
use newscache::config::{BackendKind, CacheKind, Config, StorageConfig};
use newscache::storage::{
    ArticleInfo, CommunityPostInfo, HotColdNewsStorage, NewsRecord, PaperInfo, SourceType,
};

// =============================================================================
// Helper Functions
// =============================================================================

const STORAGE: StorageConfig = StorageConfig {
    capacity: 128,
    string_pool_bytes: 64 * 1024,
};

fn adapter() -> CacheAdapter {
    let config = Config::builder().backend(BackendKind::Memory).build();
    CacheAdapter::new(Arc::new(CacheContext::in_memory(&config)), STORAGE)
}

fn populated_storage() -> HotColdNewsStorage {
    let mut storage = HotColdNewsStorage::new(STORAGE);
    storage
        .add_item(
            &NewsRecord::new(SourceType::Reddit, "Borrow checker tips", "https://r.example/1")
                .with_summary("thread about lifetimes")
                .with_score(0.9)
                .with_timestamp(300)
                .with_community(CommunityPostInfo {
                    community: "rust".to_string(),
                    score: 420,
                    comment_count: 69,
                }),
        )
        .unwrap();
    storage
        .add_item(
            &NewsRecord::new(SourceType::Reddit, "Low effort", "https://r.example/2")
                .with_score(0.1)
                .with_timestamp(200),
        )
        .unwrap();
    storage
        .add_item(
            &NewsRecord::new(SourceType::Reddit, "Async deep dive", "https://r.example/3")
                .with_score(0.8)
                .with_timestamp(100)
                .with_paper(PaperInfo {
                    authors: "Ferris".to_string(),
                    paper_id: "2402.12345".to_string(),
                    citation_count: 3,
                })
                .with_article(ArticleInfo {
                    author: "Ferris".to_string(),
                    word_count: 5_000,
                }),
        )
        .unwrap();
    storage
}

// =============================================================================
// Round Trip Tests
// =============================================================================

#[test]
fn test_round_trip_restores_records() {
    let adapter = adapter();
    let storage = populated_storage();

    adapter
        .cache_hot_cold_data("r/rust", SourceType::Reddit, &storage)
        .unwrap();
    let restored = adapter
        .load_cached_hot_cold_data("r/rust", SourceType::Reddit)
        .expect("both blobs cached");

    assert_eq!(restored.records(), storage.records());
    assert_eq!(restored.hot_items(), storage.hot_items());
    assert_eq!(restored.pools().metadata_in_use(), 3);
}

#[test]
fn test_round_trip_after_filter_and_sort() {
    let adapter = adapter();
    let mut storage = populated_storage();
    storage.filter_by_relevance_hot(0.5);
    storage.sort_by_timestamp();

    adapter
        .cache_hot_cold_data("r/rust", SourceType::Reddit, &storage)
        .unwrap();
    let restored = adapter
        .load_cached_hot_cold_data("r/rust", SourceType::Reddit)
        .unwrap();

    let titles: Vec<String> = restored.records().into_iter().map(|r| r.title).collect();
    assert_eq!(titles, vec!["Borrow checker tips", "Async deep dive"]);
    assert_eq!(restored.orphaned_cold_count(), 1);
}

#[test]
fn test_restored_storage_is_writable() {
    let adapter = adapter();
    adapter
        .cache_hot_cold_data("feed", SourceType::Reddit, &populated_storage())
        .unwrap();

    let mut restored = adapter
        .load_cached_hot_cold_data("feed", SourceType::Reddit)
        .unwrap();
    restored
        .add_item(&NewsRecord::new(SourceType::Reddit, "Fresh", "https://r.example/4"))
        .unwrap();

    assert_eq!(restored.len(), 4);
    assert_eq!(restored.record(3).unwrap().title, "Fresh");
    assert_eq!(restored.record(0).unwrap().title, "Borrow checker tips");
}

#[test]
fn test_empty_storage_round_trip() {
    let adapter = adapter();
    let storage = HotColdNewsStorage::new(STORAGE);

    adapter
        .cache_hot_cold_data("empty", SourceType::Web, &storage)
        .unwrap();
    let restored = adapter
        .load_cached_hot_cold_data("empty", SourceType::Web)
        .unwrap();
    assert!(restored.is_empty());
}

// =============================================================================
// Miss Tests
// =============================================================================

#[test]
fn test_nothing_cached_is_miss() {
    let adapter = adapter();
    assert!(adapter
        .load_cached_hot_cold_data("unknown", SourceType::GitHub)
        .is_none());

    let snapshot = adapter.stats().snapshot();
    assert_eq!(snapshot.hot_misses, 1);
    assert_eq!(snapshot.cold_misses, 1);
}

#[test]
fn test_hot_without_cold_is_miss() {
    let adapter = adapter();
    let storage = populated_storage();

    let hot_key = CacheAdapter::hot_key("partial", SourceType::Reddit);
    adapter
        .context()
        .put(&hot_key, serialize_hot(storage.hot_items()), CacheKind::HotData, 0)
        .unwrap();

    assert!(adapter
        .load_cached_hot_cold_data("partial", SourceType::Reddit)
        .is_none());

    let snapshot = adapter.stats().snapshot();
    assert_eq!(snapshot.hot_hits, 1);
    assert_eq!(snapshot.cold_misses, 1);
}

#[test]
fn test_cold_without_hot_is_miss() {
    let adapter = adapter();
    let storage = populated_storage();

    let cold_key = CacheAdapter::cold_key("partial", SourceType::Reddit);
    let blob = serialize_cold(storage.cold_items(), storage.pools());
    adapter
        .context()
        .put(&cold_key, blob, CacheKind::ColdData, 0)
        .unwrap();

    assert!(adapter
        .load_cached_hot_cold_data("partial", SourceType::Reddit)
        .is_none());
}

#[test]
fn test_corrupt_cold_blob_is_miss() {
    let adapter = adapter();
    let storage = populated_storage();
    adapter
        .cache_hot_cold_data("feed", SourceType::Reddit, &storage)
        .unwrap();

    let cold_key = CacheAdapter::cold_key("feed", SourceType::Reddit);
    let mut blob = adapter.context().get(&cold_key).unwrap().unwrap();
    let middle = blob.len() / 2;
    blob[middle] ^= 0xFF;
    adapter
        .context()
        .put(&cold_key, blob, CacheKind::ColdData, 0)
        .unwrap();

    assert!(adapter
        .load_cached_hot_cold_data("feed", SourceType::Reddit)
        .is_none());
    assert_eq!(adapter.stats().snapshot().cold_misses, 1);
}

#[test]
fn test_mismatched_blobs_are_miss() {
    let adapter = adapter();
    let big = populated_storage();
    let small = HotColdNewsStorage::new(STORAGE);

    // Hot records pointing past the end of the cold array
    let tag = SourceType::Reddit as u8;
    adapter
        .context()
        .put(
            &CacheAdapter::hot_key("mixed", SourceType::Reddit),
            serialize_hot(big.hot_items()),
            CacheKind::HotData,
            tag,
        )
        .unwrap();
    adapter
        .context()
        .put(
            &CacheAdapter::cold_key("mixed", SourceType::Reddit),
            serialize_cold(small.cold_items(), small.pools()),
            CacheKind::ColdData,
            tag,
        )
        .unwrap();

    assert!(adapter
        .load_cached_hot_cold_data("mixed", SourceType::Reddit)
        .is_none());
}

#[test]
fn test_invalidate() {
    let adapter = adapter();
    adapter
        .cache_hot_cold_data("feed", SourceType::Reddit, &populated_storage())
        .unwrap();
    adapter.invalidate("feed", SourceType::Reddit).unwrap();

    assert!(adapter
        .load_cached_hot_cold_data("feed", SourceType::Reddit)
        .is_none());
}

// =============================================================================
// Key Tests
// =============================================================================

#[test]
fn test_keys_are_distinct_per_tier_and_source() {
    let hot = CacheAdapter::hot_key("feed", SourceType::Reddit);
    let cold = CacheAdapter::cold_key("feed", SourceType::Reddit);
    let other = CacheAdapter::hot_key("feed", SourceType::YouTube);

    assert!(hot.starts_with("reddit_hot:"));
    assert!(cold.starts_with("reddit_cold:"));
    assert!(other.starts_with("youtube_hot:"));
    assert_ne!(hot, cold);
    assert_eq!(hot.len(), "reddit_hot:".len() + 16);
}

#[test]
fn test_blobs_cached_with_tier_ttls() {
    let adapter = adapter();
    adapter
        .cache_hot_cold_data("feed", SourceType::Reddit, &populated_storage())
        .unwrap();

    let context = adapter.context();
    let hot = context
        .get_entry(&CacheAdapter::hot_key("feed", SourceType::Reddit))
        .unwrap()
        .unwrap();
    let cold = context
        .get_entry(&CacheAdapter::cold_key("feed", SourceType::Reddit))
        .unwrap()
        .unwrap();

    assert_eq!(hot.ttl_seconds, 7_200);
    assert_eq!(cold.ttl_seconds, 28_800);
    assert_eq!(hot.source_type, SourceType::Reddit as u8);
}

// =============================================================================
// Stats Tests
// =============================================================================

#[test]
fn test_low_hit_rate_produces_hints() {
    let adapter = adapter();
    for i in 0..10 {
        adapter.load_cached_hot_cold_data(&format!("miss-{}", i), SourceType::Rss);
    }

    let hints = adapter.stats().recommendations();
    assert_eq!(hints.len(), 2);
    assert!(matches!(hints[0], TuningHint::RaiseHotTtl { hit_rate } if hit_rate == 0.0));
    assert!(matches!(hints[1], TuningHint::RaiseColdTtl { .. }));
}
