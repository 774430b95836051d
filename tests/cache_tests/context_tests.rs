//! Tests for CacheContext
//!
//! These tests verify:
//! - Backend selection and fallback to memory
//! - TTL assignment per cache kind
//! - Lazy removal of expired entries
//! - Typed records through bincode

use std::net::{SocketAddr, TcpListener};

use serde::{Deserialize, Serialize};

use newscache::cache::{cache_key, CacheBackend, CacheContext, CacheEntry, MemoryBackend};
use newscache::config::{BackendKind, CacheKind, Config, ServerConfig, TtlPolicy};
use newscache::network::{Server, ServerHandle};
use newscache::storage::{NewsRecord, SourceType, VideoInfo};

// =============================================================================
// Helper Functions
// =============================================================================

fn start_server() -> (SocketAddr, ServerHandle) {
    let server = Server::bind(ServerConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        max_connections: 16,
    })
    .unwrap();
    let (addr, handle, _join) = server.spawn().unwrap();
    (addr, handle)
}

fn memory_context() -> CacheContext {
    let config = Config::builder().backend(BackendKind::Memory).build();
    CacheContext::in_memory(&config)
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Summary {
    headline: String,
    points: Vec<String>,
    score: f32,
}

// =============================================================================
// Backend Selection Tests
// =============================================================================

#[test]
fn test_memory_backend_selected() {
    let config = Config::builder().backend(BackendKind::Memory).build();
    let context = CacheContext::connect(&config).unwrap();

    assert_eq!(context.backend_name(), "memory");
    assert!(!context.is_degraded());
}

#[test]
fn test_remote_backend_selected() {
    let (addr, server) = start_server();
    let config = Config::builder()
        .host(addr.ip().to_string())
        .port(addr.port())
        .backend(BackendKind::Remote)
        .build();
    let context = CacheContext::connect(&config).unwrap();

    assert_eq!(context.backend_name(), "remote");
    context.put("k", b"remote value".to_vec(), CacheKind::Search, 0).unwrap();
    assert_eq!(context.get("k").unwrap(), Some(b"remote value".to_vec()));

    context.shutdown();
    server.shutdown();
}

#[test]
fn test_unreachable_server_falls_back_to_memory() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = Config::builder()
        .host("127.0.0.1")
        .port(port)
        .timeout_ms(500)
        .backend(BackendKind::Remote)
        .build();

    let context = CacheContext::connect(&config).unwrap();
    assert_eq!(context.backend_name(), "memory");
    assert!(context.is_degraded());

    context.put("k", b"v".to_vec(), CacheKind::Content, 0).unwrap();
    assert_eq!(context.get("k").unwrap(), Some(b"v".to_vec()));
}

// =============================================================================
// TTL Tests
// =============================================================================

#[test]
fn test_put_uses_kind_ttl() {
    let context = memory_context();
    context.put("llm", b"answer".to_vec(), CacheKind::Llm, 3).unwrap();

    let entry = context.get_entry("llm").unwrap().unwrap();
    assert_eq!(entry.ttl_seconds, 3_600);
    assert_eq!(entry.source_type, 3);
    assert_eq!(entry.content, b"answer".to_vec());
}

#[test]
fn test_custom_ttl_policy() {
    let ttl = TtlPolicy {
        search: 5,
        ..TtlPolicy::default()
    };
    let context = CacheContext::with_backend(Box::new(MemoryBackend::new()), ttl);
    context.put("q", b"results".to_vec(), CacheKind::Search, 0).unwrap();

    assert_eq!(context.get_entry("q").unwrap().unwrap().ttl_seconds, 5);
    assert_eq!(context.ttl_policy().search, 5);
}

#[test]
fn test_expired_entry_is_a_miss_and_removed() {
    let context = memory_context();
    let stale = CacheEntry::with_timestamp(b"old".to_vec(), 1_000, 60, 0);
    context.put_entry("stale", &stale).unwrap();

    assert_eq!(context.get("stale").unwrap(), None);
    assert!(!context.exists("stale").unwrap());
}

#[test]
fn test_delete() {
    let context = memory_context();
    context.put("k", b"v".to_vec(), CacheKind::Content, 0).unwrap();
    context.delete("k").unwrap();

    assert_eq!(context.get("k").unwrap(), None);
}

#[test]
fn test_put_many() {
    let context = memory_context();
    let items = vec![
        ("a".to_string(), b"1".to_vec()),
        ("b".to_string(), b"2".to_vec()),
    ];
    context.put_many(items, CacheKind::Analysis, 0).unwrap();

    assert_eq!(context.get("a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(context.get_entry("b").unwrap().unwrap().ttl_seconds, 21_600);
}

#[test]
fn test_memory_backend_purge() {
    let backend = MemoryBackend::new();
    backend
        .put("old", &CacheEntry::with_timestamp(b"x".to_vec(), 0, 10, 0))
        .unwrap();
    backend
        .put("new", &CacheEntry::with_timestamp(b"y".to_vec(), 100, 10, 0))
        .unwrap();

    assert_eq!(backend.purge_expired(105), 1);
    assert_eq!(backend.len(), 1);
    assert!(backend.exists("new").unwrap());
}

// =============================================================================
// Typed Record Tests
// =============================================================================

#[test]
fn test_serialized_round_trip() {
    let context = memory_context();
    let summary = Summary {
        headline: "Rust ships".to_string(),
        points: vec!["fast".to_string(), "safe".to_string()],
        score: 0.75,
    };

    context
        .put_serialized("summary:1", &summary, CacheKind::Analysis)
        .unwrap();
    let loaded: Option<Summary> = context.get_deserialized("summary:1").unwrap();
    assert_eq!(loaded, Some(summary));

    let missing: Option<Summary> = context.get_deserialized("summary:2").unwrap();
    assert_eq!(missing, None);
}

#[test]
fn test_news_record_serialized() {
    let context = memory_context();
    let records = vec![
        NewsRecord::new(SourceType::YouTube, "Talk", "https://video.example/1").with_video(
            VideoInfo {
                channel: "conf".to_string(),
                view_count: 42,
                duration_secs: 1_800,
            },
        ),
        NewsRecord::new(SourceType::Rss, "Post", "https://blog.example/2").with_score(0.6),
    ];

    let key = cache_key("content", "feed-batch-1");
    context.put_serialized(&key, &records, CacheKind::Content).unwrap();

    let loaded: Vec<NewsRecord> = context.get_deserialized(&key).unwrap().unwrap();
    assert_eq!(loaded, records);
}

#[test]
fn test_garbage_fails_deserialization() {
    let context = memory_context();
    context.put("junk", vec![0xFF; 3], CacheKind::Content, 0).unwrap();

    let result: newscache::Result<Option<Summary>> = context.get_deserialized("junk");
    assert!(result.is_err());
}
