//! Cache Module
//!
//! TTL-aware key/value caching over a pluggable backend.
//!
//! ## Components
//! - `CacheEntry`: binary envelope (timestamp, TTL, source, content hash)
//! - `CacheBackend`: storage target (in-memory map or cache server)
//! - `CacheContext`: backend + TTL table, injected where caching is needed

mod backend;
mod context;
mod entry;

pub use backend::{CacheBackend, MemoryBackend, RemoteBackend};
pub use context::CacheContext;
pub use entry::{unix_now, CacheEntry, ENVELOPE_HEADER_SIZE};

use xxhash_rust::xxh3::xxh3_64;

/// Namespaced key: `"{prefix}:{16 hex digits}"`
pub fn cache_key(prefix: &str, identifier: &str) -> String {
    let hash = xxh3_64(format!("{}:{}", prefix, identifier).as_bytes());
    format!("{}:{:016x}", prefix, hash)
}
