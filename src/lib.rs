//! # newscache
//!
//! Caching and hot/cold storage for aggregated news records:
//! - Binary wire protocol and pooled blocking client for a cache server
//! - Fixed-size slot pools and a bump-allocated string arena
//! - Hot/cold record storage with dedup, filter and sort over compact records
//! - TTL-aware cache context with in-memory fallback
//! - Adapter persisting hot/cold storage as checksummed binary blobs
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       CacheAdapter                          │
//! │          (hot/cold blobs, hit/miss statistics)              │
//! └──────────────┬───────────────────────────────┬──────────────┘
//!                │                               │
//!                ▼                               ▼
//! ┌──────────────────────────┐     ┌──────────────────────────────┐
//! │       CacheContext       │     │      HotColdNewsStorage      │
//! │   (TTL, entry envelope)  │     │  hot[] ──► cold[] ──► pools  │
//! └─────────────┬────────────┘     └──────────────────────────────┘
//!               │
//!      ┌────────┴─────────┐
//!      ▼                  ▼
//! ┌──────────┐    ┌────────────────┐        ┌──────────────────┐
//! │  Memory  │    │  CacheClient   │  TCP   │   Cache Server   │
//! │ Backend  │    │ ConnectionPool │ ─────► │  (network::*)    │
//! └──────────┘    └────────────────┘        └──────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod adapter;
pub mod cache;
pub mod client;
pub mod memory;
pub mod network;
pub mod protocol;
pub mod storage;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use adapter::CacheAdapter;
pub use cache::{CacheContext, CacheEntry};
pub use client::{CacheClient, ConnectionPool};
pub use config::{BackendKind, CacheKind, Config, ConnectionMode};
pub use error::{CacheError, Result};
pub use storage::{HotColdNewsStorage, NewsRecord, SourceType};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of newscache
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
