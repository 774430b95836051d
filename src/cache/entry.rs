//! Cache entry envelope
//!
//! ## Format (big-endian)
//! ```text
//! ┌──────────┬──────────┬──────────┬──────────┬──────────┬───────────┐
//! │ ts (8)   │ ttl (4)  │ src (1)  │ hash (8) │ len (4)  │ content   │
//! └──────────┴──────────┴──────────┴──────────┴──────────┴───────────┘
//! ```
//!
//! Entries are immutable; an update is a full replace.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{Buf, BufMut};
use xxhash_rust::xxh3::xxh3_64;

use crate::error::{CacheError, Result};

/// Envelope header size: 8 + 4 + 1 + 8 + 4
pub const ENVELOPE_HEADER_SIZE: usize = 25;

/// Current unix time in seconds
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// A cached payload with its expiry metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub content: Vec<u8>,
    /// Unix seconds at write time
    pub timestamp: i64,
    pub ttl_seconds: u32,
    pub source_type: u8,
    /// xxh3-64 of `content`
    pub content_hash: u64,
}

impl CacheEntry {
    /// Entry stamped with the current time
    pub fn new(content: Vec<u8>, ttl_seconds: u32, source_type: u8) -> Self {
        Self::with_timestamp(content, unix_now(), ttl_seconds, source_type)
    }

    pub fn with_timestamp(content: Vec<u8>, timestamp: i64, ttl_seconds: u32, source_type: u8) -> Self {
        let content_hash = xxh3_64(&content);
        Self {
            content,
            timestamp,
            ttl_seconds,
            source_type,
            content_hash,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(unix_now())
    }

    /// Expired once strictly more than `ttl_seconds` have passed
    pub fn is_expired_at(&self, now: i64) -> bool {
        now.saturating_sub(self.timestamp) > self.ttl_seconds as i64
    }

    /// Seconds left before expiry (0 once expired)
    pub fn remaining_ttl(&self, now: i64) -> u64 {
        let deadline = self.timestamp.saturating_add(self.ttl_seconds as i64);
        deadline.saturating_sub(now).max(0) as u64
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(ENVELOPE_HEADER_SIZE + self.content.len());
        buf.put_i64(self.timestamp);
        buf.put_u32(self.ttl_seconds);
        buf.put_u8(self.source_type);
        buf.put_u64(self.content_hash);
        buf.put_u32(self.content.len() as u32);
        buf.put_slice(&self.content);
        buf
    }

    /// Parse an envelope, checking length and content hash
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < ENVELOPE_HEADER_SIZE {
            return Err(CacheError::Serialization(format!(
                "Cache entry too short: {} bytes",
                bytes.len()
            )));
        }

        let mut buf = bytes;
        let timestamp = buf.get_i64();
        let ttl_seconds = buf.get_u32();
        let source_type = buf.get_u8();
        let content_hash = buf.get_u64();
        let content_len = buf.get_u32() as usize;

        if buf.remaining() != content_len {
            return Err(CacheError::Serialization(format!(
                "Cache entry declares {} content bytes, has {}",
                content_len,
                buf.remaining()
            )));
        }

        let content = buf.to_vec();
        if xxh3_64(&content) != content_hash {
            return Err(CacheError::Serialization(
                "Cache entry content hash mismatch".to_string(),
            ));
        }

        Ok(Self {
            content,
            timestamp,
            ttl_seconds,
            source_type,
            content_hash,
        })
    }
}
