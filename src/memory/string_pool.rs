//! String pool
//!
//! A fixed-capacity bump allocator for strings. Strings are addressed by
//! `StringRef` (offset + length) and are never freed individually; the whole
//! buffer is recycled with `reset()`.

use crate::error::{CacheError, Result};

/// Handle to a string inside one `StringPool`
///
/// Only meaningful for the buffer that issued it, and only until that
/// buffer's next `reset()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StringRef {
    pub offset: u32,
    pub length: u32,
}

impl StringRef {
    pub fn new(offset: u32, length: u32) -> Self {
        Self { offset, length }
    }

    /// One past the last byte
    pub fn end(&self) -> u64 {
        self.offset as u64 + self.length as u64
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

/// Allocation counters for capacity-health checks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StringPoolStats {
    /// Strings allocated since construction
    pub allocation_count: u64,
    /// Bytes allocated since construction
    pub bytes_allocated: u64,
    /// Highest `used` ever observed
    pub peak_usage: usize,
}

/// Bump-allocated string arena
pub struct StringPool {
    buffer: Box<[u8]>,
    used: usize,
    stats: StringPoolStats,
}

impl StringPool {
    /// Create a pool with `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0u8; capacity].into_boxed_slice(),
            used: 0,
            stats: StringPoolStats::default(),
        }
    }

    /// Rebuild a pool from previously exported bytes
    ///
    /// The restored bytes occupy `[0, bytes.len())`, so `StringRef`s issued
    /// against the original buffer resolve to the same strings.
    pub fn from_bytes(capacity: usize, bytes: &[u8]) -> Result<Self> {
        if bytes.len() > capacity {
            return Err(CacheError::StringPoolFull {
                requested: bytes.len(),
                available: capacity,
            });
        }

        let mut pool = Self::new(capacity);
        pool.buffer[..bytes.len()].copy_from_slice(bytes);
        pool.used = bytes.len();
        pool.stats.bytes_allocated = bytes.len() as u64;
        pool.stats.peak_usage = bytes.len();
        Ok(pool)
    }

    /// Copy a string into the pool
    ///
    /// Fails with `StringPoolFull` rather than truncating or growing, so
    /// every issued `StringRef` stays valid until `reset()`.
    pub fn alloc_string(&mut self, s: &str) -> Result<StringRef> {
        let bytes = s.as_bytes();
        let available = self.available();
        if bytes.len() > available {
            return Err(CacheError::StringPoolFull {
                requested: bytes.len(),
                available,
            });
        }

        let offset = self.used;
        self.buffer[offset..offset + bytes.len()].copy_from_slice(bytes);
        self.used += bytes.len();

        self.stats.allocation_count += 1;
        self.stats.bytes_allocated += bytes.len() as u64;
        self.stats.peak_usage = self.stats.peak_usage.max(self.used);

        Ok(StringRef::new(offset as u32, bytes.len() as u32))
    }

    /// Resolve a handle
    ///
    /// Returns `None` for handles outside the live region (e.g. issued
    /// before a `reset()` or by another pool).
    pub fn get_string(&self, string_ref: StringRef) -> Option<&str> {
        if string_ref.end() > self.used as u64 {
            return None;
        }
        let start = string_ref.offset as usize;
        let end = start + string_ref.length as usize;
        std::str::from_utf8(&self.buffer[start..end]).ok()
    }

    /// Discard every string. All outstanding `StringRef`s become invalid.
    pub fn reset(&mut self) {
        self.used = 0;
    }

    /// Live bytes, for persisting alongside the handles that point into them
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[..self.used]
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn available(&self) -> usize {
        self.buffer.len() - self.used
    }

    /// Fraction of capacity in use (0.0 - 1.0)
    pub fn utilization(&self) -> f64 {
        if self.buffer.is_empty() {
            return 1.0;
        }
        self.used as f64 / self.buffer.len() as f64
    }

    pub fn stats(&self) -> StringPoolStats {
        self.stats
    }
}

impl std::fmt::Debug for StringPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StringPool")
            .field("capacity", &self.buffer.len())
            .field("used", &self.used)
            .finish()
    }
}
