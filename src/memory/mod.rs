//! Memory Module
//!
//! Allocation-free recycling for the storage layer.
//!
//! ## Components
//! - `FixedSizePool<T, N>`: N preallocated slots, O(1) acquire/release
//!   through a free-list of indices, addressed by typed `PoolHandle`s
//! - `StringPool`: bump allocator for strings, addressed by `StringRef`
//!   (offset + length), reset wholesale between batches
//!
//! Neither type is synchronized; each storage instance owns its own pools.

mod fixed_pool;
mod string_pool;

pub use fixed_pool::{FixedSizePool, PoolHandle};
pub use string_pool::{StringPool, StringPoolStats, StringRef};
