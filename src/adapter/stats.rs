//! Adapter hit/miss counters

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Hot hit rate below which a tuning hint is raised
pub const HOT_HIT_RATE_THRESHOLD: f64 = 0.5;

/// Cold hit rate below which a tuning hint is raised
pub const COLD_HIT_RATE_THRESHOLD: f64 = 0.3;

/// Lookups needed before hit rates are judged
pub const MIN_SAMPLES: u64 = 10;

/// Hit/miss counters, shared across threads
#[derive(Debug, Default)]
pub struct AdapterStats {
    hot_hits: AtomicU64,
    hot_misses: AtomicU64,
    cold_hits: AtomicU64,
    cold_misses: AtomicU64,
}

/// Point-in-time copy of `AdapterStats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub hot_hits: u64,
    pub hot_misses: u64,
    pub cold_hits: u64,
    pub cold_misses: u64,
}

/// Suggested adjustment when a hit rate is too low
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TuningHint {
    /// Hot blobs expire or get evicted too often
    RaiseHotTtl { hit_rate: f64 },
    /// Cold blobs expire or get evicted too often
    RaiseColdTtl { hit_rate: f64 },
}

impl fmt::Display for TuningHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TuningHint::RaiseHotTtl { hit_rate } => write!(
                f,
                "hot hit rate {:.1}% is below {:.0}%: raise the hot-data TTL or storage capacity",
                hit_rate * 100.0,
                HOT_HIT_RATE_THRESHOLD * 100.0
            ),
            TuningHint::RaiseColdTtl { hit_rate } => write!(
                f,
                "cold hit rate {:.1}% is below {:.0}%: raise the cold-data TTL or string pool size",
                hit_rate * 100.0,
                COLD_HIT_RATE_THRESHOLD * 100.0
            ),
        }
    }
}

impl AdapterStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hot(&self, hit: bool) {
        let counter = if hit { &self.hot_hits } else { &self.hot_misses };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cold(&self, hit: bool) {
        let counter = if hit { &self.cold_hits } else { &self.cold_misses };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hot_hits: self.hot_hits.load(Ordering::Relaxed),
            hot_misses: self.hot_misses.load(Ordering::Relaxed),
            cold_hits: self.cold_hits.load(Ordering::Relaxed),
            cold_misses: self.cold_misses.load(Ordering::Relaxed),
        }
    }

    pub fn hot_hit_rate(&self) -> f64 {
        self.snapshot().hot_hit_rate()
    }

    pub fn cold_hit_rate(&self) -> f64 {
        self.snapshot().cold_hit_rate()
    }

    pub fn recommendations(&self) -> Vec<TuningHint> {
        self.snapshot().recommendations()
    }

    pub fn reset(&self) {
        self.hot_hits.store(0, Ordering::Relaxed);
        self.hot_misses.store(0, Ordering::Relaxed);
        self.cold_hits.store(0, Ordering::Relaxed);
        self.cold_misses.store(0, Ordering::Relaxed);
    }
}

impl StatsSnapshot {
    pub fn hot_hit_rate(&self) -> f64 {
        ratio(self.hot_hits, self.hot_misses)
    }

    pub fn cold_hit_rate(&self) -> f64 {
        ratio(self.cold_hits, self.cold_misses)
    }

    /// Hints for every tier below its threshold with enough samples
    pub fn recommendations(&self) -> Vec<TuningHint> {
        let mut hints = Vec::new();

        if self.hot_hits + self.hot_misses >= MIN_SAMPLES {
            let hit_rate = self.hot_hit_rate();
            if hit_rate < HOT_HIT_RATE_THRESHOLD {
                hints.push(TuningHint::RaiseHotTtl { hit_rate });
            }
        }

        if self.cold_hits + self.cold_misses >= MIN_SAMPLES {
            let hit_rate = self.cold_hit_rate();
            if hit_rate < COLD_HIT_RATE_THRESHOLD {
                hints.push(TuningHint::RaiseColdTtl { hit_rate });
            }
        }

        hints
    }
}

fn ratio(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}
