//! Cache statistics: the recording trait, a lock-free recorder, and the
//! snapshot it produces.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Point-in-time copy of a cache's counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that had to consult the fetcher.
    pub misses: u64,
    /// Fetches that produced a value or confirmed a null mapping.
    pub load_successes: u64,
    /// Fetches that found nothing or returned an error.
    pub load_failures: u64,
    /// Time spent inside fetchers and existence checks, in nanoseconds.
    pub total_load_nanos: u64,
    /// Entries dropped to make room for new ones.
    pub evictions: u64,
}

impl CacheStats {
    pub fn requests(&self) -> u64 {
        self.hits + self.misses
    }

    /// Fraction of lookups served from the cache. `1.0` when there have been
    /// no lookups.
    pub fn hit_rate(&self) -> f64 {
        let total = self.requests();
        if total == 0 {
            1.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn miss_rate(&self) -> f64 {
        let total = self.requests();
        if total == 0 {
            0.0
        } else {
            self.misses as f64 / total as f64
        }
    }

    /// Mean time per load attempt.
    pub fn average_load_penalty(&self) -> Duration {
        let loads = self.load_successes + self.load_failures;
        if loads == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(self.total_load_nanos / loads)
        }
    }

    pub fn total_load_time(&self) -> Duration {
        Duration::from_nanos(self.total_load_nanos)
    }
}

/// Sink for cache events. Implementations must tolerate concurrent calls.
pub trait StatsCounter: Send + Sync {
    fn record_hits(&self, count: u64);

    fn record_misses(&self, count: u64);

    fn record_load_success(&self, load_time: Duration);

    fn record_load_failure(&self, load_time: Duration);

    fn record_eviction(&self);

    fn snapshot(&self) -> CacheStats;
}

/// Atomic counters, the default recorder.
#[derive(Debug, Default)]
pub struct ConcurrentStatsCounter {
    hits: AtomicU64,
    misses: AtomicU64,
    load_successes: AtomicU64,
    load_failures: AtomicU64,
    total_load_nanos: AtomicU64,
    evictions: AtomicU64,
}

impl ConcurrentStatsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero every counter.
    pub fn reset(&self) {
        for counter in [
            &self.hits,
            &self.misses,
            &self.load_successes,
            &self.load_failures,
            &self.total_load_nanos,
            &self.evictions,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

fn saturating_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

impl StatsCounter for ConcurrentStatsCounter {
    fn record_hits(&self, count: u64) {
        self.hits.fetch_add(count, Ordering::Relaxed);
    }

    fn record_misses(&self, count: u64) {
        self.misses.fetch_add(count, Ordering::Relaxed);
    }

    fn record_load_success(&self, load_time: Duration) {
        self.load_successes.fetch_add(1, Ordering::Relaxed);
        self.total_load_nanos
            .fetch_add(saturating_nanos(load_time), Ordering::Relaxed);
    }

    fn record_load_failure(&self, load_time: Duration) {
        self.load_failures.fetch_add(1, Ordering::Relaxed);
        self.total_load_nanos
            .fetch_add(saturating_nanos(load_time), Ordering::Relaxed);
    }

    fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            load_successes: self.load_successes.load(Ordering::Relaxed),
            load_failures: self.load_failures.load(Ordering::Relaxed),
            total_load_nanos: self.total_load_nanos.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stats_rates() {
        let stats = CacheStats::default();
        assert_eq!(stats.hit_rate(), 1.0);
        assert_eq!(stats.miss_rate(), 0.0);
        assert_eq!(stats.average_load_penalty(), Duration::ZERO);
    }

    #[test]
    fn counter_accumulates() {
        let counter = ConcurrentStatsCounter::new();
        counter.record_hits(3);
        counter.record_misses(1);
        counter.record_load_success(Duration::from_nanos(300));
        counter.record_load_failure(Duration::from_nanos(100));
        counter.record_eviction();

        let stats = counter.snapshot();
        assert_eq!(stats.hits, 3);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.requests(), 4);
        assert_eq!(stats.hit_rate(), 0.75);
        assert_eq!(stats.load_successes, 1);
        assert_eq!(stats.load_failures, 1);
        assert_eq!(stats.average_load_penalty(), Duration::from_nanos(200));
        assert_eq!(stats.total_load_time(), Duration::from_nanos(400));
        assert_eq!(stats.evictions, 1);
    }

    #[test]
    fn counter_reset() {
        let counter = ConcurrentStatsCounter::new();
        counter.record_hits(5);
        counter.record_eviction();
        counter.reset();
        assert_eq!(counter.snapshot(), CacheStats::default());
    }

    #[test]
    fn stats_serde_roundtrip() {
        let stats = CacheStats {
            hits: 1,
            misses: 2,
            load_successes: 3,
            load_failures: 4,
            total_load_nanos: 5,
            evictions: 6,
        };
        let json = serde_json::to_string(&stats).unwrap();
        let back: CacheStats = serde_json::from_str(&json).unwrap();
        assert_eq!(stats, back);
    }
}
