//! Bounded fetch-through caching for Arbor.
//!
//! [`StatsCache`] is a least-recently-used cache that sits in front of a data
//! source it never sees directly: callers hand [`StatsCache::fetch`] a
//! fetcher and an existence check, and the cache keeps "present but null"
//! distinct from "absent" across the fetch boundary.
//!
//! Every lookup feeds a [`StatsCounter`]; [`CacheStats`] is the snapshot
//! type, with hit rate and average load penalty derived from the counters.

pub mod cache;
pub mod stats;

#[cfg(test)]
mod proptests;

pub use cache::{Fetched, StatsCache};
pub use stats::{CacheStats, ConcurrentStatsCounter, StatsCounter};
