//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, evictions,
//! and hygiene counters for purged records.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Live counters for one cache.
///
/// Counters are atomics so the cache records through `&self` from any task;
/// relaxed ordering is enough for monotonic event counts.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    purged_expired: AtomicU64,
    purged_malformed: AtomicU64,
    store_errors: AtomicU64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Record Hit ==
    /// Increments the hit counter.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Miss ==
    /// Increments the miss counter.
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Eviction ==
    /// Increments the eviction counter.
    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Purges ==
    /// Increments the expired-record purge counter.
    pub fn record_purged_expired(&self) {
        self.purged_expired.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the malformed-record purge counter.
    pub fn record_purged_malformed(&self) {
        self.purged_malformed.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Store Error ==
    /// Increments the store failure counter.
    pub fn record_store_error(&self) {
        self.store_errors.fetch_add(1, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Takes a point-in-time copy of every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            purged_expired: self.purged_expired.load(Ordering::Relaxed),
            purged_malformed: self.purged_malformed.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
        }
    }
}

// == Stats Snapshot ==
/// Point-in-time view of [`CacheStats`], serializable for reporting.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatsSnapshot {
    /// Number of lookups that found a live matching entry
    pub hits: u64,
    /// Number of lookups that found no live matching entry
    pub misses: u64,
    /// Number of entries evicted to make room
    pub evictions: u64,
    /// Number of expired records purged during scans
    pub purged_expired: u64,
    /// Number of malformed records purged during scans
    pub purged_malformed: u64,
    /// Number of failed backing store commands
    pub store_errors: u64,
}

impl StatsSnapshot {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let snapshot = CacheStats::new().snapshot();
        assert_eq!(snapshot.hits, 0);
        assert_eq!(snapshot.misses, 0);
        assert_eq!(snapshot.evictions, 0);
        assert_eq!(snapshot.purged_expired, 0);
        assert_eq!(snapshot.purged_malformed, 0);
        assert_eq!(snapshot.store_errors, 0);
    }

    #[test]
    fn test_counters_accumulate() {
        let stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        stats.record_eviction();
        stats.record_purged_expired();
        stats.record_purged_malformed();
        stats.record_store_error();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.hits, 2);
        assert_eq!(snapshot.misses, 1);
        assert_eq!(snapshot.evictions, 1);
        assert_eq!(snapshot.purged_expired, 1);
        assert_eq!(snapshot.purged_malformed, 1);
        assert_eq!(snapshot.store_errors, 1);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let snapshot = CacheStats::new().snapshot();
        assert_eq!(snapshot.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_all_hits() {
        let stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        assert_eq!(stats.snapshot().hit_rate(), 1.0);
    }

    #[test]
    fn test_hit_rate_all_misses() {
        let stats = CacheStats::new();
        stats.record_miss();
        stats.record_miss();
        assert_eq!(stats.snapshot().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let stats = CacheStats::new();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.snapshot().hit_rate(), 0.5);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let stats = CacheStats::new();
        stats.record_hit();
        let before = stats.snapshot();
        stats.record_hit();

        assert_eq!(before.hits, 1);
        assert_eq!(stats.snapshot().hits, 2);
    }
}
