//! Observability summary emitted on `close()`: LRU hit/miss counts,
//! regex bucket distribution, and Bloom filter sizing, rolled up into
//! one structured `tracing::info!` event rather than scattered prints
//! so an operator can grep a single log line for the whole lifetime
//! summary.

use tracing::info;

use crate::cache::CacheStats;
use crate::pattern::BucketDistribution;

/// Snapshot of the core's lifetime counters, returned by [`crate::Core::close`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CoreStats {
    pub cache: CacheStats,
    pub pattern_buckets: BucketDistribution,
    pub cidr_rules_loaded: usize,
    pub negative_filter_bits: u64,
}

impl CoreStats {
    /// Emits the close-time observability summary: LRU
    /// hits/misses/hit-rate, pattern count and bucket split, CIDR
    /// rule count, negative-filter sizing.
    pub fn log(&self) {
        info!(
            lru_hits = self.cache.hits,
            lru_misses = self.cache.misses,
            lru_hit_rate_pct = self.cache.hit_rate_pct(),
            lru_len = self.cache.len,
            lru_capacity = self.cache.capacity,
            pattern_count = self.pattern_buckets.total_patterns,
            pattern_catchall = self.pattern_buckets.catchall_patterns,
            pattern_bucketed = self.pattern_buckets.total_patterns - self.pattern_buckets.catchall_patterns,
            cidr_rules_loaded = self.cidr_rules_loaded,
            negative_filter_bits = self.negative_filter_bits,
            "policy core closed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_reported_correctly() {
        let stats = CoreStats {
            cache: CacheStats { hits: 85, misses: 15, len: 100, capacity: 100 },
            ..Default::default()
        };
        assert!((stats.cache.hit_rate_pct() - 85.0).abs() < f64::EPSILON);
    }
}
