//! Policy lookup core for a high-throughput DNS filtering resolver.
//!
//! Wires together seven cooperating components: a store handle pool, a
//! suffix decomposer, a negative (Bloom-style) filter, a recency cache,
//! a bucketed pattern matcher, a decision pipeline, and an alias/address
//! rewrite engine. [`Core`] is the single owning value that replaces the
//! original implementation's file-scope global state with scoped
//! ownership safe to share across worker threads.

pub mod cache;
pub mod config;
pub mod decider;
pub mod error;
pub mod name;
pub mod negative_filter;
pub mod pattern;
pub mod pool;
pub mod rewrite;
pub mod stats;
pub mod store;

pub use config::Config;
pub use decider::Outcome;
pub use error::{CoreError, Result};
pub use name::Name;
pub use stats::CoreStats;

use std::sync::Arc;

use cache::RecencyCache;
use decider::Decider;
use negative_filter::NegativeFilter;
use pattern::PatternMatcher;
use pool::HandlePool;
use rewrite::RewriteEngine;
use store::PolicyStore;
use tracing::info;

/// The owning handle for one open policy core.
///
/// A `Core` is built once during a single-threaded `open()` and torn
/// down during `close()`; in between, every field here is either
/// immutable or internally synchronized for concurrent access from the
/// worker threads that call [`Core::lookup`]. Worker-local store
/// handles borrow from `pool` for the lifetime of one query.
pub struct Core {
    config: config::ResolvedConfig,
    pool: HandlePool,
    cache: RecencyCache,
    negative_filter: NegativeFilter,
    pattern_matcher: PatternMatcher,
    decider: Decider,
    rewrite: RewriteEngine,
}

impl Core {
    /// Opens a policy core against the given store.
    ///
    /// Order matters: the handle pool opens and warms up first (C1),
    /// then the negative filter scans `block_exact` once (C3), then the
    /// pattern matcher's one-shot load is primed eagerly rather than
    /// left to first-query (paying the cost once, up front, while
    /// `open()` failures are still allowed to be fatal), then the
    /// rewrite engine's CIDR table loads into RAM.
    pub fn open(config: Config, store: Arc<dyn PolicyStore>) -> Result<Self> {
        let config = config.resolved()?;

        store.tune()?;
        let pool = HandlePool::open(Arc::clone(&store), config.pool_size)?;

        let exact_count = store.exact_count(store::ExactSet::BlockExact)?;
        let negative_filter = NegativeFilter::build(exact_count, &*store)?;

        let pattern_matcher = PatternMatcher::new();
        pattern_matcher.ensure_loaded(&*store)?;

        let rewrite = RewriteEngine::open(&*store)?;

        let cache = RecencyCache::new(config.cache_capacity);
        let decider = Decider::new();

        info!(
            pool_size = config.pool_size,
            cache_capacity = config.cache_capacity,
            "policy core opened"
        );

        Ok(Self {
            config,
            pool,
            cache,
            negative_filter,
            pattern_matcher,
            decider,
            rewrite,
        })
    }

    /// Primary decision function (C6's entry point).
    pub fn lookup(&self, name: &Name) -> Outcome {
        self.decider.decide(
            name,
            &self.cache,
            &self.pattern_matcher,
            &self.negative_filter,
            &self.pool,
        )
    }

    /// Pre-resolution alias lookup (C7).
    pub fn alias(&self, name: &Name) -> Option<String> {
        self.rewrite.alias(name, &self.pool)
    }

    /// Post-resolution IPv4 rewrite (C7).
    pub fn rewrite_v4(&self, addr: std::net::Ipv4Addr) -> Option<std::net::Ipv4Addr> {
        self.rewrite.rewrite_v4(addr, &self.pool)
    }

    /// Post-resolution IPv6 rewrite (C7).
    pub fn rewrite_v6(&self, addr: std::net::Ipv6Addr) -> Option<std::net::Ipv6Addr> {
        self.rewrite.rewrite_v6(addr, &self.pool)
    }

    /// Supplies the configured sinkhole/forward pool for an outcome.
    pub fn get_terminate(
        &self,
        outcome: Outcome,
        family: config::Family,
    ) -> Vec<store::UpstreamServer> {
        self.config.pool_for(outcome, family)
    }

    pub fn config(&self) -> &config::ResolvedConfig {
        &self.config
    }

    /// Finalizes statements, closes handles, frees caches, and emits
    /// a structured observability summary.
    pub fn close(self) -> CoreStats {
        let stats = CoreStats {
            cache: self.cache.stats(),
            pattern_buckets: self.pattern_matcher.bucket_distribution(),
            cidr_rules_loaded: self.rewrite.cidr_rule_count(),
            negative_filter_bits: self.negative_filter.size_bits(),
        };
        stats.log();
        stats
    }
}
