//! Policy decider (C6): the 7-step decision pipeline.
//!
//! Cache → patterns → exact (filter-gated) → block-wildcard →
//! allow-suffix → block-suffix → `NONE`, in that fixed order so the
//! cheapest and highest-priority checks run first. Every step's store
//! error folds into "no match" for that step rather than surfacing to
//! the caller; only `Core::open` is allowed to fail hard, since a
//! lookup-time store hiccup should degrade gracefully rather than take
//! down the resolver.

use tracing::trace;

use crate::cache::RecencyCache;
use crate::name::Name;
use crate::negative_filter::NegativeFilter;
use crate::pattern::PatternMatcher;
use crate::pool::HandlePool;
use crate::store::{ExactSet, StoreHandle, SuffixSet};

/// The single enumerated decision tag returned from a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Defer to default resolution.
    None,
    /// Answer locally with a sinkhole address.
    Terminate,
    /// Forward to the block-oriented upstream pool.
    ForwardBlock,
    /// Forward to the allow-oriented upstream pool.
    ForwardAllow,
}

/// Orchestrates the decision pipeline. Stateless itself — every piece
/// of state it touches (`cache`, `pattern_matcher`, `negative_filter`,
/// `pool`) is owned by [`crate::Core`] and passed in by reference so
/// multiple workers can drive the same `Decider` concurrently.
#[derive(Default)]
pub struct Decider;

impl Decider {
    pub fn new() -> Self {
        Self
    }

    pub fn decide(
        &self,
        name: &Name,
        cache: &RecencyCache,
        pattern_matcher: &PatternMatcher,
        negative_filter: &NegativeFilter,
        pool: &HandlePool,
    ) -> Outcome {
        // Step 1: cache.
        if let Some(outcome) = cache.get(name.as_str()) {
            return outcome;
        }

        let outcome = self.decide_uncached(name, pattern_matcher, negative_filter, pool);
        cache.put(name.as_str(), outcome);
        outcome
    }

    fn decide_uncached(
        &self,
        name: &Name,
        pattern_matcher: &PatternMatcher,
        negative_filter: &NegativeFilter,
        pool: &HandlePool,
    ) -> Outcome {
        let n = name.as_str();

        // Step 2: compiled patterns, highest priority.
        if let Some(src) = pattern_matcher.matches_with_source(n) {
            trace!(name = n, pattern = %src, "matched regex pattern");
            return Outcome::Terminate;
        }

        let handle = pool.handle_for_current_thread();

        // Step 3: exact block, gated by the negative filter.
        if negative_filter.might_contain(n) {
            if let Some(handle) = handle {
                match handle.exact_lookup(ExactSet::BlockExact, n) {
                    Ok(true) => {
                        trace!(name = n, "matched block_exact");
                        return Outcome::Terminate;
                    }
                    Ok(false) => {}
                    Err(e) => trace!(name = n, error = %e, "block_exact lookup failed, no match"),
                }
            }
        }

        let suffixes = name.suffixes();

        // Step 4: block-wildcard.
        if let Some(handle) = handle {
            if let Some(hit) = suffix_hit(handle, SuffixSet::BlockWildcard, &suffixes) {
                trace!(name = n, matched = %hit, "matched block_wildcard");
                return Outcome::ForwardBlock;
            }
        }

        // Step 5: allow-suffix.
        if let Some(handle) = handle {
            if let Some(hit) = suffix_hit(handle, SuffixSet::AllowSuffix, &suffixes) {
                trace!(name = n, matched = %hit, "matched allow_suffix");
                return Outcome::ForwardAllow;
            }
        }

        // Step 6: block-suffix.
        if let Some(handle) = handle {
            if let Some(hit) = suffix_hit(handle, SuffixSet::BlockSuffix, &suffixes) {
                trace!(name = n, matched = %hit, "matched block_suffix");
                return Outcome::ForwardBlock;
            }
        }

        // Step 7.
        Outcome::None
    }
}

fn suffix_hit(handle: &dyn StoreHandle, set: SuffixSet, suffixes: &[&str]) -> Option<String> {
    match handle.longest_suffix_match(set, suffixes) {
        Ok(hit) => hit,
        Err(e) => {
            trace!(error = %e, "suffix lookup failed, no match");
            None
        }
    }
}
