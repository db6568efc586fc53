//! Bucketed pattern matcher (C5).
//!
//! 257 buckets (256 ASCII-alphanumeric anchors + one catch-all), loaded
//! exactly once via `once_cell::sync::OnceCell`, guarded thereafter by
//! a read-write lock where matching takes the read lock and load takes
//! the write lock. Bucketing by anchor byte turns an O(patterns) scan
//! into an O(1) bucket lookup plus a short per-bucket scan, at the
//! cost of a catch-all bucket for patterns with no fixed leading
//! character. First match wins; bucket iteration order never matters
//! since at most one pattern in the whole set is expected to match.

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use regex::Regex;
use tracing::warn;

use crate::error::Result;
use crate::store::PolicyStore;

const CATCHALL: usize = 256;
const BUCKET_COUNT: usize = 257;

struct CompiledPattern {
    source: String,
    compiled: Regex,
}

#[derive(Default)]
struct Bucket {
    patterns: Vec<CompiledPattern>,
}

/// Distribution snapshot surfaced at `close()` for observability.
#[derive(Debug, Clone, Copy, Default)]
pub struct BucketDistribution {
    pub total_patterns: usize,
    pub catchall_patterns: usize,
}

/// Immutable-after-load set of compiled patterns, bucketed by anchor byte.
pub struct PatternMatcher {
    buckets: RwLock<Vec<Bucket>>,
    loaded: OnceCell<()>,
}

impl PatternMatcher {
    pub fn new() -> Self {
        Self {
            buckets: RwLock::new((0..BUCKET_COUNT).map(|_| Bucket::default()).collect()),
            loaded: OnceCell::new(),
        }
    }

    /// Performs the one-shot load from `store.regex_patterns()`. Safe
    /// to call from multiple threads; only the first call's closure
    /// runs. A single pattern failing to compile is logged and
    /// skipped so one malformed rule can't take down the whole set.
    pub fn ensure_loaded(&self, store: &dyn PolicyStore) -> Result<()> {
        let mut load_err = None;
        self.loaded.get_or_init(|| {
            match store.regex_patterns() {
                Ok(patterns) => {
                    let mut buckets: Vec<Bucket> =
                        (0..BUCKET_COUNT).map(|_| Bucket::default()).collect();
                    for pattern in patterns {
                        match Regex::new(&pattern) {
                            Ok(compiled) => {
                                let idx = bucket_index(&pattern);
                                buckets[idx]
                                    .patterns
                                    .push(CompiledPattern { source: pattern, compiled });
                            }
                            Err(e) => {
                                warn!(pattern = %pattern, error = %e, "skipping uncompilable pattern");
                            }
                        }
                    }
                    *self.buckets.write() = buckets;
                }
                Err(e) => {
                    load_err = Some(e);
                }
            }
        });
        match load_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Returns `true` iff any loaded pattern matches `name`. Checks
    /// only the bucket for `name`'s first byte plus the catch-all
    /// bucket — every other bucket is guaranteed to hold only patterns
    /// anchored on a different leading character.
    pub fn matches(&self, name: &str) -> bool {
        let Some(first) = name.bytes().next() else { return false };
        let domain_bucket = (first as usize).min(255);
        let buckets = self.buckets.read();

        for idx in [domain_bucket, CATCHALL] {
            for p in &buckets[idx].patterns {
                if p.compiled.is_match(name) {
                    return true;
                }
            }
        }
        false
    }

    /// Same as [`Self::matches`] but also returns the source of the
    /// first matching pattern, for trace-level observability only —
    /// never part of the public decision outcome, since callers should
    /// not be able to branch on which rule fired.
    pub fn matches_with_source(&self, name: &str) -> Option<String> {
        let first = name.bytes().next()?;
        let domain_bucket = (first as usize).min(255);
        let buckets = self.buckets.read();

        for idx in [domain_bucket, CATCHALL] {
            for p in &buckets[idx].patterns {
                if p.compiled.is_match(name) {
                    return Some(p.source.clone());
                }
            }
        }
        None
    }

    pub fn bucket_distribution(&self) -> BucketDistribution {
        let buckets = self.buckets.read();
        let catchall = buckets[CATCHALL].patterns.len();
        let total: usize = buckets.iter().map(|b| b.patterns.len()).sum();
        BucketDistribution { total_patterns: total, catchall_patterns: catchall }
    }
}

impl Default for PatternMatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Bucketing rule: skip a leading `^`, then classify the next byte.
/// `.([\*?` (and any other non-alphanumeric) go to the catch-all;
/// ASCII alphanumeric goes to its own lowercased bucket.
fn bucket_index(pattern: &str) -> usize {
    let mut chars = pattern.chars();
    let mut c = chars.next();
    if c == Some('^') {
        c = chars.next();
    }
    match c {
        Some(c) if c.is_ascii_alphanumeric() => c.to_ascii_lowercase() as usize,
        _ => CATCHALL,
    }
}
