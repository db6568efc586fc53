//! The policy store boundary.
//!
//! The indexed store itself (on-disk format, wire transport, write
//! path) is an external collaborator; this module only defines the
//! shape every component needs of it. [`PolicyStore`] is the pool-wide
//! factory/tuning surface; [`StoreHandle`] is the per-worker read
//! surface a [`crate::pool::HandlePool`] hands out.

pub mod memory;

use std::net::IpAddr;

use crate::error::Result;

/// The five exact/suffix-keyed sets a store exposes, named canonically
/// regardless of what a concrete backend calls its own tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExactSet {
    BlockExact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuffixSet {
    BlockWildcard,
    AllowSuffix,
    BlockSuffix,
}

/// One row of the CIDR rewrite table as loaded from the store, before
/// being parsed into [`crate::rewrite::CidrRule`].
#[derive(Debug, Clone)]
pub struct CidrRuleRaw {
    pub network: IpAddr,
    pub prefix_len: u8,
    pub target: IpAddr,
}

/// One entry of a configured upstream pool, parsed from the `#port` /
/// `[addr]:port` forward-pool syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamServer {
    pub host: String,
    pub port: Option<u16>,
}

impl std::fmt::Display for UpstreamServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.port {
            Some(p) => write!(f, "{}#{}", self.host, p),
            None => write!(f, "{}", self.host),
        }
    }
}

/// Pool-wide operations performed once at open, before any handle is
/// handed to a worker.
pub trait PolicyStore: Send + Sync {
    /// Opens one read-only handle. Called once per pool slot.
    fn open_handle(&self) -> Result<Box<dyn StoreHandle>>;

    /// Applies a tuning profile once at open (mmap/cache/journal mode
    /// in a real backend). Default is a no-op so in-memory stores used
    /// by tests don't need to implement it; a single pragma failure
    /// must be logged and must never abort the open sequence.
    fn tune(&self) -> Result<()> {
        Ok(())
    }

    /// Cardinality of `block_exact`, used to size the negative filter.
    fn exact_count(&self, set: ExactSet) -> Result<u64>;

    /// Full scan of `block_exact`, used once to build the negative
    /// filter. Must visit every key exactly once.
    fn for_each_exact(&self, set: ExactSet, f: &mut dyn FnMut(&str)) -> Result<()>;

    /// Full scan of `regex_patterns`, used once by the pattern matcher.
    fn regex_patterns(&self) -> Result<Vec<String>>;

    /// Full scan of the rewrite table's CIDR rows, loaded once at open.
    fn cidr_rules(&self) -> Result<Vec<CidrRuleRaw>>;
}

/// Per-worker read surface. Each worker owns exactly one handle for its
/// lifetime (assigned by [`crate::pool::HandlePool`]); all methods here
/// are the hot-path point/batched lookups the decision pipeline drives.
pub trait StoreHandle: Send + Sync {
    /// Executes one trivial query to populate the store's page cache.
    fn warmup(&self) -> Result<()> {
        Ok(())
    }

    /// Point lookup: is `key` present in `block_exact`?
    fn exact_lookup(&self, set: ExactSet, key: &str) -> Result<bool>;

    /// Batched membership query: of the candidate suffixes (longest
    /// first), returns the longest one present in `set`, or `None`.
    /// Candidates are assumed already ordered longest-to-shortest;
    /// implementations may rely on this and return the first match.
    fn longest_suffix_match(&self, set: SuffixSet, candidates: &[&str]) -> Result<Option<String>>;

    /// Exact alias lookup: `source → target`.
    fn alias_lookup(&self, source: &str) -> Result<Option<String>>;

    /// Exact rewrite lookup, keyed by the stringified address.
    fn rewrite_lookup(&self, addr_str: &str) -> Result<Option<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_server_display() {
        let with_port = UpstreamServer { host: "10.0.0.1".to_string(), port: Some(53) };
        assert_eq!(with_port.to_string(), "10.0.0.1#53");

        let without = UpstreamServer { host: "10.0.0.1".to_string(), port: None };
        assert_eq!(without.to_string(), "10.0.0.1");
    }
}
