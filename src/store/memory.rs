//! In-memory reference [`PolicyStore`] implementation.
//!
//! Used by tests, `policycored`, and benches. Has no bearing on any
//! real backend's schema or wire format — it exists only to give the
//! trait boundary a concrete, dependency-free implementation.

use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{CidrRuleRaw, ExactSet, PolicyStore, StoreHandle, SuffixSet};
use crate::error::Result;

#[derive(Debug, Default)]
struct Tables {
    block_exact: BTreeSet<String>,
    block_wildcard: BTreeSet<String>,
    allow_suffix: BTreeSet<String>,
    block_suffix: BTreeSet<String>,
    regex_patterns: Vec<String>,
    alias: BTreeMap<String, String>,
    rewrite_exact: BTreeMap<String, String>,
    rewrite_cidr: Vec<CidrRuleRaw>,
}

/// A fully in-process policy store, built up with the `insert_*`
/// builder methods before being handed to [`crate::Core::open`].
///
/// Each handle shares the same backing tables through an `Arc`, so a
/// mutation made after `open_handle()` is visible to every outstanding
/// handle — matching a real store's single-writer-after-open contract.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_block_exact(&self, name: impl Into<String>) -> &Self {
        self.tables.write().block_exact.insert(name.into());
        self
    }

    pub fn insert_block_wildcard(&self, suffix: impl Into<String>) -> &Self {
        self.tables.write().block_wildcard.insert(suffix.into());
        self
    }

    pub fn insert_allow_suffix(&self, suffix: impl Into<String>) -> &Self {
        self.tables.write().allow_suffix.insert(suffix.into());
        self
    }

    pub fn insert_block_suffix(&self, suffix: impl Into<String>) -> &Self {
        self.tables.write().block_suffix.insert(suffix.into());
        self
    }

    pub fn insert_regex_pattern(&self, pattern: impl Into<String>) -> &Self {
        self.tables.write().regex_patterns.push(pattern.into());
        self
    }

    pub fn insert_alias(&self, source: impl Into<String>, target: impl Into<String>) -> &Self {
        self.tables.write().alias.insert(source.into(), target.into());
        self
    }

    pub fn insert_rewrite_exact(&self, addr: impl Into<String>, target: impl Into<String>) -> &Self {
        self.tables.write().rewrite_exact.insert(addr.into(), target.into());
        self
    }

    pub fn insert_rewrite_cidr(&self, network: IpAddr, prefix_len: u8, target: IpAddr) -> &Self {
        self.tables.write().rewrite_cidr.push(CidrRuleRaw { network, prefix_len, target });
        self
    }
}

impl PolicyStore for InMemoryStore {
    fn open_handle(&self) -> Result<Box<dyn StoreHandle>> {
        Ok(Box::new(InMemoryHandle { tables: Arc::clone(&self.tables) }))
    }

    fn exact_count(&self, set: ExactSet) -> Result<u64> {
        let ExactSet::BlockExact = set;
        Ok(self.tables.read().block_exact.len() as u64)
    }

    fn for_each_exact(&self, set: ExactSet, f: &mut dyn FnMut(&str)) -> Result<()> {
        let ExactSet::BlockExact = set;
        for key in self.tables.read().block_exact.iter() {
            f(key);
        }
        Ok(())
    }

    fn regex_patterns(&self) -> Result<Vec<String>> {
        Ok(self.tables.read().regex_patterns.clone())
    }

    fn cidr_rules(&self) -> Result<Vec<CidrRuleRaw>> {
        Ok(self.tables.read().rewrite_cidr.clone())
    }
}

struct InMemoryHandle {
    tables: Arc<RwLock<Tables>>,
}

impl StoreHandle for InMemoryHandle {
    fn exact_lookup(&self, set: ExactSet, key: &str) -> Result<bool> {
        let ExactSet::BlockExact = set;
        Ok(self.tables.read().block_exact.contains(key))
    }

    fn longest_suffix_match(&self, set: SuffixSet, candidates: &[&str]) -> Result<Option<String>> {
        let tables = self.tables.read();
        let table = match set {
            SuffixSet::BlockWildcard => &tables.block_wildcard,
            SuffixSet::AllowSuffix => &tables.allow_suffix,
            SuffixSet::BlockSuffix => &tables.block_suffix,
        };
        // `candidates` is ordered longest-first; the first hit is the
        // longest match.
        for candidate in candidates {
            if table.contains(*candidate) {
                return Ok(Some((*candidate).to_string()));
            }
        }
        Ok(None)
    }

    fn alias_lookup(&self, source: &str) -> Result<Option<String>> {
        Ok(self.tables.read().alias.get(source).cloned())
    }

    fn rewrite_lookup(&self, addr_str: &str) -> Result<Option<String>> {
        Ok(self.tables.read().rewrite_exact.get(addr_str).cloned())
    }
}
