//! Rewrite engine (C7): alias lookup and post-resolution address rewrite.
//!
//! Alias resolution tries an exact match first, then falls back to the
//! parent domain while preserving the original subdomain prefix,
//! bounded at 1023 bytes. CIDR rewrite and IPv6 canonicalization are
//! implemented directly on top of `std::net`.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::Result;
use crate::name::Name;
use crate::pool::HandlePool;
use crate::store::{CidrRuleRaw, PolicyStore};

/// Bound on a composed alias result.
const ALIAS_MAX_LEN: usize = 1023;

#[derive(Debug, Clone, Copy)]
enum Family {
    V4,
    V6,
}

/// One loaded-at-open CIDR rewrite rule.
#[derive(Debug, Clone)]
pub struct CidrRule {
    family: Family,
    network: IpAddr,
    prefix_len: u8,
    target: IpAddr,
}

impl CidrRule {
    fn from_raw(raw: CidrRuleRaw) -> Option<Self> {
        let family = match (raw.network, raw.target) {
            (IpAddr::V4(_), IpAddr::V4(_)) => Family::V4,
            (IpAddr::V6(_), IpAddr::V6(_)) => Family::V6,
            _ => return None, // mixed-family rule, drop rather than guess
        };
        let max_prefix = match family {
            Family::V4 => 32,
            Family::V6 => 128,
        };
        if raw.prefix_len > max_prefix {
            return None;
        }
        Some(Self { family, network: raw.network, prefix_len: raw.prefix_len, target: raw.target })
    }

    fn matches_v4(&self, addr: Ipv4Addr) -> bool {
        let Family::V4 = self.family else { return false };
        let IpAddr::V4(net) = self.network else { return false };
        prefix_eq_u32(u32::from(addr), u32::from(net), self.prefix_len)
    }

    fn matches_v6(&self, addr: Ipv6Addr) -> bool {
        let Family::V6 = self.family else { return false };
        let IpAddr::V6(net) = self.network else { return false };
        prefix_eq_u128(u128::from(addr), u128::from(net), self.prefix_len)
    }
}

fn prefix_eq_u32(a: u32, b: u32, prefix_len: u8) -> bool {
    if prefix_len == 0 {
        return true;
    }
    let mask = u32::MAX.checked_shl(32 - prefix_len as u32).unwrap_or(0);
    (a & mask) == (b & mask)
}

fn prefix_eq_u128(a: u128, b: u128, prefix_len: u8) -> bool {
    if prefix_len == 0 {
        return true;
    }
    let mask = u128::MAX.checked_shl(128 - prefix_len as u32).unwrap_or(0);
    (a & mask) == (b & mask)
}

/// Alias lookup and IPv4/IPv6 address rewrite, with CIDR rules loaded
/// once into RAM at open rather than queried per lookup.
pub struct RewriteEngine {
    cidr_rules: Vec<CidrRule>,
}

impl RewriteEngine {
    /// Loads the CIDR rewrite table once from `store`. A rule with
    /// mismatched address families or an out-of-range prefix length is
    /// dropped rather than causing `open()` to fail — CIDR rewrite is
    /// an optional subsystem, and an operator's bad rule shouldn't
    /// block the whole core from opening.
    pub fn open(store: &dyn PolicyStore) -> Result<Self> {
        let raw = store.cidr_rules()?;
        let cidr_rules = raw.into_iter().filter_map(CidrRule::from_raw).collect();
        Ok(Self { cidr_rules })
    }

    pub fn cidr_rule_count(&self) -> usize {
        self.cidr_rules.len()
    }

    /// Exact-then-parent alias lookup with subdomain preservation.
    pub fn alias(&self, name: &Name, pool: &HandlePool) -> Option<String> {
        let handle = pool.handle_for_current_thread()?;

        if let Ok(Some(target)) = handle.alias_lookup(name.as_str()) {
            return Some(target);
        }

        let parent = name.parent()?;
        let target = handle.alias_lookup(parent).ok().flatten()?;
        let prefix = name.subdomain_prefix();
        let composed_len = prefix.len() + target.len();
        if composed_len > ALIAS_MAX_LEN {
            return None;
        }
        Some(format!("{prefix}{target}"))
    }

    /// Post-resolution IPv4 rewrite: exact match, then CIDR.
    pub fn rewrite_v4(&self, addr: Ipv4Addr, pool: &HandlePool) -> Option<Ipv4Addr> {
        if let Some(handle) = pool.handle_for_current_thread() {
            if let Ok(Some(target)) = handle.rewrite_lookup(&addr.to_string()) {
                if let Ok(parsed) = target.parse() {
                    return Some(parsed);
                }
            }
        }

        self.cidr_rules
            .iter()
            .find(|r| r.matches_v4(addr))
            .and_then(|r| match r.target {
                IpAddr::V4(v4) => Some(v4),
                IpAddr::V6(_) => None,
            })
    }

    /// Post-resolution IPv6 rewrite: exact match (both compact and
    /// fully-expanded forms), then CIDR.
    pub fn rewrite_v6(&self, addr: Ipv6Addr, pool: &HandlePool) -> Option<Ipv6Addr> {
        if let Some(handle) = pool.handle_for_current_thread() {
            if let Ok(Some(target)) = handle.rewrite_lookup(&addr.to_string()) {
                if let Ok(parsed) = target.parse() {
                    return Some(parsed);
                }
            }
            let expanded = canonicalize_v6(addr);
            if let Ok(Some(target)) = handle.rewrite_lookup(&expanded) {
                if let Ok(parsed) = target.parse() {
                    return Some(parsed);
                }
            }
        }

        self.cidr_rules
            .iter()
            .find(|r| r.matches_v6(addr))
            .and_then(|r| match r.target {
                IpAddr::V6(v6) => Some(v6),
                IpAddr::V4(_) => None,
            })
    }
}

/// Byte-wise hex expansion of the 16-byte form, colon-joined, no
/// compression and no case variation — a single canonical string form
/// so exact-match rewrite lookups don't miss on `::` vs fully-expanded
/// input.
pub fn canonicalize_v6(addr: Ipv6Addr) -> String {
    let segments = addr.segments();
    segments
        .iter()
        .map(|s| format!("{s:04x}"))
        .collect::<Vec<_>>()
        .join(":")
}
