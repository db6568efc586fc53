//! Runtime configuration, reloadable after `open()`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::decider::Outcome;
use crate::error::Result;
use crate::store::UpstreamServer;

const STORE_PATH_ENV: &str = "POLICYCORE_STORE_PATH";

/// Which address family a forward/terminate pool lookup is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    V4,
    V6,
}

#[derive(Debug, Clone, Default)]
struct Snapshot {
    store_path: Option<PathBuf>,
    pool_size: usize,
    cache_capacity: usize,
    terminate_v4: Vec<UpstreamServer>,
    terminate_v6: Vec<UpstreamServer>,
    forward_block: Vec<UpstreamServer>,
    forward_allow: Vec<UpstreamServer>,
    busy_timeout: Duration,
}

impl Snapshot {
    fn defaults() -> Self {
        Self {
            store_path: None,
            pool_size: 32,
            cache_capacity: 10_000,
            terminate_v4: Vec::new(),
            terminate_v6: Vec::new(),
            forward_block: Vec::new(),
            forward_allow: Vec::new(),
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// Host-supplied configuration, mirroring the setter-based configuration
/// surface a resolver host calls before (and optionally after) `open()`.
///
/// Every setter takes the inner lock, mutates a private snapshot, and
/// releases; readers copy fields out from behind a read lock rather than
/// holding a reference across a call, so a config reload never races
/// with an in-flight query.
#[derive(Debug)]
pub struct Config {
    snapshot: Arc<RwLock<Snapshot>>,
}

impl Default for Config {
    fn default() -> Self {
        Self { snapshot: Arc::new(RwLock::new(Snapshot::defaults())) }
    }
}

impl Clone for Config {
    fn clone(&self) -> Self {
        Self { snapshot: Arc::clone(&self.snapshot) }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_store_path(&self, path: impl Into<PathBuf>) {
        self.snapshot.write().store_path = Some(path.into());
    }

    pub fn set_pool_size(&self, size: usize) {
        self.snapshot.write().pool_size = size;
    }

    pub fn set_cache_capacity(&self, capacity: usize) {
        self.snapshot.write().cache_capacity = capacity;
    }

    pub fn set_busy_timeout(&self, timeout: Duration) {
        self.snapshot.write().busy_timeout = timeout;
    }

    pub fn set_terminate_v4(&self, csv: &str) {
        self.snapshot.write().terminate_v4 = parse_pool(csv, Family::V4);
    }

    pub fn set_terminate_v6(&self, csv: &str) {
        self.snapshot.write().terminate_v6 = parse_pool(csv, Family::V6);
    }

    pub fn set_forward_block(&self, csv: &str) {
        // Forward pools carry either family; parse each entry the way
        // its bracketing implies rather than assuming one family.
        self.snapshot.write().forward_block = parse_mixed_pool(csv);
    }

    pub fn set_forward_allow(&self, csv: &str) {
        self.snapshot.write().forward_allow = parse_mixed_pool(csv);
    }

    pub fn busy_timeout(&self) -> Duration {
        self.snapshot.read().busy_timeout
    }

    pub(crate) fn pool_size_raw(&self) -> usize {
        self.snapshot.read().pool_size
    }

    pub(crate) fn cache_capacity_raw(&self) -> usize {
        self.snapshot.read().cache_capacity
    }

    /// Supplies the configured pool for a settled outcome and family.
    /// `NONE` and unmapped combinations return an empty pool.
    pub fn pool_for(&self, outcome: Outcome, family: Family) -> Vec<UpstreamServer> {
        let snap = self.snapshot.read();
        match (outcome, family) {
            (Outcome::Terminate, Family::V4) => snap.terminate_v4.clone(),
            (Outcome::Terminate, Family::V6) => snap.terminate_v6.clone(),
            (Outcome::ForwardBlock, _) => snap.forward_block.clone(),
            (Outcome::ForwardAllow, _) => snap.forward_allow.clone(),
            (Outcome::None, _) => Vec::new(),
        }
    }

    /// Resolves the final, immutable snapshot used for one `open()`
    /// call: falls back to `POLICYCORE_STORE_PATH` if no path was set
    /// programmatically, and freezes `pool_size`/`cache_capacity` as
    /// plain fields so the hot path never touches the lock again.
    ///
    /// A missing path is *not* fatal: the policy store itself is
    /// always injected into `Core::open` as an `Arc<dyn PolicyStore>`
    /// rather than opened from this path, so `store_path` is
    /// informational only — open succeeds either way, and an
    /// empty/no-op `PolicyStore` naturally produces all-`NONE`
    /// pass-through lookups.
    pub(crate) fn resolved(self) -> Result<ResolvedConfig> {
        let snap = self.snapshot.read().clone();
        let store_path = snap
            .store_path
            .or_else(|| std::env::var(STORE_PATH_ENV).ok().map(PathBuf::from));
        Ok(ResolvedConfig {
            store_path,
            pool_size: snap.pool_size,
            cache_capacity: snap.cache_capacity,
            live: self,
        })
    }
}

/// The frozen view of [`Config`] a [`crate::Core`] holds for its
/// lifetime, plus a handle back to the live, reloadable config for
/// `pool_for`/`get_terminate` queries.
#[derive(Debug)]
pub struct ResolvedConfig {
    pub store_path: Option<PathBuf>,
    pub pool_size: usize,
    pub cache_capacity: usize,
    live: Config,
}

impl ResolvedConfig {
    pub fn pool_for(&self, outcome: Outcome, family: Family) -> Vec<UpstreamServer> {
        self.live.pool_for(outcome, family)
    }
}

fn parse_pool(csv: &str, family: Family) -> Vec<UpstreamServer> {
    csv.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| parse_entry(entry, family))
        .collect()
}

fn parse_mixed_pool(csv: &str) -> Vec<UpstreamServer> {
    csv.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| {
            let family = if entry.starts_with('[') { Family::V6 } else { Family::V4 };
            parse_entry(entry, family)
        })
        .collect()
}

/// Parses one forward-pool entry: `host#port` for v4, `[host]:port` for
/// v6, or a bare address/hostname with no port.
fn parse_entry(entry: &str, family: Family) -> UpstreamServer {
    match family {
        Family::V4 => match entry.split_once('#') {
            Some((host, port)) => UpstreamServer {
                host: host.to_string(),
                port: port.parse().ok(),
            },
            None => UpstreamServer { host: entry.to_string(), port: None },
        },
        Family::V6 => {
            if let Some(stripped) = entry.strip_prefix('[') {
                if let Some((host, rest)) = stripped.split_once(']') {
                    let port = rest.strip_prefix(':').and_then(|p| p.parse().ok());
                    return UpstreamServer { host: host.to_string(), port };
                }
            }
            UpstreamServer { host: entry.to_string(), port: None }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // POLICYCORE_STORE_PATH is process-global; serialize any test that
    // touches it so concurrent `cargo test` runs don't race on it.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn parses_v4_pool_with_ports() {
        let cfg = Config::new();
        cfg.set_terminate_v4("10.0.0.1#53, 10.0.0.2");
        let pool = cfg.pool_for(Outcome::Terminate, Family::V4);
        assert_eq!(pool, vec![
            UpstreamServer { host: "10.0.0.1".to_string(), port: Some(53) },
            UpstreamServer { host: "10.0.0.2".to_string(), port: None },
        ]);
    }

    #[test]
    fn parses_v6_pool_with_brackets() {
        let cfg = Config::new();
        cfg.set_terminate_v6("[fd00::1]:53, fd00::2");
        let pool = cfg.pool_for(Outcome::Terminate, Family::V6);
        assert_eq!(pool, vec![
            UpstreamServer { host: "fd00::1".to_string(), port: Some(53) },
            UpstreamServer { host: "fd00::2".to_string(), port: None },
        ]);
    }

    #[test]
    fn resolved_succeeds_with_no_path_configured() {
        // A missing store path is not fatal — the store is injected
        // separately into `Core::open`, so `resolved()` just carries
        // `store_path: None` through.
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::remove_var(STORE_PATH_ENV);
        let cfg = Config::new();
        let resolved = cfg.resolved().unwrap();
        assert!(resolved.store_path.is_none());
    }

    #[test]
    fn resolved_reads_env_var_when_unset_programmatically() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var(STORE_PATH_ENV, "/tmp/policy.db");
        let cfg = Config::new();
        let resolved = cfg.resolved().unwrap();
        assert_eq!(resolved.store_path, Some(PathBuf::from("/tmp/policy.db")));
        std::env::remove_var(STORE_PATH_ENV);
    }

    #[test]
    fn none_outcome_has_no_pool() {
        let cfg = Config::new();
        cfg.set_terminate_v4("10.0.0.1");
        assert!(cfg.pool_for(Outcome::None, Family::V4).is_empty());
    }
}
