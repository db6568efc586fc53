//! End-to-end scenarios driven through the public `Core` API against
//! the in-memory reference store.

use std::sync::Arc;

use policycore::store::memory::InMemoryStore;
use policycore::store::PolicyStore;
use policycore::{Config, Core, Name, Outcome};

fn open(store: InMemoryStore) -> Core {
    let config = Config::new();
    config.set_pool_size(2);
    config.set_cache_capacity(64);
    let store: Arc<dyn PolicyStore> = Arc::new(store);
    Core::open(config, store).unwrap()
}

#[test]
fn scenario_1_exact_block_does_not_imply_wildcard() {
    let store = InMemoryStore::new();
    store.insert_block_exact("ads.example.com");
    let core = open(store);

    assert_eq!(core.lookup(&Name::new("ads.example.com").unwrap()), Outcome::Terminate);
    assert_eq!(core.lookup(&Name::new("www.ads.example.com").unwrap()), Outcome::None);
}

#[test]
fn scenario_2_block_wildcard_covers_descendants_only() {
    let store = InMemoryStore::new();
    store.insert_block_wildcard("privacy.com");
    let core = open(store);

    assert_eq!(core.lookup(&Name::new("privacy.com").unwrap()), Outcome::ForwardBlock);
    assert_eq!(core.lookup(&Name::new("tracker.privacy.com").unwrap()), Outcome::ForwardBlock);
    assert_eq!(core.lookup(&Name::new("privacy.company.com").unwrap()), Outcome::None);
}

#[test]
fn scenario_3_allow_suffix_precedes_block_suffix() {
    let store = InMemoryStore::new();
    store.insert_allow_suffix("trusted.com");
    store.insert_block_suffix("trusted.com");
    let core = open(store);

    assert_eq!(core.lookup(&Name::new("sub.trusted.com").unwrap()), Outcome::ForwardAllow);
}

#[test]
fn scenario_4_regex_bucket_collision_is_not_a_false_match() {
    let store = InMemoryStore::new();
    store.insert_regex_pattern(r"^ads[0-9]+\.");
    let core = open(store);

    assert_eq!(core.lookup(&Name::new("ads42.example.com").unwrap()), Outcome::Terminate);
    assert_eq!(core.lookup(&Name::new("aardvark.com").unwrap()), Outcome::None);
}

#[test]
fn scenario_5_alias_exact_parent_and_miss() {
    let store = InMemoryStore::new();
    store.insert_alias("intel.com", "keweon.center");
    let core = open(store);

    assert_eq!(core.alias(&Name::new("intel.com").unwrap()), Some("keweon.center".to_string()));
    assert_eq!(
        core.alias(&Name::new("mail.intel.com").unwrap()),
        Some("mail.keweon.center".to_string())
    );
    assert_eq!(core.alias(&Name::new("deeply.nested.intel.com").unwrap()), None);
}

#[test]
fn scenario_6_rewrite_cidr_and_exact() {
    let store = InMemoryStore::new();
    store.insert_rewrite_cidr("192.168.0.0".parse().unwrap(), 16, "10.0.0.1".parse().unwrap());
    store.insert_rewrite_exact("2001:db8::1", "fd00::1");
    let core = open(store);

    assert_eq!(core.rewrite_v4("192.168.5.7".parse().unwrap()), Some("10.0.0.1".parse().unwrap()));
    assert_eq!(
        core.rewrite_v6("2001:0db8:0000:0000:0000:0000:0000:0001".parse().unwrap()),
        Some("fd00::1".parse().unwrap())
    );
}

#[test]
fn boundary_block_wildcard_wins_over_allow_suffix() {
    let store = InMemoryStore::new();
    store.insert_block_wildcard("ads.net");
    store.insert_allow_suffix("ads.net");
    let core = open(store);

    assert_eq!(core.lookup(&Name::new("sub.ads.net").unwrap()), Outcome::ForwardBlock);
}

#[test]
fn close_returns_observability_stats() {
    let store = InMemoryStore::new();
    store.insert_block_exact("ads.example.com");
    let core = open(store);

    core.lookup(&Name::new("ads.example.com").unwrap());
    core.lookup(&Name::new("ads.example.com").unwrap());
    core.lookup(&Name::new("other.com").unwrap());

    let stats = core.close();
    assert_eq!(stats.cache.hits, 1);
    assert_eq!(stats.cache.misses, 2);
}

#[test]
fn config_absent_still_opens_and_resolves_none() {
    // No store path configured does not fail `open()` — the store is
    // injected directly, and an empty store naturally makes every
    // lookup resolve to `NONE`.
    std::env::remove_var("POLICYCORE_STORE_PATH");
    let config = Config::new();
    let store: Arc<dyn PolicyStore> = Arc::new(InMemoryStore::new());
    let core = Core::open(config, store).unwrap();
    assert_eq!(core.lookup(&Name::new("anything.com").unwrap()), Outcome::None);
}
