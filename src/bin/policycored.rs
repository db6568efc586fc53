//! Interactive driver for `policycore`.
//!
//! A simple prompt loop over buffered stdin that drives
//! [`policycore::Core::lookup`] against an in-memory demo store, for
//! exercising the lookup pipeline without wiring up a real backend.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use policycore::store::memory::InMemoryStore;
use policycore::store::PolicyStore;
use policycore::{Config, Core, Name};
use tracing_subscriber::EnvFilter;

fn demo_store() -> InMemoryStore {
    let store = InMemoryStore::new();
    store
        .insert_block_exact("ads.example.com")
        .insert_block_wildcard("privacy.com")
        .insert_allow_suffix("trusted.com")
        .insert_block_suffix("trusted.com")
        .insert_regex_pattern(r"^ads[0-9]+\.")
        .insert_alias("intel.com", "keweon.center")
        .insert_rewrite_exact("2001:db8::1", "fd00::1")
        .insert_rewrite_cidr("192.168.0.0".parse().unwrap(), 16, "10.0.0.1".parse().unwrap());
    store
}

fn main() -> policycore::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("========================================");
    println!("  policycored - policy lookup core REPL");
    println!("========================================");
    println!();

    let config = Config::new();
    config.set_cache_capacity(1024);
    config.set_pool_size(4);
    config.set_terminate_v4("127.0.0.1");

    let store: Arc<dyn PolicyStore> = Arc::new(demo_store());
    let core = Core::open(config, store)?;

    println!("Opened against an in-memory demo store.");
    println!("Type a domain name to look it up, or 'exit' to quit.");
    println!();

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut line = String::new();

    loop {
        print!("policycore> ");
        io::stdout().flush().ok();

        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            println!("Goodbye!");
            break;
        }

        match Name::new(input) {
            Ok(name) => {
                let outcome = core.lookup(&name);
                println!("  -> {outcome:?}");
                if let Some(alias) = core.alias(&name) {
                    println!("  alias -> {alias}");
                }
            }
            Err(e) => println!("  invalid name: {e}"),
        }
    }

    let stats = core.close();
    println!();
    println!("cache: {} hits, {} misses ({:.1}% hit rate)", stats.cache.hits, stats.cache.misses, stats.cache.hit_rate_pct());
    println!("patterns: {} total ({} catch-all)", stats.pattern_buckets.total_patterns, stats.pattern_buckets.catchall_patterns);
    println!("cidr rules loaded: {}", stats.cidr_rules_loaded);

    Ok(())
}
