//! Recency cache (C4): a bounded, size-limited name → outcome map with
//! strict-LRU eviction, safe for concurrent readers and writers.
//!
//! FNV-1a hashing over `2^14` buckets, with a doubly-linked recency
//! list threaded through a hash chain. Raw `prev`/`next`/`hash_next`
//! pointers become indices into a single contiguous `Vec` arena, the
//! same pointer-to-index move a buffer-pool eviction list makes for
//! its own replacement list. Arena slots are never freed individually;
//! a capacity-bounded arena plus a free list of recycled slots stands
//! in for per-entry heap allocation.
//!
//! The whole structure sits behind one `parking_lot::RwLock` used
//! purely as a mutex. A lookup that finds an entry must promote it to
//! the list head and bump its hit counter, so every `get` takes the
//! **write** lock from the outset rather than a read lock it might
//! later need to upgrade — avoiding a lock-upgrade dance for what is,
//! on a hit, already a mutating operation.

use parking_lot::RwLock;

use crate::decider::Outcome;

const HASH_BUCKETS: usize = 1 << 14;

type Link = Option<usize>;

struct Entry {
    name: String,
    outcome: Outcome,
    hits: u64,
    prev: Link,
    next: Link,
    bucket_next: Link,
}

struct Inner {
    arena: Vec<Entry>,
    free: Vec<usize>,
    buckets: Vec<Link>,
    head: Link,
    tail: Link,
    capacity: usize,
    len: usize,
    hits: u64,
    misses: u64,
}

impl Inner {
    fn new(capacity: usize) -> Self {
        Self {
            arena: Vec::with_capacity(capacity),
            free: Vec::new(),
            buckets: vec![None; HASH_BUCKETS],
            head: None,
            tail: None,
            capacity,
            len: 0,
            hits: 0,
            misses: 0,
        }
    }

    fn bucket_of(name: &str) -> usize {
        (fnv1a(name) as usize) & (HASH_BUCKETS - 1)
    }

    fn find(&self, name: &str) -> Link {
        let mut cur = self.buckets[Self::bucket_of(name)];
        while let Some(idx) = cur {
            if self.arena[idx].name == name {
                return Some(idx);
            }
            cur = self.arena[idx].bucket_next;
        }
        None
    }

    fn unlink_from_list(&mut self, idx: usize) {
        let (prev, next) = (self.arena[idx].prev, self.arena[idx].next);
        match prev {
            Some(p) => self.arena[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.arena[n].prev = prev,
            None => self.tail = prev,
        }
        self.arena[idx].prev = None;
        self.arena[idx].next = None;
    }

    fn push_front(&mut self, idx: usize) {
        self.arena[idx].prev = None;
        self.arena[idx].next = self.head;
        if let Some(h) = self.head {
            self.arena[h].prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        self.unlink_from_list(idx);
        self.push_front(idx);
    }

    fn unlink_from_bucket(&mut self, idx: usize, bucket: usize) {
        let mut cur = self.buckets[bucket];
        let mut prev: Link = None;
        while let Some(cur_idx) = cur {
            if cur_idx == idx {
                let next = self.arena[cur_idx].bucket_next;
                match prev {
                    Some(p) => self.arena[p].bucket_next = next,
                    None => self.buckets[bucket] = next,
                }
                return;
            }
            prev = Some(cur_idx);
            cur = self.arena[cur_idx].bucket_next;
        }
    }

    /// Evicts the LRU tail: unlink from list, find-and-unlink in its
    /// bucket chain, reclaim the slot. Order matters — the bucket
    /// chain must be walked before the entry's name is cleared.
    fn evict_tail(&mut self) {
        let Some(tail_idx) = self.tail else { return };
        self.unlink_from_list(tail_idx);
        let bucket = Self::bucket_of(&self.arena[tail_idx].name);
        self.unlink_from_bucket(tail_idx, bucket);
        self.arena[tail_idx].name.clear();
        self.free.push(tail_idx);
        self.len -= 1;
    }

    fn get(&mut self, name: &str) -> Option<Outcome> {
        match self.find(name) {
            Some(idx) => {
                self.arena[idx].hits += 1;
                self.move_to_front(idx);
                self.hits += 1;
                Some(self.arena[idx].outcome)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    fn put(&mut self, name: &str, outcome: Outcome) {
        if let Some(idx) = self.find(name) {
            self.arena[idx].outcome = outcome;
            self.move_to_front(idx);
            return;
        }

        if self.len >= self.capacity {
            self.evict_tail();
        }

        let bucket = Self::bucket_of(name);
        let idx = if let Some(reused) = self.free.pop() {
            self.arena[reused] = Entry {
                name: name.to_string(),
                outcome,
                hits: 0,
                prev: None,
                next: None,
                bucket_next: self.buckets[bucket],
            };
            reused
        } else {
            self.arena.push(Entry {
                name: name.to_string(),
                outcome,
                hits: 0,
                prev: None,
                next: None,
                bucket_next: self.buckets[bucket],
            });
            self.arena.len() - 1
        };
        self.buckets[bucket] = Some(idx);
        self.push_front(idx);
        self.len += 1;
    }
}

/// FNV-1a 32-bit: cheap, well-distributed, no seeding needed for a
/// fixed in-process bucket table.
fn fnv1a(s: &str) -> u32 {
    let mut hash: u32 = 2166136261;
    for b in s.bytes() {
        hash ^= b as u32;
        hash = hash.wrapping_mul(16777619);
    }
    hash
}

/// Counters surfaced at `close()` for observability.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub len: usize,
    pub capacity: usize,
}

impl CacheStats {
    pub fn hit_rate_pct(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Thread-safe, capacity-bounded LRU cache of `Name → Outcome`.
pub struct RecencyCache {
    inner: RwLock<Inner>,
}

impl RecencyCache {
    pub fn new(capacity: usize) -> Self {
        Self { inner: RwLock::new(Inner::new(capacity.max(1))) }
    }

    /// Looks up `name`. Always takes the write lock, even on a pure
    /// read, because a hit must promote the entry to the list head —
    /// see the module doc comment for why an upgradeable read lock is
    /// deliberately not used here.
    pub fn get(&self, name: &str) -> Option<Outcome> {
        self.inner.write().get(name)
    }

    pub fn put(&self, name: &str, outcome: Outcome) {
        self.inner.write().put(name, outcome);
    }

    pub fn len(&self) -> usize {
        self.inner.read().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.read();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            len: inner.len,
            capacity: inner.capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_hits() {
        let cache = RecencyCache::new(4);
        cache.put("example.com", Outcome::Terminate);
        assert_eq!(cache.get("example.com"), Some(Outcome::Terminate));
    }

    #[test]
    fn miss_returns_none() {
        let cache = RecencyCache::new(4);
        assert_eq!(cache.get("nope.com"), None);
    }

    #[test]
    fn exactly_one_entry_per_key() {
        let cache = RecencyCache::new(4);
        cache.put("a.com", Outcome::None);
        cache.put("a.com", Outcome::Terminate);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a.com"), Some(Outcome::Terminate));
    }

    #[test]
    fn evicts_lru_tail_at_capacity() {
        let cache = RecencyCache::new(2);
        cache.put("a.com", Outcome::None);
        cache.put("b.com", Outcome::None);
        // touch a.com so b.com becomes the LRU tail
        cache.get("a.com");
        cache.put("c.com", Outcome::None);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("b.com"), None);
        assert!(cache.get("a.com").is_some());
        assert!(cache.get("c.com").is_some());
    }

    #[test]
    fn never_exceeds_capacity() {
        let cache = RecencyCache::new(8);
        for i in 0..100 {
            cache.put(&format!("host{i}.com"), Outcome::None);
        }
        assert!(cache.len() <= 8);
    }

    #[test]
    fn stats_track_hits_and_misses() {
        let cache = RecencyCache::new(4);
        cache.put("a.com", Outcome::None);
        cache.get("a.com");
        cache.get("missing.com");
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }
}
