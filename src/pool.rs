//! Store handle pool (C1).
//!
//! A fixed-size array of read-only handles, each assigned to a worker
//! by hashing the worker's identity into `[0, P)` on first use and
//! never rebalanced afterward, so no two workers ever contend over the
//! same handle's prepared-statement state. The whole pool is built
//! once, synchronously, inside `Core::open`'s single-threaded open
//! phase before any worker thread exists, so publishing a plain owned
//! `HandlePool` value to workers already gives an "exactly once,
//! visible-to-all-after" guarantee with no fence or one-shot
//! primitive needed — there's no concurrent first-use race to guard
//! against when construction finishes before any worker starts.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tracing::warn;

use crate::error::Result;
use crate::store::{PolicyStore, StoreHandle};

/// A fixed-size, worker-hashed pool of read-only store handles.
///
/// Built once during `Core::open` and never mutated afterward; every
/// field is either an owned `Box<dyn StoreHandle>` or `None` for a slot
/// whose handle failed to open — failure is per-slot, so the pool
/// keeps serving from whichever handles did open.
pub struct HandlePool {
    slots: Vec<Option<Box<dyn StoreHandle>>>,
    fallback: Option<Box<dyn StoreHandle>>,
}

impl HandlePool {
    /// Opens `size` handles against `store`, warms each one up, and
    /// publishes the pool. A single handle failing to open is logged
    /// and skipped, not fatal; if every slot fails, callers fall back
    /// to a process-global handle opened here as `fallback`.
    pub fn open(store: Arc<dyn PolicyStore>, size: usize) -> Result<Self> {
        let mut slots = Vec::with_capacity(size);
        let mut opened = 0usize;

        for i in 0..size {
            match store.open_handle() {
                Ok(handle) => {
                    if let Err(e) = handle.warmup() {
                        warn!(slot = i, error = %e, "pool handle warmup failed");
                    }
                    slots.push(Some(handle));
                    opened += 1;
                }
                Err(e) => {
                    warn!(slot = i, error = %e, "failed to open pool handle, skipping slot");
                    slots.push(None);
                }
            }
        }

        let fallback = if opened == 0 {
            warn!("every pool slot failed to open; opening a global fallback handle");
            store.open_handle().ok()
        } else {
            None
        };

        Ok(Self { slots, fallback })
    }

    /// Hashes `worker_id` into a slot and returns that slot's handle,
    /// falling back to the process-global handle (if any) when the
    /// assigned slot is empty. Returns `None` only when no handle
    /// exists anywhere in the pool — callers must treat that as
    /// "store unreachable" and fold into their own no-match fallback.
    pub fn handle_for(&self, worker_id: u64) -> Option<&dyn StoreHandle> {
        if self.slots.is_empty() {
            return self.fallback.as_deref();
        }
        let idx = (worker_id as usize) % self.slots.len();
        self.slots[idx]
            .as_deref()
            .or_else(|| self.fallback.as_deref())
    }

    /// Convenience for the current OS thread: hashes [`std::thread::ThreadId`]
    /// into the pool the same way [`Self::handle_for`] hashes any other
    /// worker identity.
    pub fn handle_for_current_thread(&self) -> Option<&dyn StoreHandle> {
        let mut hasher = DefaultHasher::new();
        std::thread::current().id().hash(&mut hasher);
        self.handle_for(hasher.finish())
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn opened_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;

    #[test]
    fn opens_requested_slots() {
        let store: Arc<dyn PolicyStore> = Arc::new(InMemoryStore::new());
        let pool = HandlePool::open(store, 4).unwrap();
        assert_eq!(pool.slot_count(), 4);
        assert_eq!(pool.opened_count(), 4);
    }

    #[test]
    fn same_worker_id_is_stable() {
        let store: Arc<dyn PolicyStore> = Arc::new(InMemoryStore::new());
        let pool = HandlePool::open(store, 8).unwrap();
        assert!(pool.handle_for(3).is_some());
        assert!(pool.handle_for(3).is_some());
    }

    #[test]
    fn current_thread_handle_resolves() {
        let store: Arc<dyn PolicyStore> = Arc::new(InMemoryStore::new());
        let pool = HandlePool::open(store, 2).unwrap();
        assert!(pool.handle_for_current_thread().is_some());
    }
}
