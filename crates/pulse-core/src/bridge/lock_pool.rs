//! Fixed-size, hash-mapped lock pools (spec §5 "Shared-resource policy":
//! a 32-entry pool for ordinary keys, a separate 128-entry pool for
//! per-provider locks, so the two contention domains never interfere).

use parking_lot::{Mutex, MutexGuard};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub struct LockPool {
    slots: Vec<Mutex<()>>,
}

impl LockPool {
    pub fn new(size: usize) -> Self {
        let mut slots = Vec::with_capacity(size);
        for _ in 0..size {
            slots.push(Mutex::new(()));
        }
        LockPool { slots }
    }

    fn index_for(&self, key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.slots.len()
    }

    /// Acquires the lock guarding `key`'s slot. Total write ordering
    /// within one key is guaranteed by always hashing to the same slot
    /// (spec §3 invariant: "Bridge writes to a key are totally ordered
    /// under the per-key lock").
    pub fn guard(&self, key: &str) -> MutexGuard<'_, ()> {
        self.slots[self.index_for(key)].lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_key_always_same_slot() {
        let pool = LockPool::new(32);
        assert_eq!(pool.index_for("a"), pool.index_for("a"));
    }
}
