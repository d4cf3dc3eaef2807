//! Pluggable shared-memory-region abstraction (spec §4.1 "storage layer").
//!
//! The original implementation backs each bridge entry with an OS shared
//! memory region named deterministically from the scoped key, so other
//! processes can attach to it by name alone. This workspace runs a single
//! process, so `LocalRegion` is the only implementation — but the trait
//! boundary is where a future cross-process backend (RPC or a real
//! shared-memory ring buffer, per spec §9's "Singleton manager state"
//! redesign note) would plug in without touching `Bridge` callers.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Computes the deterministic region name for a scoped bridge key (spec
/// §6: `syn_{hex16}` where `hex16` is the first 16 hex digits of a stable
/// hash of the scoped key).
pub fn region_name(scoped_key: &str) -> String {
    let mut hasher = DefaultHasher::new();
    scoped_key.hash(&mut hasher);
    format!("syn_{:016x}", hasher.finish())
}

pub trait StorageRegion: Send + Sync {
    fn name(&self) -> &str;
    fn read(&self) -> Vec<u8>;
    fn write(&mut self, bytes: Vec<u8>);
}

/// In-process stand-in for the original's `multiprocessing.shared_memory`
/// region: reuses its buffer if large enough, else reallocates (spec
/// §4.1 `set`: "reuses the region if large enough, else reallocates").
pub struct LocalRegion {
    name: String,
    bytes: Vec<u8>,
}

impl LocalRegion {
    pub fn new(name: impl Into<String>) -> Self {
        LocalRegion {
            name: name.into(),
            bytes: Vec::new(),
        }
    }
}

impl StorageRegion for LocalRegion {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    fn write(&mut self, bytes: Vec<u8>) {
        if bytes.len() <= self.bytes.capacity() {
            self.bytes.clear();
            self.bytes.extend_from_slice(&bytes);
        } else {
            self.bytes = bytes;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_name_is_deterministic() {
        assert_eq!(region_name("ROOT:foo"), region_name("ROOT:foo"));
        assert_ne!(region_name("ROOT:foo"), region_name("ROOT:bar"));
        assert!(region_name("ROOT:foo").starts_with("syn_"));
        assert_eq!(region_name("ROOT:foo").len(), "syn_".len() + 16);
    }
}
