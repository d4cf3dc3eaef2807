//! Return Lockbox: per-scope deferred return payloads, flushed into the
//! bridge's `SUBGRAPH_RETURN[_{parent_id}]` key when a scope drains
//! (spec §3 "Scope", §4.6 steps 1 and the scope-termination sweep).

use crate::bridge::Bridge;
use crate::constants::{
    key_subgraph_return, BLOCKED_UI_KEYWORDS, RETURN_RESERVED_PORTS, SYSTEM_KEY_PREFIX,
};
use parking_lot::Mutex;
use pulse_domain::Value;
use std::collections::HashMap;

#[derive(Default)]
pub struct ReturnLockbox {
    payloads: Mutex<HashMap<String, HashMap<String, Value>>>,
}

/// True if `key` is allowed into a gathered return payload (spec
/// §4.6.2): system-prefixed keys always pass; reserved port names and
/// UI-only substrings never do.
pub fn is_returnable_key(key: &str) -> bool {
    if key.starts_with(SYSTEM_KEY_PREFIX) {
        return true;
    }
    if RETURN_RESERVED_PORTS.contains(&key) {
        return false;
    }
    let lower = key.to_ascii_lowercase();
    !BLOCKED_UI_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

impl ReturnLockbox {
    pub fn new() -> Self {
        ReturnLockbox::default()
    }

    /// Deposits a return-node's gathered payload for `scope_id`, already
    /// filtered by `is_returnable_key` at the call site.
    pub fn deposit(&self, scope_id: &str, payload: HashMap<String, Value>) {
        let mut payloads = self.payloads.lock();
        payloads
            .entry(scope_id.to_string())
            .or_default()
            .extend(payload);
    }

    /// Flushes `scope_id`'s accumulated payload into
    /// `SUBGRAPH_RETURN[_{parent_id}]` on `bridge`, scrubbing any
    /// reserved/blocked keys already present so an explicit parent write
    /// cannot leak internal state (spec §4.6 scope-termination sweep).
    /// An existing write at the same key is overwritten — last flush
    /// wins, per the Open Question resolution in DESIGN.md.
    pub fn flush(&self, scope_id: &str, parent_id: Option<&str>, bridge: &Bridge) {
        let mut payloads = self.payloads.lock();
        let Some(payload) = payloads.remove(scope_id) else {
            return;
        };
        let key = key_subgraph_return(parent_id);
        let mut merged = match bridge.get(&key, None) {
            Some(Value::Dict(existing)) => existing,
            _ => HashMap::new(),
        };
        merged.retain(|k, _| is_returnable_key(k));
        merged.extend(payload);
        bridge.bubble_set(&key, Value::Dict(merged), "ReturnLockbox.flush", None);
    }

    pub fn has_pending(&self, scope_id: &str) -> bool {
        self.payloads.lock().contains_key(scope_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocked_keyword_is_rejected() {
        assert!(!is_returnable_key("NodeColor"));
        assert!(!is_returnable_key("Flow"));
        assert!(is_returnable_key("_SYNP_PARENT_NODE_ID"));
        assert!(is_returnable_key("total"));
    }

    #[test]
    fn deposit_then_flush_round_trips_through_bridge() {
        let bridge = Bridge::new();
        let lockbox = ReturnLockbox::new();
        let mut payload = HashMap::new();
        payload.insert("total".to_string(), Value::Int(7));
        lockbox.deposit("S1", payload);
        lockbox.flush("S1", Some("parent1"), &bridge);
        match bridge.get("SUBGRAPH_RETURN_parent1", None) {
            Some(Value::Dict(d)) => assert_eq!(d.get("total"), Some(&Value::Int(7))),
            other => panic!("expected dict, got {other:?}"),
        }
        assert!(!lockbox.has_pending("S1"));
    }
}
