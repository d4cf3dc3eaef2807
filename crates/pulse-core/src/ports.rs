//! Port Registry: stable per-engine identifiers for `(node, port,
//! direction)` triples (spec §4.2). Grounded on
//! `synapse/core/port_registry.py`'s method surface.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortKey {
    pub node_id: String,
    pub port_name: String,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Input,
    Output,
}

#[derive(Debug, Clone)]
struct PortRecord {
    node_id: String,
    port_name: String,
    direction: Direction,
    node_name: String,
}

/// Assigns opaque, stable identifiers within one engine instance. Spec
/// §4.2: identifiers "must not appear in the persisted graph file" — they
/// exist purely to give the Bridge a fast, collision-free key per port.
pub struct PortRegistry {
    next_id: AtomicU64,
    forward: DashMap<PortKey, String>,
    reverse: DashMap<String, PortRecord>,
}

impl Default for PortRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PortRegistry {
    pub fn new() -> Self {
        PortRegistry {
            next_id: AtomicU64::new(1),
            forward: DashMap::new(),
            reverse: DashMap::new(),
        }
    }

    /// `register(node_id, port_name, direction, node_name)` — idempotent
    /// under case-insensitive port name (spec §4.2).
    pub fn register(
        &self,
        node_id: &str,
        port_name: &str,
        direction: Direction,
        node_name: &str,
    ) -> String {
        let key = PortKey {
            node_id: node_id.to_string(),
            port_name: port_name.to_ascii_lowercase(),
            direction,
        };
        if let Some(existing) = self.forward.get(&key) {
            return existing.clone();
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let identifier = format!("port_{id:016x}");
        self.forward.insert(key, identifier.clone());
        self.reverse.insert(
            identifier.clone(),
            PortRecord {
                node_id: node_id.to_string(),
                port_name: port_name.to_string(),
                direction,
                node_name: node_name.to_string(),
            },
        );
        identifier
    }

    pub fn get_identifier(&self, node_id: &str, port_name: &str, direction: Direction) -> Option<String> {
        let key = PortKey {
            node_id: node_id.to_string(),
            port_name: port_name.to_ascii_lowercase(),
            direction,
        };
        self.forward.get(&key).map(|v| v.clone())
    }

    /// `bridge_key` — register-if-missing, always returns a key.
    pub fn bridge_key(&self, node_id: &str, port_name: &str, direction: Direction) -> String {
        self.register(node_id, port_name, direction, "")
    }

    /// `resolve(identifier) -> "NodeName.PortName"` for diagnostics.
    pub fn resolve(&self, identifier: &str) -> Option<String> {
        self.reverse
            .get(identifier)
            .map(|r| format!("{}.{}", r.node_name, r.port_name))
    }

    pub fn resolve_key(&self, identifier: &str) -> Option<(String, String, Direction)> {
        self.reverse
            .get(identifier)
            .map(|r| (r.node_id.clone(), r.port_name.clone(), r.direction))
    }

    /// The legacy bridge-key fallback kept for backward compatibility
    /// with graphs saved before the port registry existed (spec §4.2).
    pub fn legacy_key(node_id: &str, port_name: &str) -> String {
        format!("{node_id}_{port_name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_is_idempotent_case_insensitive() {
        let reg = PortRegistry::new();
        let a = reg.register("n1", "Flow", Direction::Output, "Node1");
        let b = reg.register("n1", "flow", Direction::Output, "Node1");
        assert_eq!(a, b);
    }

    #[test]
    fn legacy_key_matches_spec_format() {
        assert_eq!(PortRegistry::legacy_key("n1", "Flow"), "n1_Flow");
    }
}
