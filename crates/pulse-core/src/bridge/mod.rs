//! The Bridge: a scoped, versioned, lock-protected key-value store (spec
//! §4.1). Grounded on `synapse/core/bridge.py`'s public method surface.

mod lock_pool;
mod storage;

pub use lock_pool::LockPool;
pub use storage::{region_name, LocalRegion, StorageRegion};

use crate::constants::{PROVIDER_LOCK_POOL_SIZE, VARIABLE_LOCK_POOL_SIZE};
use crate::errors::EngineError;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use pulse_domain::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

const GLOBAL_SCOPE: &str = "Global";

struct BridgeEntry {
    region: Mutex<LocalRegion>,
    version: u64,
    timestamp: DateTime<Utc>,
}

impl BridgeEntry {
    fn write(scoped_key: &str, value: &Value, prior_version: u64) -> Self {
        let bytes = serde_json::to_vec(value).unwrap_or_default();
        let mut region = LocalRegion::new(region_name(scoped_key));
        region.write(bytes);
        BridgeEntry {
            region: Mutex::new(region),
            version: prior_version + 1,
            timestamp: Utc::now(),
        }
    }

    fn read_value(&self) -> Value {
        let bytes = self.region.lock().read();
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    }
}

/// State shared between a bridge and every child bridge spawned for a
/// subgraph run (spec §4.1 "Lifecycle": "child engines inherit the
/// parent's system-state ... but keep their own variables-registry").
struct SystemState {
    variable_locks: LockPool,
    provider_locks: LockPool,
    identities: DashMap<String, Value>,
    hijack_registry: DashMap<String, Vec<(String, String)>>,
    advisory_locks: DashMap<String, (String, Instant)>,
}

impl SystemState {
    fn new() -> Self {
        SystemState {
            variable_locks: LockPool::new(VARIABLE_LOCK_POOL_SIZE),
            provider_locks: LockPool::new(PROVIDER_LOCK_POOL_SIZE),
            identities: DashMap::new(),
            hijack_registry: DashMap::new(),
            advisory_locks: DashMap::new(),
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct BridgeSnapshot {
    entries: HashMap<String, (Value, u64)>,
}

/// The shared data plane. One bridge per engine instance; child engines
/// (subgraph runs) get a `Bridge::child_of` that shares lock pools,
/// identity table and hijack registry with the root but keeps its own
/// variables registry, per spec §4.1.
pub struct Bridge {
    system: Arc<SystemState>,
    root: Option<Arc<Bridge>>,
    pub default_scope: Mutex<String>,
    entries: DashMap<String, BridgeEntry>,
}

impl Bridge {
    pub fn new() -> Arc<Self> {
        Arc::new(Bridge {
            system: Arc::new(SystemState::new()),
            root: None,
            default_scope: Mutex::new(GLOBAL_SCOPE.to_string()),
            entries: DashMap::new(),
        })
    }

    /// Spawns a child bridge for a subgraph engine instance (spec §4.1
    /// Lifecycle, §4.6 construction: "child engines inherit the parent's
    /// system-state ... but keep their own variables-registry").
    pub fn child_of(parent: &Arc<Bridge>) -> Arc<Self> {
        let root = parent.root.clone().unwrap_or_else(|| Arc::clone(parent));
        Arc::new(Bridge {
            system: Arc::clone(&parent.system),
            root: Some(root),
            default_scope: Mutex::new(GLOBAL_SCOPE.to_string()),
            entries: DashMap::new(),
        })
    }

    pub fn set_default_scope(&self, scope: impl Into<String>) {
        *self.default_scope.lock() = scope.into();
    }

    fn resolve_scope<'a>(&self, scope: Option<&'a str>) -> String {
        match scope {
            Some(s) => s.to_string(),
            None => self.default_scope.lock().clone(),
        }
    }

    /// `set(key, value, source, scope?)` (spec §4.1). Failures during
    /// in-process operation cannot occur — in the original these are
    /// transient pipe/EOF errors during process teardown, which have no
    /// analogue in a single-process bridge; see §9 "Silent swallowing of
    /// pipe errors" for why the target makes shutdown explicit instead.
    pub fn set(&self, key: &str, value: Value, _source: &str, scope: Option<&str>) {
        let scope = self.resolve_scope(scope);
        let scoped_key = format!("{scope}:{key}");
        let _guard = self.system.variable_locks.guard(&scoped_key);
        let prior_version = self.entries.get(&scoped_key).map(|e| e.version).unwrap_or(0);
        let entry = BridgeEntry::write(&scoped_key, &value, prior_version);
        self.entries.insert(scoped_key, entry);
    }

    pub fn set_batch(&self, mapping: HashMap<String, Value>, source: &str, scope: Option<&str>) {
        let scope = self.resolve_scope(scope);
        // One metadata pass after every payload is prepared (spec §4.1
        // set_batch: "one metadata-table update after all payloads are
        // written").
        let mut prepared = Vec::with_capacity(mapping.len());
        for (key, value) in mapping {
            let scoped_key = format!("{scope}:{key}");
            let _guard = self.system.variable_locks.guard(&scoped_key);
            let prior_version = self.entries.get(&scoped_key).map(|e| e.version).unwrap_or(0);
            prepared.push((scoped_key.clone(), BridgeEntry::write(&scoped_key, &value, prior_version)));
        }
        for (scoped_key, entry) in prepared {
            self.entries.insert(scoped_key, entry);
        }
        let _ = source;
    }

    fn try_read(&self, scoped_key: &str) -> Option<Value> {
        self.entries.get(scoped_key).map(|e| e.read_value())
    }

    /// `get(key, default?, scope?)` (spec §4.1). Resolution order:
    /// `scope:key -> Global:key -> key -> (root-bridge variants)`.
    pub fn get(&self, key: &str, scope: Option<&str>) -> Option<Value> {
        let scope = self.resolve_scope(scope);
        if let Some(v) = self.try_read(&format!("{scope}:{key}")) {
            return Some(v);
        }
        if let Some(v) = self.try_read(&format!("{GLOBAL_SCOPE}:{key}")) {
            return Some(v);
        }
        if let Some(v) = self.try_read(key) {
            return Some(v);
        }
        if let Some(root) = &self.root {
            return root.get(key, Some(&scope));
        }
        None
    }

    pub fn get_or(&self, key: &str, default: Value, scope: Option<&str>) -> Value {
        self.get(key, scope).unwrap_or(default)
    }

    pub fn get_batch(&self, keys: &[&str], scope: Option<&str>) -> HashMap<String, Value> {
        keys.iter()
            .filter_map(|k| self.get(k, scope).map(|v| (k.to_string(), v)))
            .collect()
    }

    /// `bubble_set` (spec §4.1): writes locally, and if this bridge has a
    /// distinct root, also publishes to the root so status/error signals
    /// reach the outermost observer.
    pub fn bubble_set(&self, key: &str, value: Value, source: &str, scope: Option<&str>) {
        self.set(key, value.clone(), source, scope);
        if let Some(root) = &self.root {
            root.set(key, value, source, scope);
        }
    }

    pub fn increment(&self, key: &str, amount: f64, scope: Option<&str>) -> f64 {
        let current = self.get(key, scope).and_then(|v| v.as_f64()).unwrap_or(0.0);
        let next = current + amount;
        self.set(key, Value::Float(next), "Bridge.increment", scope);
        next
    }

    pub fn decrement(&self, key: &str, amount: f64, scope: Option<&str>) -> f64 {
        self.increment(key, -amount, scope)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    // --- Identity table (spec §4.1) ---

    pub fn register_identity(&self, app_id: &str, identity: Value) {
        self.system.identities.insert(app_id.to_string(), identity);
    }

    pub fn get_identity(&self, app_id: &str) -> Option<Value> {
        self.system.identities.get(app_id).map(|v| v.clone())
    }

    pub fn update_identity_auth(&self, app_id: &str, auth_patch: HashMap<String, Value>) {
        let mut entry = self
            .system
            .identities
            .entry(app_id.to_string())
            .or_insert_with(|| Value::Dict(HashMap::new()));
        if let Value::Dict(map) = entry.value_mut() {
            let auth = map
                .entry("auth".to_string())
                .or_insert_with(|| Value::Dict(HashMap::new()));
            if let Value::Dict(auth_map) = auth {
                auth_map.extend(auth_patch);
            }
        }
    }

    // --- Hijack registry (spec §4.1) ---

    pub fn register_super_function(&self, provider_id: &str, func_name: &str, handler_node_id: &str) {
        self.system
            .hijack_registry
            .entry(provider_id.to_string())
            .or_default()
            .push((func_name.to_string(), handler_node_id.to_string()));
    }

    pub fn unregister_super_functions(&self, provider_id: &str) {
        self.system.hijack_registry.remove(provider_id);
    }

    /// Searches `scope_stack` innermost-to-outermost for a registered
    /// override of `func_name` (spec §4.1, §GLOSSARY "Hijack").
    pub fn get_hijack_handler(&self, scope_stack: &[String], func_name: &str) -> Option<String> {
        for scope_id in scope_stack.iter().rev() {
            if let Some(entries) = self.system.hijack_registry.get(scope_id) {
                if let Some((_, handler)) = entries.iter().find(|(f, _)| f == func_name) {
                    return Some(handler.clone());
                }
            }
        }
        None
    }

    // --- Advisory locks (spec §4.1, §5) ---

    pub fn lock(&self, key: &str, node_id: &str, timeout_secs: f64) -> Result<(), EngineError> {
        let deadline = Instant::now() + Duration::from_secs_f64(timeout_secs);
        loop {
            {
                let mut acquired = false;
                self.system
                    .advisory_locks
                    .entry(key.to_string())
                    .and_modify(|_| {})
                    .or_insert_with(|| {
                        acquired = true;
                        (node_id.to_string(), Instant::now())
                    });
                if acquired {
                    return Ok(());
                }
                if let Some(existing) = self.system.advisory_locks.get(key) {
                    if existing.0 == node_id {
                        return Ok(());
                    }
                }
            }
            if Instant::now() >= deadline {
                log::warn!("lock timeout on key {key} requested by {node_id}");
                return Err(EngineError::LockTimeout {
                    key: key.to_string(),
                    timeout_secs,
                });
            }
            std::thread::sleep(Duration::from_millis(20));
        }
    }

    pub fn unlock(&self, key: &str, node_id: &str) {
        match self.system.advisory_locks.get(key) {
            Some(owner) if owner.0 == node_id => {
                drop(owner);
                self.system.advisory_locks.remove(key);
            }
            Some(_) => {
                log::error!("unlock({key}) by {node_id} who is not the owner");
            }
            None => {
                log::error!("unlock({key}) on a key that is not locked");
            }
        }
    }

    // --- Snapshot / time-travel (spec §4.1) ---

    pub fn export_state(&self) -> BridgeSnapshot {
        let entries = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), (e.read_value(), e.version)))
            .collect();
        BridgeSnapshot { entries }
    }

    pub fn import_state(&self, snapshot: BridgeSnapshot) {
        self.entries.clear();
        for (scoped_key, (value, version)) in snapshot.entries {
            self.entries
                .insert(scoped_key.clone(), BridgeEntry::write(&scoped_key, &value, version.saturating_sub(1)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips_in_default_scope() {
        let bridge = Bridge::new();
        bridge.set("foo", Value::Int(42), "test", None);
        assert_eq!(bridge.get("foo", None), Some(Value::Int(42)));
    }

    #[test]
    fn scope_fallback_prefers_explicit_scope_over_global() {
        let bridge = Bridge::new();
        bridge.set("k", Value::String("global-value".into()), "t", Some("Global"));
        bridge.set("k", Value::String("scoped-value".into()), "t", Some("S1"));
        assert_eq!(
            bridge.get("k", Some("S1")),
            Some(Value::String("scoped-value".into()))
        );
    }

    #[test]
    fn child_bridge_shares_hijack_registry_with_root() {
        let root = Bridge::new();
        root.register_super_function("prov1", "DoThing", "handler_node");
        let child = Bridge::child_of(&root);
        assert_eq!(
            child.get_hijack_handler(&["prov1".to_string()], "DoThing"),
            Some("handler_node".to_string())
        );
    }

    #[test]
    fn export_import_round_trips() {
        let bridge = Bridge::new();
        bridge.set("a", Value::Int(1), "t", Some("S"));
        let snap = bridge.export_state();
        let restored = Bridge::new();
        restored.import_state(snap);
        assert_eq!(restored.get("a", Some("S")), Some(Value::Int(1)));
    }

    #[test]
    fn lock_then_unlock_allows_new_owner() {
        let bridge = Bridge::new();
        bridge.lock("k", "node-a", 1.0).unwrap();
        assert!(bridge.lock("k", "node-b", 0.05).is_err());
        bridge.unlock("k", "node-a");
        assert!(bridge.lock("k", "node-b", 1.0).is_ok());
    }
}
