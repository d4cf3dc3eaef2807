//! Named constants shared across the engine: reserved bridge keys, pool
//! sizes, and the legacy port-name sets (spec §5, §6, §4.3).

/// Legacy flow-completion port names consulted as the fallback rule in
/// `FlowController::route_outputs` (spec §4.3 rule 3). `Finished Flow` and
/// `Done` are treated as aliases per the Open Question resolution in
/// DESIGN.md — both are plain members of this list.
pub const LEGACY_FLOW_PORTS: &[&str] = &[
    "Flow",
    "True",
    "False",
    "Out",
    "Exec",
    "Then",
    "Else",
    "Loop",
    "Try",
    "Catch",
    "Finished Flow",
    "Done",
    "Success",
    "Failure",
];

/// Ports consulted when a provider scope drains and its completion flow
/// fires (spec §4.6 step 10/13, scope-termination sweep).
pub const COMPLETION_PORTS: &[&str] = &["Flow", "Out", "Done", "Success", "True", "False"];

/// Reserved input-port names never included in a return-node's gathered
/// payload (spec §4.6.2).
pub const RETURN_RESERVED_PORTS: &[&str] = &[
    "Flow",
    "Exec",
    "In",
    "_trigger",
    "_bridge",
    "_engine",
    "_context_stack",
    "_context_pulse",
];

/// Substrings that mark a port as UI-only; such ports are never carried
/// into gathered inputs or the return lockbox (spec §4.6.1, §4.6.2).
pub const BLOCKED_UI_KEYWORDS: &[&str] =
    &["color", "additional", "schema", "label", "context", "provider"];

/// System-prefixed keys bypass the blocked-keyword scrub entirely (spec
/// §4.6.2: "Keys beginning with the system prefix `_SYNP_` pass through
/// unchanged").
pub const SYSTEM_KEY_PREFIX: &str = "_SYNP_";

/// Scope sentinel for the outermost, always-present scope (spec §3).
pub const ROOT_SCOPE: &str = "ROOT";

/// Default sizing, per spec §5 "Scheduling model".
pub const DEFAULT_NATIVE_POOL_SIZE: usize = 32;
pub const VARIABLE_LOCK_POOL_SIZE: usize = 32;
pub const PROVIDER_LOCK_POOL_SIZE: usize = 128;
pub const DEFAULT_LOCK_TIMEOUT_SECS: f64 = 5.0;

/// Idle-loop and hot-reload poll intervals (spec §4.6 main loop, step 3).
pub const STEP_IDLE_SLEEP_MS: u64 = 10;
pub const CONTROL_CHECK_INTERVAL_SECS: f64 = 0.5;
pub const HOT_RELOAD_CHECK_INTERVAL_SECS: f64 = 2.0;

/// Reserved bridge keys forming the engine<->host contract (spec §6).
pub const KEY_SYSTEM_STOP: &str = "_SYSTEM_STOP";
pub const KEY_SYSTEM_SHUTDOWN: &str = "_SYSTEM_SHUTDOWN";
pub const KEY_SYSTEM_HEADLESS: &str = "_SYSTEM_HEADLESS";
pub const KEY_SYSTEM_PAUSE_FILE: &str = "_SYSTEM_PAUSE_FILE";
pub const KEY_SYSTEM_STOP_FILE: &str = "_SYSTEM_STOP_FILE";
pub const KEY_SYSTEM_STEP_BACK: &str = "_SYSTEM_STEP_BACK";
pub const KEY_SYSTEM_TRACE_ENABLED: &str = "_SYSTEM_TRACE_ENABLED";
pub const KEY_SYSTEM_TRACE_SUBGRAPHS: &str = "_SYSTEM_TRACE_SUBGRAPHS";
pub const KEY_SYSTEM_RUN_ID: &str = "_SYSTEM_RUN_ID";
pub const KEY_OS_TYPE: &str = "_OS_TYPE";
pub const KEY_PANICKED: &str = "_PANICKED";
pub const KEY_SYNP_YIELD: &str = "_SYNP_YIELD";
pub const KEY_SYNP_PARENT_NODE_ID: &str = "_SYNP_PARENT_NODE_ID";
pub const KEY_SYNP_SUBGRAPH_ID: &str = "_SYNP_SUBGRAPH_ID";

pub fn key_cancel_scope(scope_id: &str) -> String {
    format!("SYNAPSE_CANCEL_SCOPE_{scope_id}")
}

pub fn key_subgraph_return(parent_id: Option<&str>) -> String {
    match parent_id {
        Some(id) => format!("SUBGRAPH_RETURN_{id}"),
        None => "SUBGRAPH_RETURN".to_string(),
    }
}

pub fn key_last_error_code() -> &'static str {
    "_SYSTEM_LAST_ERROR_CODE"
}
pub fn key_last_error_message() -> &'static str {
    "_SYSTEM_LAST_ERROR_MESSAGE"
}
pub fn key_last_error_node() -> &'static str {
    "_SYSTEM_LAST_ERROR_NODE"
}
pub fn key_last_error_node_name() -> &'static str {
    "_SYSTEM_LAST_ERROR_NODE_NAME"
}
