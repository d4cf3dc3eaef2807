//! Execution Engine: owns the per-run pulse loop, scope accounting, and
//! shutdown/hot-reload lifecycle (spec §4.6). Grounded on the full body
//! of `synapse/core/engine/execution_engine.py`.

mod core;
mod lockbox;

pub use core::{EngineConfig, ExecutionEngine, GraphSnapshot};
pub use lockbox::{is_returnable_key, ReturnLockbox};
