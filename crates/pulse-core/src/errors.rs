//! Errores del motor (spec §7 "Error handling design").

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum EngineError {
    #[error("validation failed in node {node}: {message}")]
    ValidationFailure { node: String, message: String },
    #[error("runtime exception in node {node}: {message}")]
    RuntimeException { node: String, message: String },
    #[error("unhandled panic in node {node}: {message}")]
    Panic { node: String, message: String },
    #[error("pulse cancelled in scope {scope}")]
    Cancelled { scope: String },
    #[error("lock timeout on key {key} after {timeout_secs}s")]
    LockTimeout { key: String, timeout_secs: f64 },
    #[error("bridge write failed during shutdown: {0}")]
    ShutdownRace(String),
    #[error("missing node: {0}")]
    MissingNode(String),
    #[error("no start node in graph")]
    NoStartNode,
    #[error("internal: {0}")]
    Internal(String),
}

impl EngineError {
    /// Stable numeric code used when publishing the last-error object to
    /// the bridge (spec §4.4 `error_mapping`, §4.6.3 panic handler).
    pub fn code(&self) -> u32 {
        match self {
            EngineError::ValidationFailure { .. } => 1001,
            EngineError::RuntimeException { .. } => 1002,
            EngineError::Panic { .. } => 1003,
            EngineError::Cancelled { .. } => 1004,
            EngineError::LockTimeout { .. } => 1005,
            EngineError::ShutdownRace(_) => 1006,
            EngineError::MissingNode(_) => 1007,
            EngineError::NoStartNode => 1008,
            EngineError::Internal(_) => 1000,
        }
    }
}
