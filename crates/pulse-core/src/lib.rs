//! The runtime core: bridge, port registry, flow controller, context
//! manager, node dispatcher and execution engine that together make up
//! the pulse engine (spec §4).

pub mod bridge;
pub mod constants;
pub mod context;
pub mod dispatch;
pub mod engine;
pub mod errors;
pub mod flow;
pub mod node_contract;
pub mod ports;
pub mod trace;

pub use bridge::{Bridge, BridgeSnapshot};
pub use context::ContextManager;
pub use dispatch::{DispatchMode, NodeDispatcher};
pub use engine::{EngineConfig, ExecutionEngine, GraphSnapshot};
pub use errors::EngineError;
pub use flow::{FlowController, FlowSnapshot, Pulse, RouteOptions, ScopeStack, TriggeredPulse};
pub use node_contract::{NodeContract, NodeInputs, NodeOutputs};
pub use ports::{Direction, PortRegistry};
pub use trace::TraceEvent;
