//! Node Dispatcher: selects an execution mode per node and returns a
//! future-like handle (spec §4.5). Grounded on
//! `synapse/core/node_dispatcher.py`'s method surface (`dispatch`,
//! `FutureResult`/`PooledFuture` wait/result shape, `shutdown`).

use crate::bridge::Bridge;
use crate::errors::EngineError;
use crate::flow::ScopeStack;
use crate::node_contract::{NodeContract, NodeInputs, NodeOutputs};
use once_cell::sync::Lazy;
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::oneshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    Native,
    CooperativeAsync,
    Heavy,
}

/// Cooperative tasks (`is_async` nodes) all run on this single dedicated
/// worker runtime (spec §4.5: "a single dedicated cooperative worker").
static COOPERATIVE_WORKER: Lazy<Runtime> = Lazy::new(|| {
    Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("synapse-cooperative")
        .enable_all()
        .build()
        .expect("failed to start cooperative worker runtime")
});

/// Heavy nodes stand in for the original's process pool: a bounded
/// tokio blocking-task pool sized to host parallelism (spec §4.5
/// "Heavy"). Inputs must still be plain, serialisable values.
static HEAVY_POOL: Lazy<Runtime> = Lazy::new(|| {
    let parallelism = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);
    Builder::new_multi_thread()
        .worker_threads(parallelism)
        .thread_name("synapse-heavy")
        .enable_all()
        .build()
        .expect("failed to start heavy worker pool")
});

/// Native (CPU-bound) nodes run on this rayon-backed pool (spec §4.5
/// "Native": "default 32").
static NATIVE_POOL: Lazy<rayon::ThreadPool> = Lazy::new(|| {
    rayon::ThreadPoolBuilder::new()
        .num_threads(crate::constants::DEFAULT_NATIVE_POOL_SIZE)
        .thread_name(|i| format!("synapse-native-{i}"))
        .build()
        .expect("failed to build native thread pool")
});

/// A blocking-`wait()` future handle (spec §4.5: "a future-like handle
/// ... supports blocking `wait()` that re-raises any error").
pub struct PendingDispatch {
    receiver: oneshot::Receiver<Result<NodeOutputs, EngineError>>,
}

impl PendingDispatch {
    pub fn wait(self) -> Result<NodeOutputs, EngineError> {
        self.receiver
            .blocking_recv()
            .unwrap_or_else(|_| Err(EngineError::Internal("dispatch task dropped".into())))
    }
}

pub struct NodeDispatcher {
    stopped: std::sync::atomic::AtomicBool,
}

impl Default for NodeDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeDispatcher {
    pub fn new() -> Self {
        NodeDispatcher {
            stopped: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// `dispatch(node, inputs, context_stack)` (spec §4.5). Consults the
    /// hijack registry before running; augments `inputs` with
    /// `hijack_provider_id`/a flag when a handler is registered, exactly
    /// as the original does, then proceeds with normal dispatch.
    pub fn dispatch(
        &self,
        node_id: String,
        node: Arc<dyn NodeContract>,
        mut inputs: NodeInputs,
        context_stack: ScopeStack,
        bridge: Arc<Bridge>,
    ) -> PendingDispatch {
        if let Some(handler_node) = bridge.get_hijack_handler(&context_stack, node.node_type()) {
            inputs.insert("hijack_provider_id".to_string(), pulse_domain::Value::String(handler_node));
            inputs.insert("hijack_active".to_string(), pulse_domain::Value::Bool(true));
        }

        let (tx, rx) = oneshot::channel();
        let mode = if node.flags().is_async {
            DispatchMode::CooperativeAsync
        } else if node.flags().is_native {
            DispatchMode::Native
        } else {
            DispatchMode::Heavy
        };

        match mode {
            DispatchMode::Native => {
                NATIVE_POOL.spawn(move || {
                    let result = node.execute(&node_id, inputs, &context_stack, &bridge);
                    let _ = tx.send(result);
                });
            }
            DispatchMode::CooperativeAsync => {
                COOPERATIVE_WORKER.spawn(async move {
                    let result = node.execute_async(node_id, inputs, context_stack, bridge).await;
                    let _ = tx.send(result);
                });
            }
            DispatchMode::Heavy => {
                HEAVY_POOL.spawn_blocking(move || {
                    let result = node.execute(&node_id, inputs, &context_stack, &bridge);
                    let _ = tx.send(result);
                });
            }
        }

        PendingDispatch { receiver: rx }
    }

    /// `shutdown()` (spec §4.5): marks stopped; does not wait for
    /// in-flight tasks, matching the original's "shuts down... without
    /// waiting".
    pub fn shutdown(&self) {
        self.stopped.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(std::sync::atomic::Ordering::SeqCst)
    }
}
