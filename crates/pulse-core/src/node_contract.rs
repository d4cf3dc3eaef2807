//! The contract every bundled node type implements: schema declaration
//! plus the handler body the dispatcher invokes (spec §3 "Node", §4.5,
//! §4.7 "Node library contract").

use crate::bridge::Bridge;
use crate::errors::EngineError;
use crate::flow::ScopeStack;
use async_trait::async_trait;
use pulse_domain::{DataType, NodeFlags, Value};
use std::collections::HashMap;
use std::sync::Arc;

pub type NodeInputs = HashMap<String, Value>;
pub type NodeOutputs = HashMap<String, Value>;

/// Every node family implements this trait once; the dispatcher picks
/// `execute` or `execute_async` based on `flags().is_async` (spec
/// §4.5).
#[async_trait]
pub trait NodeContract: Send + Sync {
    fn node_type(&self) -> &str;

    fn flags(&self) -> NodeFlags {
        NodeFlags::default()
    }

    fn input_schema(&self) -> HashMap<String, DataType> {
        HashMap::new()
    }

    fn output_schema(&self) -> HashMap<String, DataType> {
        HashMap::new()
    }

    /// Runs synchronously (native or heavy dispatch modes).
    fn execute(
        &self,
        node_id: &str,
        inputs: NodeInputs,
        context_stack: &ScopeStack,
        bridge: &Arc<Bridge>,
    ) -> Result<NodeOutputs, EngineError>;

    /// Runs cooperatively (spec §4.5 "Cooperative-async"). Default
    /// implementation just defers to the synchronous body, so nodes
    /// that don't need suspension points can skip overriding this.
    async fn execute_async(
        &self,
        node_id: String,
        inputs: NodeInputs,
        context_stack: ScopeStack,
        bridge: Arc<Bridge>,
    ) -> Result<NodeOutputs, EngineError> {
        self.execute(&node_id, inputs, &context_stack, &bridge)
    }

    /// Providers override this to validate/stash per-scope state when
    /// their scope opens (spec §4.6 step 5 provider validation).
    fn register_provider_context(&self, _node_id: &str, _bridge: &Arc<Bridge>) {}

    /// Providers override this to release per-scope state when their
    /// scope is torn down (spec §3 invariants: "cleanup hook invoked
    /// unless declared singleton").
    fn cleanup_provider_context(&self, _node_id: &str, _bridge: &Arc<Bridge>) {}

    /// Called once at engine shutdown or hot-reload removal (spec §3
    /// "Node" lifecycle).
    fn terminate(&self, _node_id: &str, _bridge: &Arc<Bridge>) {}
}
