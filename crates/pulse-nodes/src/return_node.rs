//! The exit point for a graph or subgraph run. The engine's return-node
//! barrier (spec.md §4.6 step 1) intercepts this node before dispatch
//! and deposits its gathered inputs into the return lockbox directly,
//! so `execute` here is never actually called in the engine's normal
//! path — it exists only to satisfy the node contract. Grounded on
//! `synapse/nodes/lib/return_node.py`.

use pulse_core::{Bridge, EngineError, NodeContract, NodeInputs, NodeOutputs, ScopeStack};
use pulse_domain::{DataType, NodeFlags};
use std::collections::HashMap;
use std::sync::Arc;

pub struct ReturnNode;

impl NodeContract for ReturnNode {
    fn node_type(&self) -> &str {
        "ReturnNode"
    }

    fn flags(&self) -> NodeFlags {
        NodeFlags {
            is_native: true,
            allow_dynamic_inputs: true,
            ..Default::default()
        }
    }

    fn input_schema(&self) -> HashMap<String, DataType> {
        HashMap::from([("Flow".to_string(), DataType::Flow)])
    }

    fn execute(
        &self,
        _node_id: &str,
        _inputs: NodeInputs,
        _context_stack: &ScopeStack,
        _bridge: &Arc<Bridge>,
    ) -> Result<NodeOutputs, EngineError> {
        Ok(NodeOutputs::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::Bridge;

    #[test]
    fn allows_dynamic_inputs_beyond_flow() {
        assert!(ReturnNode.flags().allow_dynamic_inputs);
    }

    #[test]
    fn execute_is_a_no_op_when_called_directly() {
        let bridge = Bridge::new();
        let outputs = ReturnNode
            .execute("ret", NodeInputs::new(), &ScopeStack::new(), &bridge)
            .unwrap();
        assert!(outputs.is_empty());
    }
}
