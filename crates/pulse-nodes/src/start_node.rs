//! The engine's entry point: fires its `Flow` output the instant the
//! run begins, and nothing else (spec.md §8 scenario 1).

use pulse_core::{Bridge, EngineError, NodeContract, NodeInputs, NodeOutputs, ScopeStack};
use pulse_domain::{DataType, NodeFlags};
use std::collections::HashMap;
use std::sync::Arc;

pub struct StartNode;

impl NodeContract for StartNode {
    fn node_type(&self) -> &str {
        "StartNode"
    }

    fn flags(&self) -> NodeFlags {
        NodeFlags {
            is_native: true,
            ..Default::default()
        }
    }

    fn output_schema(&self) -> HashMap<String, DataType> {
        let mut schema = HashMap::new();
        schema.insert("Flow".to_string(), DataType::Flow);
        schema
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
    fn declares_a_single_flow_output_and_no_inputs() {
        let node = StartNode;
        assert_eq!(node.output_schema().len(), 1);
        assert_eq!(node.output_schema().get("Flow"), Some(&DataType::Flow));
        assert!(node.input_schema().is_empty());
    }

    #[test]
    fn execute_produces_no_outputs_of_its_own() {
        let bridge = Bridge::new();
        let outputs = StartNode
            .execute("start", NodeInputs::new(), &ScopeStack::new(), &bridge)
            .unwrap();
        assert!(outputs.is_empty());
    }
}
