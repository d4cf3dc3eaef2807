//! A provider node opening a loop scope: fires `Loop` into its scope
//! body `Max Iterations` times, then fires `Flow` once the loop drains
//! (spec.md §8 scenario 2; §4.6 provider-scope handling). The loop
//! counter lives on the bridge keyed by node id so repeated pulses into
//! this node (from the loop body wiring back around) see the running
//! count. Grounded on the "break"-signal shape of
//! `synapse/nodes/lib/exit_while_node.py`.

use pulse_core::{Bridge, EngineError, NodeContract, NodeInputs, NodeOutputs, ScopeStack};
use pulse_domain::{DataType, NodeFlags, Value};
use std::collections::HashMap;
use std::sync::Arc;

pub struct WhileProviderNode;

fn counter_key(node_id: &str) -> String {
    format!("{node_id}_Iteration")
}

impl NodeContract for WhileProviderNode {
    fn node_type(&self) -> &str {
        "WhileProviderNode"
    }

    fn flags(&self) -> NodeFlags {
        NodeFlags {
            is_native: true,
            is_provider: true,
            ..Default::default()
        }
    }

    fn input_schema(&self) -> HashMap<String, DataType> {
        HashMap::from([
            ("Flow".to_string(), DataType::Flow),
            ("Max Iterations".to_string(), DataType::Int),
        ])
    }

    fn output_schema(&self) -> HashMap<String, DataType> {
        HashMap::from([
            ("Loop".to_string(), DataType::ProviderFlow),
            ("Flow".to_string(), DataType::Flow),
        ])
    }

    fn execute(
        &self,
        node_id: &str,
        inputs: NodeInputs,
        _context_stack: &ScopeStack,
        bridge: &Arc<Bridge>,
    ) -> Result<NodeOutputs, EngineError> {
        let max_iterations = inputs
            .get("Max Iterations")
            .and_then(Value::as_f64)
            .map(|v| v as i64)
            .unwrap_or(3);

        let key = counter_key(node_id);
        let current = bridge.get(&key, None).and_then(|v| v.as_f64()).unwrap_or(0.0) as i64;

        let mut outputs = NodeOutputs::new();
        if current < max_iterations {
            bridge.set(&key, Value::Int(current + 1), "WhileProviderNode", None);
            outputs.insert(
                "ActivePorts".to_string(),
                Value::List(vec![Value::String("Loop".to_string())]),
            );
        } else {
            bridge.set(&key, Value::Int(0), "WhileProviderNode", None);
            outputs.insert(
                "ActivePorts".to_string(),
                Value::List(vec![Value::String("Flow".to_string())]),
            );
        }
        Ok(outputs)
    }

    fn cleanup_provider_context(&self, node_id: &str, bridge: &Arc<Bridge>) {
        bridge.set(&counter_key(node_id), Value::Int(0), "WhileProviderNode", None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs_with_max(max: i64) -> NodeInputs {
        let mut inputs = NodeInputs::new();
        inputs.insert("Max Iterations".to_string(), Value::Int(max));
        inputs
    }

    fn active_ports(outputs: &NodeOutputs) -> Vec<String> {
        match outputs.get("ActivePorts") {
            Some(Value::List(l)) => l
                .iter()
                .filter_map(|v| if let Value::String(s) = v { Some(s.clone()) } else { None })
                .collect(),
            _ => Vec::new(),
        }
    }

    #[test]
    fn fires_loop_while_under_max_then_flow_once_exhausted() {
        let bridge = Bridge::new();
        let node = WhileProviderNode;
        let stack = ScopeStack::new();

        for _ in 0..3 {
            let outputs = node.execute("loop", inputs_with_max(3), &stack, &bridge).unwrap();
            assert_eq!(active_ports(&outputs), vec!["Loop".to_string()]);
        }

        let outputs = node.execute("loop", inputs_with_max(3), &stack, &bridge).unwrap();
        assert_eq!(active_ports(&outputs), vec!["Flow".to_string()]);
    }

    #[test]
    fn cleanup_resets_the_counter() {
        let bridge = Bridge::new();
        let node = WhileProviderNode;
        let stack = ScopeStack::new();
        node.execute("loop", inputs_with_max(5), &stack, &bridge).unwrap();
        assert_eq!(bridge.get(&counter_key("loop"), None), Some(Value::Int(1)));

        node.cleanup_provider_context("loop", &bridge);
        assert_eq!(bridge.get(&counter_key("loop"), None), Some(Value::Int(0)));
    }

    #[test]
    fn default_max_iterations_is_three_when_absent() {
        let bridge = Bridge::new();
        let node = WhileProviderNode;
        let stack = ScopeStack::new();
        for _ in 0..3 {
            let outputs = node.execute("loop", NodeInputs::new(), &stack, &bridge).unwrap();
            assert_eq!(active_ports(&outputs), vec!["Loop".to_string()]);
        }
        let outputs = node.execute("loop", NodeInputs::new(), &stack, &bridge).unwrap();
        assert_eq!(active_ports(&outputs), vec!["Flow".to_string()]);
    }
}
