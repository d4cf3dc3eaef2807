//! Divides `A` by `B`, routing to `Error Flow` on division by zero
//! unless `Handle Div 0` is set (spec.md §8 scenario 4). Grounded on
//! `synapse/nodes/lib/divide_node.py`.

use pulse_core::{Bridge, EngineError, NodeContract, NodeInputs, NodeOutputs, ScopeStack};
use pulse_domain::{DataType, NodeFlags, Value};
use std::collections::HashMap;
use std::sync::Arc;

pub struct DivideNode;

impl NodeContract for DivideNode {
    fn node_type(&self) -> &str {
        "DivideNode"
    }

    fn flags(&self) -> NodeFlags {
        NodeFlags {
            is_native: true,
            ..Default::default()
        }
    }

    fn input_schema(&self) -> HashMap<String, DataType> {
        HashMap::from([
            ("Flow".to_string(), DataType::Flow),
            ("A".to_string(), DataType::Number),
            ("B".to_string(), DataType::Number),
            ("Handle Div 0".to_string(), DataType::Boolean),
        ])
    }

    fn output_schema(&self) -> HashMap<String, DataType> {
        HashMap::from([
            ("Flow".to_string(), DataType::Flow),
            ("Error Flow".to_string(), DataType::Flow),
            ("Result".to_string(), DataType::Number),
        ])
    }

    fn execute(
        &self,
        _node_id: &str,
        inputs: NodeInputs,
        _context_stack: &ScopeStack,
        _bridge: &Arc<Bridge>,
    ) -> Result<NodeOutputs, EngineError> {
        let a = inputs.get("A").and_then(Value::as_f64).unwrap_or(1.0);
        let b = inputs.get("B").and_then(Value::as_f64).unwrap_or(1.0);
        let handle_zero = inputs.get("Handle Div 0").and_then(Value::as_bool).unwrap_or(false);

        let mut outputs = NodeOutputs::new();
        if b == 0.0 {
            if handle_zero {
                outputs.insert("Result".to_string(), Value::Float(0.0));
                outputs.insert(
                    "ActivePorts".to_string(),
                    Value::List(vec![Value::String("Flow".to_string())]),
                );
            } else {
                log::error!("division by zero");
                outputs.insert(
                    "ActivePorts".to_string(),
                    Value::List(vec![Value::String("Error Flow".to_string())]),
                );
            }
        } else {
            outputs.insert("Result".to_string(), Value::Float(a / b));
            outputs.insert(
                "ActivePorts".to_string(),
                Value::List(vec![Value::String("Flow".to_string())]),
            );
        }
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::Bridge;

    fn run(a: f64, b: f64, handle_zero: bool) -> NodeOutputs {
        let bridge = Bridge::new();
        let mut inputs = NodeInputs::new();
        inputs.insert("A".to_string(), Value::Float(a));
        inputs.insert("B".to_string(), Value::Float(b));
        inputs.insert("Handle Div 0".to_string(), Value::Bool(handle_zero));
        DivideNode.execute("divide", inputs, &ScopeStack::new(), &bridge).unwrap()
    }

    #[test]
    fn divides_and_routes_flow_on_success() {
        let outputs = run(10.0, 4.0, false);
        assert_eq!(outputs.get("Result"), Some(&Value::Float(2.5)));
        assert_eq!(
            outputs.get("ActivePorts"),
            Some(&Value::List(vec![Value::String("Flow".to_string())]))
        );
    }

    #[test]
    fn routes_error_flow_on_division_by_zero_by_default() {
        let outputs = run(1.0, 0.0, false);
        assert!(outputs.get("Result").is_none());
        assert_eq!(
            outputs.get("ActivePorts"),
            Some(&Value::List(vec![Value::String("Error Flow".to_string())]))
        );
    }

    #[test]
    fn division_by_zero_yields_zero_when_handled() {
        let outputs = run(1.0, 0.0, true);
        assert_eq!(outputs.get("Result"), Some(&Value::Float(0.0)));
        assert_eq!(
            outputs.get("ActivePorts"),
            Some(&Value::List(vec![Value::String("Flow".to_string())]))
        );
    }
}
