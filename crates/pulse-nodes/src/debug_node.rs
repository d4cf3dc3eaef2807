//! Logs its `Data` input to stdout, prefixed `[DEBUG]` so a UI front-end
//! can route the line to a debug panel (spec.md §8 scenario 1). Grounded
//! on `synapse/nodes/lib/debug_node.py`.

use pulse_core::{Bridge, EngineError, NodeContract, NodeInputs, NodeOutputs, ScopeStack};
use pulse_domain::{DataType, NodeFlags, Value};
use std::collections::HashMap;
use std::sync::Arc;

pub struct DebugNode;

impl NodeContract for DebugNode {
    fn node_type(&self) -> &str {
        "DebugNode"
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
            ("Header".to_string(), DataType::String),
            ("Data".to_string(), DataType::Any),
        ])
    }

    fn output_schema(&self) -> HashMap<String, DataType> {
        HashMap::from([("Flow".to_string(), DataType::Flow)])
    }

    fn execute(
        &self,
        _node_id: &str,
        inputs: NodeInputs,
        _context_stack: &ScopeStack,
        bridge: &Arc<Bridge>,
    ) -> Result<NodeOutputs, EngineError> {
        let header = match inputs.get("Header") {
            Some(Value::String(h)) if !h.is_empty() => h.clone(),
            _ => "*".to_string(),
        };
        let header = match bridge.get("_SYNP_SUBGRAPH_ID", None) {
            Some(Value::String(sub_id)) if header != "*" => format!("{sub_id} > {header}"),
            Some(Value::String(sub_id)) => sub_id,
            _ => header,
        };
        let data = inputs.get("Data").cloned().unwrap_or(Value::Null);
        println!("[DEBUG] [{header}] {}", format_data(&data));
        Ok(NodeOutputs::new())
    }
}

fn format_data(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(b) => format!("[bool, {b}]"),
        Value::Int(i) => format!("[int, {i}]"),
        Value::Float(f) => format!("[float, {f}]"),
        Value::String(s) => format!("[str, {s}]"),
        Value::List(l) => format!("[list, {}]", l.len()),
        Value::Dict(d) => format!("[dict, {}]", d.len()),
        Value::Bytes(b) => format!("[bytes, {}]", b.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::Bridge;

    #[test]
    fn produces_no_output_ports_and_accepts_any_data() {
        let bridge = Bridge::new();
        let mut inputs = NodeInputs::new();
        inputs.insert("Header".to_string(), Value::String("demo".to_string()));
        inputs.insert("Data".to_string(), Value::Int(7));

        let outputs = DebugNode.execute("greet", inputs, &ScopeStack::new(), &bridge).unwrap();
        assert!(outputs.is_empty());
    }

    #[test]
    fn header_is_namespaced_under_the_active_subgraph_id() {
        let bridge = Bridge::new();
        bridge.set("_SYNP_SUBGRAPH_ID", Value::String("sub-1".to_string()), "test", None);
        let mut inputs = NodeInputs::new();
        inputs.insert("Header".to_string(), Value::String("demo".to_string()));

        // No observable return value to assert on beyond "doesn't error" —
        // the namespacing only affects the printed line.
        DebugNode.execute("greet", inputs, &ScopeStack::new(), &bridge).unwrap();
    }

    #[test]
    fn formats_each_value_variant_with_its_type_tag() {
        assert_eq!(format_data(&Value::Null), "None");
        assert_eq!(format_data(&Value::Bool(true)), "[bool, true]");
        assert_eq!(format_data(&Value::Int(3)), "[int, 3]");
        assert_eq!(format_data(&Value::String("hi".to_string())), "[str, hi]");
        assert_eq!(format_data(&Value::List(vec![Value::Int(1), Value::Int(2)])), "[list, 2]");
    }
}
