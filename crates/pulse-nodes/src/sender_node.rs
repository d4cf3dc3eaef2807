//! Broadcasts its bundled inputs under a `Tag` for any `Receiver`-style
//! node to pick up (spec.md §4.3 `route_wireless`). Grounded on
//! `synapse/nodes/lib/sender_node.py`.

use pulse_core::{Bridge, EngineError, NodeContract, NodeInputs, NodeOutputs, ScopeStack};
use pulse_domain::{DataType, NodeFlags, Value};
use std::collections::HashMap;
use std::sync::Arc;

pub struct SenderNode;

impl NodeContract for SenderNode {
    fn node_type(&self) -> &str {
        "SenderNode"
    }

    fn flags(&self) -> NodeFlags {
        NodeFlags {
            is_native: true,
            allow_dynamic_inputs: true,
            ..Default::default()
        }
    }

    fn input_schema(&self) -> HashMap<String, DataType> {
        HashMap::from([
            ("Flow".to_string(), DataType::Flow),
            ("Tag".to_string(), DataType::String),
            ("Data".to_string(), DataType::Any),
        ])
    }

    fn execute(
        &self,
        _node_id: &str,
        inputs: NodeInputs,
        _context_stack: &ScopeStack,
        bridge: &Arc<Bridge>,
    ) -> Result<NodeOutputs, EngineError> {
        let tag = match inputs.get("Tag") {
            Some(Value::String(t)) if !t.is_empty() => t.clone(),
            _ => "channel_1".to_string(),
        };

        let mut payload = HashMap::new();
        if let Some(data) = inputs.get("Data") {
            payload.insert("Data".to_string(), data.clone());
        }
        for (k, v) in &inputs {
            if k == "Flow" || k == "Tag" || k == "Data" {
                continue;
            }
            payload.insert(k.clone(), v.clone());
        }

        bridge.set(&format!("__WIRELESS_{tag}__"), Value::Dict(payload), "SenderNode", None);

        let mut outputs = NodeOutputs::new();
        outputs.insert("Tag".to_string(), Value::String(tag));
        outputs.insert("ActivePorts".to_string(), Value::List(Vec::new()));
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::Bridge;

    #[test]
    fn broadcasts_under_the_given_tag_and_fires_no_flow_ports() {
        let bridge = Bridge::new();
        let mut inputs = NodeInputs::new();
        inputs.insert("Tag".to_string(), Value::String("telemetry".to_string()));
        inputs.insert("Data".to_string(), Value::Int(42));

        let outputs = SenderNode.execute("sender", inputs, &ScopeStack::new(), &bridge).unwrap();

        assert_eq!(outputs.get("Tag"), Some(&Value::String("telemetry".to_string())));
        assert_eq!(outputs.get("ActivePorts"), Some(&Value::List(Vec::new())));

        match bridge.get("__WIRELESS_telemetry__", None) {
            Some(Value::Dict(payload)) => {
                assert_eq!(payload.get("Data"), Some(&Value::Int(42)));
            }
            other => panic!("expected a wireless payload dict, got {other:?}"),
        }
    }

    #[test]
    fn falls_back_to_default_tag_when_empty() {
        let bridge = Bridge::new();
        let mut inputs = NodeInputs::new();
        inputs.insert("Data".to_string(), Value::Null);

        let outputs = SenderNode.execute("sender", inputs, &ScopeStack::new(), &bridge).unwrap();
        assert_eq!(outputs.get("Tag"), Some(&Value::String("channel_1".to_string())));
    }
}
