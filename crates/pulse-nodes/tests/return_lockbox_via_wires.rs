//! End-to-end check of spec.md §8 scenario 5: a `Return` node's data
//! ports are fed by wires from other nodes, and the aggregated payload
//! must land in `SUBGRAPH_RETURN` once the run drains — not just
//! whatever `Return`'s own declared inputs/properties happen to hold.

use pulse_core::{Bridge, EngineConfig, ExecutionEngine, GraphSnapshot};
use pulse_domain::{DataType, Node, Value, Wire};
use pulse_nodes::{ReturnNode, StartNode};
use std::collections::HashMap;
use std::sync::Arc;

fn literal(node_id: &str, port: &str, value: Value) -> Node {
    Node::new(node_id, "Literal")
        .with_output(port, DataType::Any)
        .with_property(port, value)
}

#[test]
fn return_payload_is_aggregated_from_wired_source_ports() {
    let nodes: HashMap<String, Node> = vec![
        Node::new("start", "StartNode").with_output("Flow", DataType::Flow),
        literal("lit_string", "Result", Value::String("Hello".to_string())),
        literal("lit_number", "Result", Value::Int(42)),
        Node::new("ret", "ReturnNode").with_input("Flow", DataType::Flow),
    ]
    .into_iter()
    .map(|n| (n.node_id.clone(), n))
    .collect();

    let node_impls: HashMap<String, Arc<dyn pulse_core::NodeContract>> = [
        ("start".to_string(), Arc::new(StartNode) as Arc<dyn pulse_core::NodeContract>),
        ("ret".to_string(), Arc::new(ReturnNode) as Arc<dyn pulse_core::NodeContract>),
    ]
    .into_iter()
    .collect();

    let wires = vec![
        Wire::new("start", "Flow", "ret", "Flow"),
        Wire::new("lit_string", "Result", "ret", "Var_String"),
        Wire::new("lit_number", "Result", "ret", "Var_Number"),
    ];

    let snapshot = GraphSnapshot { nodes, node_impls, wires };
    let bridge = Bridge::new();
    let engine = ExecutionEngine::new(snapshot, Arc::clone(&bridge), EngineConfig::default());
    engine.run("start", vec!["ROOT".to_string()]).expect("run should finish cleanly");

    match bridge.get("SUBGRAPH_RETURN", None) {
        Some(Value::Dict(payload)) => {
            assert_eq!(payload.get("Var_String"), Some(&Value::String("Hello".to_string())));
            assert_eq!(payload.get("Var_Number"), Some(&Value::Int(42)));
        }
        other => panic!("expected an aggregated return payload dict, got {other:?}"),
    }
}
