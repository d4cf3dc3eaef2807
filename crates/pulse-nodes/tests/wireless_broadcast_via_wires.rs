//! End-to-end check that a `SenderNode` broadcast actually reaches its
//! tagged receiver and the run still drains cleanly (spec.md §3/§8: every
//! queued pulse, wireless ones included, must be accounted for so a
//! scope's pulse count never goes negative and the run always
//! terminates). The receiver is itself a `Return` node fed by a wired
//! literal, so this also exercises the wire-walk fix end to end.

use pulse_core::{Bridge, EngineConfig, ExecutionEngine, GraphSnapshot};
use pulse_domain::{DataType, Node, Value, Wire};
use pulse_nodes::{ReturnNode, SenderNode, StartNode};
use std::collections::HashMap;
use std::sync::Arc;

#[test]
fn wireless_broadcast_reaches_its_tagged_receiver_and_the_run_terminates() {
    let nodes: HashMap<String, Node> = vec![
        Node::new("start", "StartNode").with_output("Flow", DataType::Flow),
        Node::new("sender", "SenderNode")
            .with_input("Flow", DataType::Flow)
            .with_input("Tag", DataType::String)
            .with_output("Tag", DataType::String),
        Node::new("lit_greeting", "Literal")
            .with_output("Greeting", DataType::Any)
            .with_property("Greeting", Value::String("Hello".to_string())),
        Node::new("receiver", "ReturnNode")
            .with_property("Tag", Value::String("channel_1".to_string())),
    ]
    .into_iter()
    .map(|n| (n.node_id.clone(), n))
    .collect();

    let node_impls: HashMap<String, Arc<dyn pulse_core::NodeContract>> = [
        ("start".to_string(), Arc::new(StartNode) as Arc<dyn pulse_core::NodeContract>),
        ("sender".to_string(), Arc::new(SenderNode) as Arc<dyn pulse_core::NodeContract>),
        ("receiver".to_string(), Arc::new(ReturnNode) as Arc<dyn pulse_core::NodeContract>),
    ]
    .into_iter()
    .collect();

    let wires = vec![
        Wire::new("start", "Flow", "sender", "Flow"),
        Wire::new("lit_greeting", "Greeting", "receiver", "Greeting"),
    ];

    let snapshot = GraphSnapshot { nodes, node_impls, wires };
    let bridge = Bridge::new();
    let engine = ExecutionEngine::new(snapshot, Arc::clone(&bridge), EngineConfig::default());
    engine.run("start", vec!["ROOT".to_string()]).expect("run should finish cleanly");

    match bridge.get("SUBGRAPH_RETURN", None) {
        Some(Value::Dict(payload)) => {
            assert_eq!(payload.get("Greeting"), Some(&Value::String("Hello".to_string())));
        }
        other => panic!("expected the wireless-triggered receiver's deposit to flush, got {other:?}"),
    }
}
