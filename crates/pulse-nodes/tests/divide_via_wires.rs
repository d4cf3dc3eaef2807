//! End-to-end check that data wires actually carry values into a node's
//! inputs (spec.md §8 scenario 4): two literal sources wired into
//! `DivideNode`'s `A`/`B` ports, driven through a real `ExecutionEngine`
//! run rather than a direct `execute()` call.

use pulse_core::{Bridge, EngineConfig, ExecutionEngine, GraphSnapshot};
use pulse_domain::{DataType, Node, Value, Wire};
use pulse_nodes::{DivideNode, StartNode};
use std::collections::HashMap;
use std::sync::Arc;

fn literal(node_id: &str, port: &str, value: Value) -> Node {
    Node::new(node_id, "Literal")
        .with_output(port, DataType::Any)
        .with_property(port, value)
}

fn run_graph(nodes: Vec<Node>, node_impls: Vec<(&str, Arc<dyn pulse_core::NodeContract>)>, wires: Vec<Wire>) -> Arc<Bridge> {
    let snapshot = GraphSnapshot {
        nodes: nodes.into_iter().map(|n| (n.node_id.clone(), n)).collect(),
        node_impls: node_impls
            .into_iter()
            .map(|(id, n)| (id.to_string(), n))
            .collect::<HashMap<_, _>>(),
        wires,
    };
    let bridge = Bridge::new();
    let engine = ExecutionEngine::new(snapshot, Arc::clone(&bridge), EngineConfig::default());
    engine.run("start", vec!["ROOT".to_string()]).expect("run should finish cleanly");
    bridge
}

#[test]
fn divide_reads_a_and_b_from_their_incoming_wires() {
    let bridge = run_graph(
        vec![
            Node::new("start", "StartNode").with_output("Flow", DataType::Flow),
            literal("lit_a", "Result", Value::Float(10.0)),
            literal("lit_b", "Result", Value::Float(4.0)),
            Node::new("divide", "DivideNode")
                .with_input("Flow", DataType::Flow)
                .with_input("A", DataType::Number)
                .with_input("B", DataType::Number)
                .with_output("Flow", DataType::Flow)
                .with_output("Result", DataType::Number),
        ],
        vec![
            ("start", Arc::new(StartNode)),
            ("divide", Arc::new(DivideNode)),
        ],
        vec![
            Wire::new("start", "Flow", "divide", "Flow"),
            Wire::new("lit_a", "Result", "divide", "A"),
            Wire::new("lit_b", "Result", "divide", "B"),
        ],
    );

    assert_eq!(bridge.get("divide_Result", None), Some(Value::Float(2.5)));
}

#[test]
fn divide_falls_back_to_its_own_property_when_a_port_is_unwired() {
    let bridge = run_graph(
        vec![
            Node::new("start", "StartNode").with_output("Flow", DataType::Flow),
            literal("lit_a", "Result", Value::Float(9.0)),
            Node::new("divide", "DivideNode")
                .with_input("Flow", DataType::Flow)
                .with_input("A", DataType::Number)
                .with_input("B", DataType::Number)
                .with_output("Flow", DataType::Flow)
                .with_output("Result", DataType::Number)
                .with_property("B", Value::Float(3.0)),
        ],
        vec![
            ("start", Arc::new(StartNode)),
            ("divide", Arc::new(DivideNode)),
        ],
        vec![
            Wire::new("start", "Flow", "divide", "Flow"),
            Wire::new("lit_a", "Result", "divide", "A"),
        ],
    );

    assert_eq!(bridge.get("divide_Result", None), Some(Value::Float(3.0)));
}
