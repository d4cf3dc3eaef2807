//! pulse-demo: a small in-process run of the pulse engine, built
//! programmatically rather than loaded from a graph file. For the
//! file-driven, flag-driven runner see `pulse-cli`.

use pulse_core::{Bridge, EngineConfig, ExecutionEngine, GraphSnapshot};
use pulse_domain::{Node, Value, Wire};
use std::collections::HashMap;

fn main() {
    env_logger::init();

    let mut nodes = HashMap::new();
    let mut node_impls = HashMap::new();

    for (id, node_type) in [
        ("start", "StartNode"),
        ("greet", "DebugNode"),
        ("loop", "WhileProviderNode"),
        ("count", "DebugNode"),
    ] {
        let node_impl = pulse_nodes::build(node_type).expect("known node type");
        let mut node = Node::new(id, node_type);
        node.input_schema = node_impl.input_schema();
        node.output_schema = node_impl.output_schema();
        node.flags = node_impl.flags();
        nodes.insert(id.to_string(), node);
        node_impls.insert(id.to_string(), node_impl);
    }
    nodes
        .get_mut("greet")
        .unwrap()
        .properties
        .insert("Header".to_string(), Value::String("demo".to_string()));
    nodes
        .get_mut("loop")
        .unwrap()
        .properties
        .insert("Max Iterations".to_string(), Value::Int(3));

    let wires = vec![
        Wire::new("start", "Flow", "greet", "Flow"),
        Wire::new("greet", "Flow", "loop", "Flow"),
        Wire::new("loop", "Loop", "count", "Flow"),
        Wire::new("count", "Flow", "loop", "Flow"),
    ];

    let snapshot = GraphSnapshot {
        nodes,
        node_impls,
        wires,
    };

    let bridge = Bridge::new();
    let config = EngineConfig {
        headless: false,
        trace: true,
        default_scope: "ROOT".to_string(),
    };
    let engine = ExecutionEngine::new(snapshot, bridge, config);

    match engine.run("start", vec!["ROOT".to_string()]) {
        Ok(()) => println!("demo run completed"),
        Err(err) => eprintln!("demo run stopped: {err}"),
    }
}
