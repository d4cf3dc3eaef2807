//! Loads a persisted graph document into the shapes the engine runs on
//! (spec §6 "Graph file"). `*_uuid` fields on wires are read but never
//! trusted: the port registry regenerates its own identifiers on load.

use pulse_core::GraphSnapshot;
use pulse_domain::{DomainError, GraphDocument, Node, Value, Wire};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphLoadError {
    #[error("failed to read graph file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse graph file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("unknown node type {0} in graph file")]
    UnknownNodeType(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

pub struct LoadedGraph {
    pub document: GraphDocument,
    pub start_node_ids: Vec<String>,
}

/// Node-type substrings the engine accepts as graph entry points (spec §6:
/// "any node whose type contains `StartNode` or `TriggerNode`").
const START_NODE_TYPES: &[&str] = &["StartNode", "TriggerNode"];

/// Reads and parses `path` into a `GraphDocument`, computing the set of
/// start-node ids for CLI autoselection (spec §6 "the engine autoselects
/// when exactly one start-node exists").
pub fn load_graph(path: &Path) -> Result<LoadedGraph, GraphLoadError> {
    let raw = std::fs::read_to_string(path).map_err(|source| GraphLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let document: GraphDocument =
        serde_json::from_str(&raw).map_err(|source| GraphLoadError::Parse {
            path: path.display().to_string(),
            source,
        })?;
    let start_node_ids = document
        .start_node_ids(START_NODE_TYPES)
        .into_iter()
        .map(str::to_string)
        .collect();
    Ok(LoadedGraph {
        document,
        start_node_ids,
    })
}

/// Converts a parsed document into the engine's runnable shape, looking
/// up each node's concrete implementation from `registry` (a
/// `node_type -> NodeContract` factory, normally `pulse_nodes::build`).
pub fn build_graph_snapshot(
    document: &GraphDocument,
    registry: impl Fn(&str) -> Option<std::sync::Arc<dyn pulse_core::NodeContract>>,
) -> Result<GraphSnapshot, GraphLoadError> {
    let mut nodes = HashMap::new();
    let mut node_impls = HashMap::new();

    for node_def in &document.nodes {
        let node_impl = registry(&node_def.node_type)
            .ok_or_else(|| GraphLoadError::UnknownNodeType(node_def.node_type.clone()))?;

        let mut node = Node::new(node_def.id.clone(), node_def.node_type.clone());
        node.input_schema = node_impl.input_schema();
        node.output_schema = node_impl.output_schema();
        node.flags = node_impl.flags();
        for (k, v) in &node_def.properties {
            node.properties.insert(k.clone(), json_to_value(v));
        }

        nodes.insert(node_def.id.clone(), node);
        node_impls.insert(node_def.id.clone(), node_impl);
    }

    let wires = document
        .wires
        .iter()
        .map(|w| Wire::new(w.from_node.clone(), w.from_port.clone(), w.to_node.clone(), w.to_port.clone()))
        .collect();

    Ok(GraphSnapshot {
        nodes,
        node_impls,
        wires,
    })
}

fn json_to_value(json: &serde_json::Value) -> Value {
    serde_json::from_value(json.clone()).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_node_ids_matches_on_type_substring() {
        let doc = GraphDocument {
            nodes: vec![
                pulse_domain::NodeDef {
                    id: "n1".to_string(),
                    node_type: "StartNode".to_string(),
                    properties: HashMap::new(),
                    ui_extra: HashMap::new(),
                },
                pulse_domain::NodeDef {
                    id: "n2".to_string(),
                    node_type: "DebugNode".to_string(),
                    properties: HashMap::new(),
                    ui_extra: HashMap::new(),
                },
            ],
            ..Default::default()
        };
        assert_eq!(doc.start_node_ids(START_NODE_TYPES), vec!["n1"]);
    }
}
