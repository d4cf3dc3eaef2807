//! The persisted graph-file schema (spec §6 "Graph file (persisted
//! topology)"). This is intentionally the *minimum* topology schema: UI-only
//! fields (position, colour, label) are accepted but never read by
//! anything in this workspace, and port-registry identifiers are never
//! part of this shape (spec §4.2: "must not appear in the persisted graph
//! file").

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GraphDocument {
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub project_category: Option<String>,
    #[serde(default)]
    pub project_description: Option<String>,
    #[serde(default)]
    pub nodes: Vec<NodeDef>,
    #[serde(default)]
    pub wires: Vec<WireDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDef {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub properties: HashMap<String, Json>,
    /// UI-only fields (position, colour, label, ...). Never read; kept so
    /// round-tripping a graph file through `load`/`save` is lossless for
    /// fields this engine doesn't understand.
    #[serde(flatten)]
    pub ui_extra: HashMap<String, Json>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireDef {
    pub from_node: String,
    pub from_port: String,
    pub to_node: String,
    pub to_port: String,
    /// Engine-local, regenerated on load — ignored if present (spec §6).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_port_uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_port_uuid: Option<String>,
}

impl GraphDocument {
    pub fn start_node_ids<'a>(&'a self, start_node_types: &[&str]) -> Vec<&'a str> {
        self.nodes
            .iter()
            .filter(|n| start_node_types.iter().any(|t| n.node_type.contains(t)))
            .map(|n| n.id.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_document() {
        let raw = r#"{
            "nodes": [{"id": "n1", "type": "StartNode", "properties": {}, "x": 10}],
            "wires": [{"from_node": "n1", "from_port": "Flow", "to_node": "n2", "to_port": "Flow", "from_port_uuid": "stale"}]
        }"#;
        let doc: GraphDocument = serde_json::from_str(raw).unwrap();
        assert_eq!(doc.nodes.len(), 1);
        assert_eq!(doc.nodes[0].ui_extra.get("x").and_then(|v| v.as_i64()), Some(10));
        assert_eq!(doc.wires[0].from_port_uuid.as_deref(), Some("stale"));
    }
}
