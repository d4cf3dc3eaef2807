//! The `Node` record: schema, flags, and property bag (spec §3 "Node").

use crate::types::{DataType, Value};
use std::collections::HashMap;

/// Lifecycle/dispatch flags a node declares about itself (spec §3, §4.5,
/// §4.7). `required_providers` is checked by the engine before dispatch
/// (spec §4.6 step 5).
#[derive(Debug, Clone, Default)]
pub struct NodeFlags {
    pub is_native: bool,
    pub is_async: bool,
    pub is_service: bool,
    pub is_provider: bool,
    pub allow_dynamic_inputs: bool,
    pub required_providers: Vec<String>,
}

/// A unit of work in the graph: a stable id, a human-readable name, typed
/// input/output schemas, and a property bag of per-port default values.
/// Handler dispatch itself lives on the `NodeContract` trait in
/// `pulse-core` — this struct is the neutral, serializable shape the
/// engine's registries index by.
#[derive(Debug, Clone)]
pub struct Node {
    pub node_id: String,
    pub name: String,
    pub node_type: String,
    pub input_schema: HashMap<String, DataType>,
    pub output_schema: HashMap<String, DataType>,
    pub properties: HashMap<String, Value>,
    pub flags: NodeFlags,
}

impl Node {
    pub fn new(node_id: impl Into<String>, node_type: impl Into<String>) -> Self {
        let node_id = node_id.into();
        Node {
            node_id: node_id.clone(),
            name: node_id,
            node_type: node_type.into(),
            input_schema: HashMap::new(),
            output_schema: HashMap::new(),
            properties: HashMap::new(),
            flags: NodeFlags::default(),
        }
    }

    pub fn with_input(mut self, port: impl Into<String>, ty: DataType) -> Self {
        self.input_schema.insert(port.into(), ty);
        self
    }

    pub fn with_output(mut self, port: impl Into<String>, ty: DataType) -> Self {
        self.output_schema.insert(port.into(), ty);
        self
    }

    pub fn with_property(mut self, port: impl Into<String>, value: Value) -> Self {
        self.properties.insert(port.into(), value);
        self
    }

    pub fn with_flags(mut self, flags: NodeFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Property lookup with the case-insensitive `result ⇄ value ⇄ string
    /// ⇄ data` alias group used by input gathering (spec §4.6.1).
    pub fn property_with_aliases(&self, port: &str) -> Option<&Value> {
        if let Some(v) = self.properties.get(port) {
            return Some(v);
        }
        const ALIASES: [&str; 4] = ["result", "value", "string", "data"];
        let lower = port.to_ascii_lowercase();
        if !ALIASES.contains(&lower.as_str()) {
            return None;
        }
        self.properties.iter().find_map(|(k, v)| {
            let kl = k.to_ascii_lowercase();
            (ALIASES.contains(&kl.as_str())).then_some(v)
        })
    }
}
