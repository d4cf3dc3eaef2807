//! `Wire`: an edge between two node ports (spec §3 "Wire").

/// A connection from one node's output port to another node's input port.
/// `*_uuid` fields mirror the optional port-registry identifiers the
/// original carries on the wire dict for fast lookup; they are cache
/// hints only and are never trusted across a graph reload (spec §6: they
/// are "ignored on load").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wire {
    pub from_node: String,
    pub from_port: String,
    pub to_node: String,
    pub to_port: String,
    pub from_port_uuid: Option<String>,
    pub to_port_uuid: Option<String>,
}

impl Wire {
    pub fn new(
        from_node: impl Into<String>,
        from_port: impl Into<String>,
        to_node: impl Into<String>,
        to_port: impl Into<String>,
    ) -> Self {
        Wire {
            from_node: from_node.into(),
            from_port: from_port.into(),
            to_node: to_node.into(),
            to_port: to_port.into(),
            from_port_uuid: None,
            to_port_uuid: None,
        }
    }
}
