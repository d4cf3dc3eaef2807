//! Demonstration/test node family exercising every engine feature
//! end-to-end (spec.md Non-goals keep the real node library out of
//! scope; these fixtures stand in for it). Grounded on
//! `synapse/nodes/lib/*.py`'s naming and schema conventions.

mod debug_node;
mod divide_node;
mod return_node;
mod sender_node;
mod start_node;
mod while_provider_node;

pub use debug_node::DebugNode;
pub use divide_node::DivideNode;
pub use return_node::ReturnNode;
pub use sender_node::SenderNode;
pub use start_node::StartNode;
pub use while_provider_node::WhileProviderNode;

use pulse_core::NodeContract;
use std::sync::Arc;

/// Builds the demonstration node for a given `node_type` string, mirroring
/// `synapse.nodes.registry.NodeRegistry`'s type-name-keyed factory.
pub fn build(node_type: &str) -> Option<Arc<dyn NodeContract>> {
    match node_type {
        "StartNode" => Some(Arc::new(StartNode)),
        "DebugNode" => Some(Arc::new(DebugNode)),
        "ReturnNode" => Some(Arc::new(ReturnNode)),
        "SenderNode" => Some(Arc::new(SenderNode)),
        "DivideNode" => Some(Arc::new(DivideNode)),
        "WhileProviderNode" => Some(Arc::new(WhileProviderNode)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_every_known_node_type() {
        for node_type in [
            "StartNode",
            "DebugNode",
            "ReturnNode",
            "SenderNode",
            "DivideNode",
            "WhileProviderNode",
        ] {
            let node = build(node_type).unwrap_or_else(|| panic!("{node_type} should be buildable"));
            assert_eq!(node.node_type(), node_type);
        }
    }

    #[test]
    fn unknown_node_type_returns_none() {
        assert!(build("NotARealNode").is_none());
    }
}
