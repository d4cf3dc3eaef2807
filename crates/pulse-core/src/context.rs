//! Context Manager: maintains the provider-scope stack across pulses
//! and routes uncaught errors to the nearest catch wire (spec §4.4).

use crate::errors::EngineError;
use crate::flow::ScopeStack;
use pulse_domain::{Node, Wire};

const PROVIDER_ENTRY_PORTS: &[&str] = &["Provider Flow", "Flow"];
const PROVIDER_CLOSE_PORTS: &[&str] = &["Close", "Provider Close", "Dispose"];
const CATCH_PORTS: &[&str] = &["Catch", "Error Flow"];

#[derive(Default)]
pub struct ContextManager;

pub struct CaughtError {
    pub catch_node_id: String,
    pub parent_stack: ScopeStack,
    pub catch_wires: Vec<Wire>,
}

impl ContextManager {
    pub fn new() -> Self {
        ContextManager
    }

    /// `update_stack(node, stack, trigger_port)` (spec §4.4).
    pub fn update_stack(&self, node: &Node, stack: &ScopeStack, trigger_port: &str) -> ScopeStack {
        if node.flags.is_provider && PROVIDER_ENTRY_PORTS.contains(&trigger_port) {
            let mut next = stack.clone();
            next.push(node.node_id.clone());
            return next;
        }
        if node.flags.is_provider && PROVIDER_CLOSE_PORTS.contains(&trigger_port) {
            let mut next = stack.clone();
            if next.last() == Some(&node.node_id) {
                next.pop();
            }
            return next;
        }
        stack.clone()
    }

    /// `handle_error(error, failing_node, stack, wires)` (spec §4.4):
    /// walks the stack from innermost outward looking for an enclosing
    /// node with a catch wire.
    pub fn handle_error(
        &self,
        _error: &EngineError,
        stack: &ScopeStack,
        wires: &[Wire],
    ) -> Option<CaughtError> {
        for (depth, scope_node_id) in stack.iter().enumerate().rev() {
            let catch_wires: Vec<Wire> = wires
                .iter()
                .filter(|w| w.from_node == *scope_node_id && CATCH_PORTS.contains(&w.from_port.as_str()))
                .cloned()
                .collect();
            if !catch_wires.is_empty() {
                return Some(CaughtError {
                    catch_node_id: scope_node_id.clone(),
                    parent_stack: stack[..depth].to_vec(),
                    catch_wires,
                });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_domain::NodeFlags;

    fn provider_node(id: &str) -> Node {
        Node::new(id, "WhileProvider").with_flags(NodeFlags {
            is_provider: true,
            ..Default::default()
        })
    }

    #[test]
    fn update_stack_pushes_on_provider_entry() {
        let cm = ContextManager::new();
        let node = provider_node("p1");
        let stack = cm.update_stack(&node, &vec![], "Provider Flow");
        assert_eq!(stack, vec!["p1".to_string()]);
    }

    #[test]
    fn update_stack_pops_on_provider_close() {
        let cm = ContextManager::new();
        let node = provider_node("p1");
        let stack = cm.update_stack(&node, &vec!["p1".to_string()], "Close");
        assert!(stack.is_empty());
    }

    #[test]
    fn handle_error_finds_nearest_catch_wire() {
        let cm = ContextManager::new();
        let wires = vec![Wire::new("p1", "Catch", "handler", "Flow")];
        let stack = vec!["outer".to_string(), "p1".to_string()];
        let caught = cm
            .handle_error(&EngineError::Internal("x".into()), &stack, &wires)
            .unwrap();
        assert_eq!(caught.catch_node_id, "p1");
        assert_eq!(caught.parent_stack, vec!["outer".to_string()]);
    }

    #[test]
    fn handle_error_none_when_no_catch_wire_in_stack() {
        let cm = ContextManager::new();
        let caught = cm.handle_error(&EngineError::Internal("x".into()), &vec!["p1".to_string()], &[]);
        assert!(caught.is_none());
    }
}
