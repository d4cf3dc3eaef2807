use super::lockbox::{is_returnable_key, ReturnLockbox};
use crate::bridge::Bridge;
use crate::constants::{
    key_cancel_scope, key_last_error_code, key_last_error_message, key_last_error_node,
    key_last_error_node_name, KEY_PANICKED, KEY_SYNP_YIELD, ROOT_SCOPE, STEP_IDLE_SLEEP_MS,
};
use crate::context::ContextManager;
use crate::dispatch::NodeDispatcher;
use crate::errors::EngineError;
use crate::flow::{FlowController, Pulse, RouteOptions, ScopeStack};
use crate::node_contract::{NodeContract, NodeOutputs};
use crate::ports::{Direction, PortRegistry};
use crate::trace::TraceEvent;
use pulse_domain::{Node, Value, Wire};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct EngineConfig {
    pub headless: bool,
    pub trace: bool,
    pub default_scope: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            headless: false,
            trace: true,
            default_scope: "ROOT".to_string(),
        }
    }
}

struct PendingTermination {
    provider_node_id: String,
    completion_wires: Vec<Wire>,
    parent_stack: ScopeStack,
}

/// A loaded, runnable graph (spec §3 "Node"/"Wire"). Built by
/// `pulse-persistence` from the on-disk document and handed to the
/// engine.
pub struct GraphSnapshot {
    pub nodes: HashMap<String, Node>,
    pub node_impls: HashMap<String, Arc<dyn NodeContract>>,
    pub wires: Vec<Wire>,
}

/// An immutable generation of the running graph (spec §9 REDESIGN FLAG
/// "Global hot-reload via module mutation"). A hot-reload never mutates
/// nodes/wires in place; it builds a whole new `GraphGeneration` and
/// swaps the engine's pointer to it. A pulse already mid-step holds the
/// `Arc` it read at step start and keeps running against that generation
/// even if a reload lands concurrently; the next pulse to start sees the
/// new one.
struct GraphGeneration {
    nodes: HashMap<String, Node>,
    node_impls: HashMap<String, Arc<dyn NodeContract>>,
    wires: Vec<Wire>,
}

impl From<GraphSnapshot> for GraphGeneration {
    fn from(graph: GraphSnapshot) -> Self {
        GraphGeneration {
            nodes: graph.nodes,
            node_impls: graph.node_impls,
            wires: graph.wires,
        }
    }
}

pub struct ExecutionEngine {
    bridge: Arc<Bridge>,
    parent_bridge: Option<Arc<Bridge>>,
    parent_node_id: Option<String>,
    port_registry: PortRegistry,
    dispatcher: NodeDispatcher,
    context: ContextManager,
    graph: parking_lot::RwLock<Arc<GraphGeneration>>,
    scope_pulse_counts: parking_lot::Mutex<HashMap<String, i64>>,
    pending_terminations: parking_lot::Mutex<HashMap<String, PendingTermination>>,
    lockbox: ReturnLockbox,
    stopped: AtomicBool,
    start_node_id: parking_lot::Mutex<Option<String>>,
    pub config: EngineConfig,
}

/// Output ports a start node can wire a panic handler to (spec §4.6.3).
const PANIC_PORTS: &[&str] = &["Error Flow", "Error", "Panic"];

impl ExecutionEngine {
    pub fn new(graph: GraphSnapshot, bridge: Arc<Bridge>, config: EngineConfig) -> Arc<Self> {
        let port_registry = PortRegistry::new();
        for node in graph.nodes.values() {
            for port in node.input_schema.keys() {
                port_registry.register(&node.node_id, port, Direction::Input, &node.name);
            }
            for port in node.output_schema.keys() {
                port_registry.register(&node.node_id, port, Direction::Output, &node.name);
            }
        }
        bridge.set_default_scope(config.default_scope.clone());
        Arc::new(ExecutionEngine {
            bridge,
            parent_bridge: None,
            parent_node_id: None,
            port_registry,
            dispatcher: NodeDispatcher::new(),
            context: ContextManager::new(),
            graph: parking_lot::RwLock::new(Arc::new(GraphGeneration::from(graph))),
            scope_pulse_counts: parking_lot::Mutex::new(HashMap::new()),
            pending_terminations: parking_lot::Mutex::new(HashMap::new()),
            lockbox: ReturnLockbox::new(),
            stopped: AtomicBool::new(false),
            start_node_id: parking_lot::Mutex::new(None),
            config,
        })
    }

    /// Builds a child engine for a subgraph run (spec §4.1, §4.6
    /// construction): shares the parent's system-state through
    /// `Bridge::child_of` and notifies the parent on completion.
    pub fn child_of(
        parent: &Arc<ExecutionEngine>,
        parent_node_id: &str,
        graph: GraphSnapshot,
        config: EngineConfig,
    ) -> Arc<Self> {
        let bridge = Bridge::child_of(&parent.bridge);
        let mut engine = ExecutionEngine::new(graph, bridge, config);
        let engine_mut = Arc::get_mut(&mut engine).expect("no other references yet");
        engine_mut.parent_bridge = Some(Arc::clone(&parent.bridge));
        engine_mut.parent_node_id = Some(parent_node_id.to_string());
        engine
    }

    /// Snapshots the current graph generation. Cheap: one `Arc` clone.
    fn graph(&self) -> Arc<GraphGeneration> {
        Arc::clone(&self.graph.read())
    }

    fn enqueue(
        &self,
        flow: &FlowController,
        node_id: &str,
        stack: ScopeStack,
        trigger_port: &str,
        priority: i64,
        delay_ms: u64,
    ) {
        let mut counts = self.scope_pulse_counts.lock();
        *counts.entry(ROOT_SCOPE.to_string()).or_insert(0) += 1;
        for s in &stack {
            *counts.entry(s.clone()).or_insert(0) += 1;
        }
        drop(counts);
        flow.push(node_id, stack, trigger_port, priority, delay_ms);
    }

    /// Credits `count` pulses to `ROOT` and every scope in `stack` without
    /// pushing anything itself — the accounting half of `enqueue`, used
    /// where pulses were already pushed by some other path (currently
    /// `route_wireless`, which pushes directly the same way the original
    /// `flow_controller.py::route_wireless` does).
    fn account_broadcast(&self, stack: &[String], count: i64) {
        if count == 0 {
            return;
        }
        let mut counts = self.scope_pulse_counts.lock();
        *counts.entry(ROOT_SCOPE.to_string()).or_insert(0) += count;
        for s in stack {
            *counts.entry(s.clone()).or_insert(0) += count;
        }
    }

    fn release(&self, stack: &[String]) {
        let mut counts = self.scope_pulse_counts.lock();
        if let Some(c) = counts.get_mut(ROOT_SCOPE) {
            *c -= 1;
        }
        for s in stack {
            if let Some(c) = counts.get_mut(s) {
                *c -= 1;
            }
        }
    }

    fn cancelled(&self, stack: &[String]) -> bool {
        stack
            .iter()
            .any(|s| matches!(self.bridge.get(&key_cancel_scope(s), None), Some(Value::Bool(true))))
    }

    pub fn check_stop_signal(&self) -> bool {
        if self.stopped.load(Ordering::SeqCst) {
            return true;
        }
        matches!(
            self.bridge.get(crate::constants::KEY_SYSTEM_STOP, None),
            Some(Value::Bool(true))
        )
    }

    /// `run(start_node_id, initial_stack)` (spec §4.6 main loop).
    pub fn run(self: &Arc<Self>, start_node_id: &str, initial_stack: ScopeStack) -> Result<(), EngineError> {
        if !self.graph().nodes.contains_key(start_node_id) {
            return Err(EngineError::NoStartNode);
        }
        *self.start_node_id.lock() = Some(start_node_id.to_string());
        self.scope_pulse_counts.lock().insert(ROOT_SCOPE.to_string(), 0);
        let flow = FlowController::empty(self.config.trace);
        self.enqueue(&flow, start_node_id, initial_stack, "Flow", 0, 0);

        loop {
            if self.check_stop_signal() {
                break;
            }
            if matches!(self.bridge.get(KEY_SYNP_YIELD, None), Some(Value::Bool(true))) {
                self.bridge.set(KEY_SYNP_YIELD, Value::Bool(false), "engine", None);
                return Ok(());
            }
            if !flow.has_next() {
                self.check_scope_terminations(&flow);
                let root_count = *self.scope_pulse_counts.lock().get(ROOT_SCOPE).unwrap_or(&0);
                if root_count <= 0 && !flow.has_next() {
                    break;
                }
                std::thread::sleep(Duration::from_millis(STEP_IDLE_SLEEP_MS));
                continue;
            }
            if let Some(pulse) = flow.pop() {
                self.execute_step(&pulse, &flow);
            }
        }

        self.finish_run();
        Ok(())
    }

    fn finish_run(self: &Arc<Self>) {
        let key = crate::constants::key_subgraph_return(self.parent_node_id.as_deref());
        for scope_id in self.scope_pulse_counts.lock().keys().cloned().collect::<Vec<_>>() {
            if self.lockbox.has_pending(&scope_id) {
                self.lockbox.flush(&scope_id, self.parent_node_id.as_deref(), &self.bridge);
            }
        }
        if let Some(root) = &self.parent_bridge {
            if let Some(value) = self.bridge.get(&key, None) {
                root.bubble_set(&key, value, "ExecutionEngine.finish_run", None);
            }
            if let Some(parent_id) = &self.parent_node_id {
                TraceEvent::SubgraphFinished { parent_id }.emit();
                root.bubble_set(
                    &format!("{parent_id}_SubgraphFinished"),
                    Value::Bool(true),
                    "ExecutionEngine.finish_run",
                    None,
                );
            }
        }
        self.dispatcher.shutdown();
    }

    /// Runs an independent mini-scheduler for a parallel branch spawned
    /// by output routing (spec §4.6 step 6 "additional pulses spawn
    /// independent scheduler loops"). Shares the engine's bridge,
    /// dispatcher and scope-count tables with the main loop.
    fn run_branch(self: &Arc<Self>, pulse: TriggeredPulseOwned) {
        let flow = FlowController::empty(self.config.trace);
        self.enqueue(
            &flow,
            &pulse.to_node,
            pulse.stack,
            &pulse.to_port,
            pulse.priority,
            pulse.delay_ms,
        );
        loop {
            if self.check_stop_signal() {
                break;
            }
            if !flow.has_next() {
                break;
            }
            if let Some(p) = flow.pop() {
                self.execute_step(&p, &flow);
            }
        }
    }

    /// Reads a wired source port's published value off the bridge, with
    /// the legacy `"{node}_{port}"` fallback, then the source node's own
    /// properties if nothing was ever published (spec §4.6.1, grounded on
    /// `_gather_inputs`'s bulk-get-then-property-fallback chain).
    fn read_wire_source(&self, graph: &GraphGeneration, wire: &Wire) -> Option<Value> {
        let identifier = self
            .port_registry
            .bridge_key(&wire.from_node, &wire.from_port, Direction::Output);
        let legacy = PortRegistry::legacy_key(&wire.from_node, &wire.from_port);
        self.bridge
            .get(&identifier, None)
            .or_else(|| self.bridge.get(&legacy, None))
            .or_else(|| {
                graph
                    .nodes
                    .get(&wire.from_node)
                    .and_then(|src| src.property_with_aliases(&wire.from_port).cloned())
            })
    }

    /// Gathers a node's data inputs by walking its *incoming* wires and
    /// reading the source port's value (spec §4.6.1, grounded on
    /// `data_io.py::_gather_inputs`); any declared input port with no
    /// incoming wire falls back to the node's own properties.
    fn gather_inputs(&self, graph: &GraphGeneration, node: &Node, node_id: &str) -> HashMap<String, Value> {
        let mut inputs = HashMap::new();
        let incoming = graph.wires.iter().filter(|w| w.to_node == node_id);
        for wire in incoming {
            let port = &wire.to_port;
            let dtype = node.input_schema.get(port);
            if dtype.map(|d| d.is_flow_class()).unwrap_or(false) {
                continue;
            }
            if !is_returnable_key(port) {
                continue;
            }
            if let Some(value) = self.read_wire_source(graph, wire) {
                let cast = match dtype {
                    Some(dt) => value.soft_cast(dt),
                    None => value,
                };
                inputs.insert(port.clone(), cast);
            }
        }
        for (port, dtype) in &node.input_schema {
            if inputs.contains_key(port) || dtype.is_flow_class() {
                continue;
            }
            if let Some(v) = node.property_with_aliases(port) {
                inputs.insert(port.clone(), v.clone().soft_cast(dtype));
            }
        }
        inputs
    }

    /// Gathers a return node's payload by walking its incoming wires and
    /// reading each source port's value (spec §4.6.2), falling back to the
    /// return node's own declared inputs/properties for anything left
    /// unwired. Mirrors `gather_inputs`'s wire-walk but keeps the
    /// `is_returnable_key` scrub instead of casting to a declared type.
    fn gather_return_payload(&self, graph: &GraphGeneration, node: &Node, node_id: &str) -> HashMap<String, Value> {
        let mut payload = HashMap::new();
        let incoming = graph.wires.iter().filter(|w| w.to_node == node_id);
        for wire in incoming {
            let port = &wire.to_port;
            if !is_returnable_key(port) {
                continue;
            }
            if let Some(v) = self.read_wire_source(graph, wire) {
                payload.insert(port.clone(), v);
            }
        }
        for port in node.input_schema.keys().chain(node.properties.keys()) {
            if payload.contains_key(port) || !is_returnable_key(port) {
                continue;
            }
            let identifier = self
                .port_registry
                .bridge_key(node_id, port, Direction::Input);
            let legacy = PortRegistry::legacy_key(node_id, port);
            if let Some(v) = self
                .bridge
                .get(&identifier, None)
                .or_else(|| self.bridge.get(&legacy, None))
                .or_else(|| node.property_with_aliases(port).cloned())
            {
                payload.insert(port.clone(), v);
            }
        }
        payload
    }

    fn validate_providers(&self, graph: &GraphGeneration, node: &Node, stack: &[String]) -> Result<(), EngineError> {
        for required in &node.flags.required_providers {
            let present = stack
                .iter()
                .any(|scope_id| graph.nodes.get(scope_id).map(|n| &n.node_type == required).unwrap_or(false));
            if !present {
                return Err(EngineError::ValidationFailure {
                    node: node.node_id.clone(),
                    message: format!("missing required provider context: {required}"),
                });
            }
        }
        Ok(())
    }

    fn publish_error(&self, err: &EngineError, node_id: &str, node_name: &str) {
        self.bridge.bubble_set(key_last_error_code(), Value::Int(err.code() as i64), "engine", None);
        self.bridge
            .bubble_set(key_last_error_message(), Value::String(err.to_string()), "engine", None);
        self.bridge
            .bubble_set(key_last_error_node(), Value::String(node_id.to_string()), "engine", None);
        self.bridge
            .bubble_set(key_last_error_node_name(), Value::String(node_name.to_string()), "engine", None);
        TraceEvent::NodeError {
            id: node_id,
            message: &err.to_string(),
        }
        .emit();
    }

    /// Panic handler (spec §4.6.3): populates the last-error keys, emits a
    /// console banner, then looks for a wire from the *start node* on a
    /// panic-style port (`Error Flow`/`Error`/`Panic`) and routes there on
    /// the ROOT scope; with none wired, logs unhandled and lets the pulse
    /// fall through without halting the rest of the run.
    fn handle_panic(&self, graph: &GraphGeneration, err: EngineError, node_id: &str, flow: &FlowController) {
        self.bridge.bubble_set(KEY_PANICKED, Value::Bool(true), "engine", None);
        self.publish_error(&err, node_id, node_id);
        TraceEvent::CriticalError {
            message: &err.to_string(),
        }
        .emit();

        let start_node_id = self.start_node_id.lock().clone();
        let Some(start_node_id) = start_node_id else {
            return;
        };
        let panic_wires: Vec<&Wire> = graph
            .wires
            .iter()
            .filter(|w| w.from_node == start_node_id && PANIC_PORTS.contains(&w.from_port.as_str()))
            .collect();
        if panic_wires.is_empty() {
            log::warn!("unhandled panic in node {node_id}: {err}");
            return;
        }
        for w in panic_wires {
            self.enqueue(flow, &w.to_node, vec![ROOT_SCOPE.to_string()], &w.to_port, 0, 0);
        }
    }

    /// The fifteen-step pulse lifecycle (spec §4.6).
    fn execute_step(self: &Arc<Self>, pulse: &Pulse, flow: &FlowController) {
        // Snapshot the graph generation once at step start (spec §9
        // REDESIGN FLAG): the rest of this step reads only from `graph`,
        // so a concurrent hot-reload can swap the engine's pointer to a
        // new generation without changing what this step observes.
        let graph = self.graph();
        let node_id = pulse.node_id.clone();
        let stack = pulse.stack.clone();

        // Step: cancellation check.
        if self.cancelled(&stack) {
            self.release(&stack);
            return;
        }

        // Step: missing-node check.
        let Some(node) = graph.nodes.get(&node_id).cloned() else {
            self.release(&stack);
            return;
        };
        let Some(node_impl) = graph.node_impls.get(&node_id).cloned() else {
            self.release(&stack);
            return;
        };

        // Step: return-node barrier (skipped for loop scopes).
        let in_loop_scope = stack.last().map(|s| s.starts_with("LO_")).unwrap_or(false);
        if node.node_type == "ReturnNode" && !in_loop_scope {
            let active_scope = stack.last().cloned().unwrap_or_else(|| ROOT_SCOPE.to_string());
            let payload = self.gather_return_payload(&graph, &node, &node_id);
            self.lockbox.deposit(&active_scope, payload);
            self.release(&stack);
            return;
        }

        // Step: provider-requirement validation.
        if let Err(e) = self.validate_providers(&graph, &node, &stack) {
            if let Some(caught) = self.context.handle_error(&e, &stack, &graph.wires) {
                self.enqueue(flow, &caught.catch_node_id, caught.parent_stack, "Catch", 0, 0);
            } else {
                self.publish_error(&e, &node_id, &node.name);
            }
            self.release(&stack);
            return;
        }

        // Step: input gathering + stack update.
        let inputs = self.gather_inputs(&graph, &node, &node_id);
        let entry_port = &pulse.trigger_port;
        let new_stack = self.context.update_stack(&node, &stack, entry_port);

        TraceEvent::NodeStart { id: &node_id }.emit_if(self.config.trace && !self.config.headless);

        // Step: sanitise signals. Clear any ActivePorts/Condition a prior
        // pulse through this node left behind, so a node that only sets
        // them conditionally never misroutes on a stale value (spec
        // §4.6 step 8).
        self.bridge
            .bubble_set(&format!("{node_id}_ActivePorts"), Value::Null, "engine", None);
        self.bridge
            .bubble_set(&format!("{node_id}_Condition"), Value::Null, "engine", None);

        // Step: dispatch + wait.
        let dispatch_result = self
            .dispatcher
            .dispatch(node_id.clone(), node_impl.clone(), inputs, new_stack.clone(), Arc::clone(&self.bridge))
            .wait();

        TraceEvent::NodeStop { id: &node_id }.emit_if(self.config.trace && !self.config.headless);

        let outputs = match dispatch_result {
            Ok(outputs) => outputs,
            Err(e @ EngineError::Panic { .. }) => {
                self.handle_panic(&graph, e, &node_id, flow);
                self.release(&stack);
                return;
            }
            Err(e) => {
                if let Some(caught) = self.context.handle_error(&e, &stack, &graph.wires) {
                    self.enqueue(flow, &caught.catch_node_id, caught.parent_stack, "Catch", 0, 0);
                } else {
                    self.publish_error(&e, &node_id, &node.name);
                }
                self.release(&stack);
                return;
            }
        };

        self.publish_outputs(&node_id, &outputs);

        // Step: yield/suspend signal. A node reporting `_YSWAIT` asks for
        // its outputs to route only after `delay_ms` (spec §4.6 step 11,
        // grounded on the `("_YSWAIT", delay_ms, pulse?)` tuple in
        // `execution_engine.py`'s dispatch loop).
        let delay_ms = outputs
            .get("_YSWAIT")
            .and_then(|v| v.as_f64())
            .map(|ms| ms.max(0.0) as u64)
            .unwrap_or(0);
        if delay_ms > 0 {
            let should_pulse = outputs.get("_YSWAIT_PULSE").and_then(|v| v.as_bool()).unwrap_or(false);
            if should_pulse {
                TraceEvent::NodeWaitingPulse { id: &node_id, ms: delay_ms }
                    .emit_if(self.config.trace && !self.config.headless);
            } else {
                TraceEvent::NodeWaitingStart { id: &node_id, ms: delay_ms }
                    .emit_if(self.config.trace && !self.config.headless);
            }
        }

        // Step: wireless broadcast for sender-style nodes. `route_wireless`
        // pushes its pulses directly (mirroring `route_wireless`'s own
        // push-then-report-count shape in the original); each one still
        // owes the scope-pulse-count table an increment, same as
        // `enqueue`, or scope termination fires early.
        if let Some(Value::String(tag)) = outputs.get("Tag").or_else(|| node.properties.get("Tag")) {
            let matching: Vec<String> = graph
                .nodes
                .values()
                .filter(|n| {
                    n.properties
                        .get("Tag")
                        .and_then(|v| if let Value::String(s) = v { Some(s.as_str()) } else { None })
                        == Some(tag.as_str())
                })
                .map(|n| n.node_id.clone())
                .collect();
            let broadcast_count = flow.route_wireless(tag, &matching, &new_stack, self.config.headless, self.config.trace);
            self.account_broadcast(&new_stack, broadcast_count as i64);
        }

        // Step: output resolution, split entry-ports (into a new provider
        // scope) from completion ports (after the scope closes).
        if node.flags.is_provider {
            self.route_provider_outputs(&graph, &node_id, &stack, &new_stack, flow, delay_ms);
        } else {
            let triggered = flow.route_outputs(
                &node_id,
                &graph.wires,
                &self.bridge,
                &new_stack,
                RouteOptions {
                    headless: self.config.headless,
                    trace: self.config.trace,
                    push_directly: false,
                    delay_ms,
                    ..Default::default()
                },
            );
            self.dispatch_triggered(triggered, flow);
        }

        self.check_scope_terminations(flow);
        self.release(&stack);
    }

    fn publish_outputs(&self, node_id: &str, outputs: &NodeOutputs) {
        for (port, value) in outputs {
            if port == "ActivePorts" || port == "Condition" {
                self.bridge
                    .set(&format!("{node_id}_{port}"), value.clone(), "engine", None);
                continue;
            }
            let identifier = self.port_registry.bridge_key(node_id, port, Direction::Output);
            self.bridge.set(&identifier, value.clone(), "engine", None);
            let legacy = PortRegistry::legacy_key(node_id, port);
            self.bridge.set(&legacy, value.clone(), "engine", None);
        }
    }

    fn route_provider_outputs(
        self: &Arc<Self>,
        graph: &GraphGeneration,
        node_id: &str,
        parent_stack: &[String],
        entry_stack: &[String],
        flow: &FlowController,
        delay_ms: u64,
    ) {
        let entry_ports: Vec<String> = vec!["Provider Flow".to_string(), "Loop".to_string()];

        let entry_triggered = flow.route_outputs(
            node_id,
            &graph.wires,
            &self.bridge,
            entry_stack,
            RouteOptions {
                headless: self.config.headless,
                trace: self.config.trace,
                push_directly: false,
                port_include: Some(&entry_ports),
                delay_ms,
                ..Default::default()
            },
        );

        let completion_wires: Vec<Wire> = graph
            .wires
            .iter()
            .filter(|w| w.from_node == node_id && !entry_ports.contains(&w.from_port))
            .cloned()
            .collect();

        if entry_triggered.is_empty() {
            // No pulses entered the scope; fire completion immediately.
            let completion = flow.route_outputs(
                node_id,
                &completion_wires,
                &self.bridge,
                parent_stack,
                RouteOptions {
                    headless: self.config.headless,
                    trace: self.config.trace,
                    push_directly: false,
                    force_trigger: true,
                    ..Default::default()
                },
            );
            self.dispatch_triggered(completion, flow);
        } else {
            self.pending_terminations.lock().insert(
                node_id.to_string(),
                PendingTermination {
                    provider_node_id: node_id.to_string(),
                    completion_wires,
                    parent_stack: parent_stack.to_vec(),
                },
            );
            self.dispatch_triggered(entry_triggered, flow);
        }
    }

    fn dispatch_triggered(self: &Arc<Self>, triggered: Vec<crate::flow::TriggeredPulse>, flow: &FlowController) {
        let mut iter = triggered.into_iter();
        if let Some(first) = iter.next() {
            self.enqueue(flow, &first.to_node, first.stack, &first.to_port, first.priority, first.delay_ms);
        }
        for extra in iter {
            let owned = TriggeredPulseOwned {
                to_node: extra.to_node,
                to_port: extra.to_port,
                stack: extra.stack,
                priority: extra.priority,
                delay_ms: extra.delay_ms,
            };
            let engine = Arc::clone(self);
            std::thread::spawn(move || engine.run_branch(owned));
        }
    }

    /// Scope-termination sweep (spec §4.6): repeatedly fires completion
    /// routes and flushes the lockbox for every scope whose pulse count
    /// has drained to zero, until a fixed point.
    fn check_scope_terminations(self: &Arc<Self>, flow: &FlowController) {
        let graph = self.graph();
        loop {
            let drained: Vec<String> = {
                let counts = self.scope_pulse_counts.lock();
                counts
                    .iter()
                    .filter(|(id, count)| id.as_str() != ROOT_SCOPE && **count <= 0)
                    .map(|(id, _)| id.clone())
                    .collect()
            };
            if drained.is_empty() {
                break;
            }
            let mut changed = false;
            for scope_id in drained {
                if self.lockbox.has_pending(&scope_id) {
                    self.lockbox.flush(&scope_id, self.parent_node_id.as_deref(), &self.bridge);
                }
                if let Some(pending) = self.pending_terminations.lock().remove(&scope_id) {
                    let is_singleton = graph
                        .nodes
                        .get(&pending.provider_node_id)
                        .map(|n| matches!(n.properties.get("Singleton Scope"), Some(Value::Bool(true))))
                        .unwrap_or(false);
                    if let Some(node_impl) = graph.node_impls.get(&pending.provider_node_id) {
                        if !is_singleton {
                            node_impl.cleanup_provider_context(&pending.provider_node_id, &self.bridge);
                        }
                    }
                    let completion = flow.route_outputs(
                        &pending.provider_node_id,
                        &pending.completion_wires,
                        &self.bridge,
                        &pending.parent_stack,
                        RouteOptions {
                            headless: self.config.headless,
                            trace: self.config.trace,
                            push_directly: false,
                            force_trigger: true,
                            ..Default::default()
                        },
                    );
                    self.dispatch_triggered(completion, flow);
                }
                self.scope_pulse_counts.lock().remove(&scope_id);
                changed = true;
            }
            if !changed {
                break;
            }
        }
    }

    /// Hot reload (spec §4.6.4, §9 REDESIGN FLAG): an external watcher
    /// (the CLI's file-mtime poll) hands in a freshly-loaded graph. Calls
    /// `terminate` on every node id that disappeared, registers port
    /// entries for anything new, then builds a brand new
    /// `GraphGeneration` and swaps the engine's pointer to it — no
    /// in-place mutation of the running node/wire tables. A step that
    /// already snapshotted the old generation finishes against it; the
    /// next pulse to start picks up the new one.
    pub fn hot_reload(
        &self,
        source: &str,
        new_nodes: HashMap<String, Node>,
        new_node_impls: HashMap<String, Arc<dyn NodeContract>>,
        new_wires: Vec<Wire>,
    ) {
        let old = self.graph();
        for (id, node_impl) in old.node_impls.iter() {
            if !new_nodes.contains_key(id) {
                node_impl.terminate(id, &self.bridge);
            }
        }
        for node in new_nodes.values() {
            for port in node.input_schema.keys() {
                self.port_registry.register(&node.node_id, port, Direction::Input, &node.name);
            }
            for port in node.output_schema.keys() {
                self.port_registry.register(&node.node_id, port, Direction::Output, &node.name);
            }
        }
        let next = Arc::new(GraphGeneration {
            nodes: new_nodes,
            node_impls: new_node_impls,
            wires: new_wires,
        });
        *self.graph.write() = next;
        TraceEvent::HotReload { path: source }.emit_if(self.config.trace && !self.config.headless);
    }
}

struct TriggeredPulseOwned {
    to_node: String,
    to_port: String,
    stack: ScopeStack,
    priority: i64,
    delay_ms: u64,
}

impl<'a> TraceEvent<'a> {
    fn emit_if(&self, condition: bool) {
        if condition {
            self.emit();
        }
    }
}
