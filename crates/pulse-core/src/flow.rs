//! Flow Controller: priority queue, delayed queue, and output-port
//! routing (spec §4.3). Verified against the full body of
//! `synapse/core/flow_controller.py`.

use crate::bridge::Bridge;
use crate::constants::LEGACY_FLOW_PORTS;
use crate::trace::TraceEvent;
use parking_lot::Mutex;
use pulse_domain::{Value, Wire};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::time::{Duration, Instant};

pub type ScopeStack = Vec<String>;

#[derive(Debug, Clone)]
pub struct Pulse {
    pub node_id: String,
    pub stack: ScopeStack,
    pub trigger_port: String,
}

#[derive(Debug, Clone)]
struct QueueItem {
    priority: i64,
    seq: u64,
    pulse: Pulse,
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}
impl Eq for QueueItem {}

impl Ord for QueueItem {
    /// Max-priority first; FIFO (lower sequence number first) within the
    /// same priority (spec §4.3 "State").
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}
impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone)]
struct DelayedItem {
    wake_time: Instant,
    item: QueueItem,
}
impl PartialEq for DelayedItem {
    fn eq(&self, other: &Self) -> bool {
        self.wake_time == other.wake_time
    }
}
impl Eq for DelayedItem {}
impl Ord for DelayedItem {
    /// Earliest wake time pops first (min-heap over a `BinaryHeap`, which
    /// is otherwise max-first — hence the flipped comparison).
    fn cmp(&self, other: &Self) -> Ordering {
        other.wake_time.cmp(&self.wake_time)
    }
}
impl PartialOrd for DelayedItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub struct TriggeredPulse {
    pub from_node: String,
    pub from_port: String,
    pub to_node: String,
    pub to_port: String,
    pub stack: ScopeStack,
    pub priority: i64,
    pub delay_ms: u64,
}

#[derive(Default)]
pub struct RouteOptions<'a> {
    pub headless: bool,
    pub trace: bool,
    pub priority: i64,
    pub delay_ms: u64,
    pub stack_override_map: Option<&'a HashMap<String, ScopeStack>>,
    pub port_exclude: Option<&'a [String]>,
    pub port_include: Option<&'a [String]>,
    pub force_trigger: bool,
    pub push_directly: bool,
}

struct Inner {
    queue: BinaryHeap<QueueItem>,
    delayed_queue: BinaryHeap<DelayedItem>,
    counter: u64,
}

/// Snapshot used for in-process time-travel debugging (spec §4.3
/// `export_state`/`import_state`). Not persisted to disk — that is the
/// Bridge's job (see `pulse-persistence::snapshot`).
#[derive(Clone)]
pub struct FlowSnapshot {
    queue: Vec<(i64, u64, Pulse)>,
    delayed_queue: Vec<(Instant, i64, u64, Pulse)>,
    counter: u64,
}

pub struct FlowController {
    inner: Mutex<Inner>,
    pub trace: bool,
}

impl FlowController {
    pub fn new(start_node_id: &str, initial_stack: ScopeStack, trace: bool) -> Self {
        let fc = FlowController {
            inner: Mutex::new(Inner {
                queue: BinaryHeap::new(),
                delayed_queue: BinaryHeap::new(),
                counter: 0,
            }),
            trace,
        };
        fc.push(start_node_id, initial_stack, "Flow", 0, 0);
        fc
    }

    /// A controller with nothing pre-seeded, for parallel branches that
    /// push their own first pulse with a caller-supplied priority/delay
    /// (spec §4.6 step 12 "Branch spawning").
    pub fn empty(trace: bool) -> Self {
        FlowController {
            inner: Mutex::new(Inner {
                queue: BinaryHeap::new(),
                delayed_queue: BinaryHeap::new(),
                counter: 0,
            }),
            trace,
        }
    }

    fn process_delayed_locked(inner: &mut Inner) {
        let now = Instant::now();
        while let Some(top) = inner.delayed_queue.peek() {
            if top.wake_time <= now {
                let DelayedItem { item, .. } = inner.delayed_queue.pop().unwrap();
                inner.queue.push(item);
            } else {
                break;
            }
        }
    }

    pub fn has_next(&self) -> bool {
        let mut inner = self.inner.lock();
        Self::process_delayed_locked(&mut inner);
        !inner.queue.is_empty() || !inner.delayed_queue.is_empty()
    }

    pub fn pop(&self) -> Option<Pulse> {
        let mut inner = self.inner.lock();
        Self::process_delayed_locked(&mut inner);
        inner.queue.pop().map(|qi| qi.pulse)
    }

    pub fn push(
        &self,
        node_id: &str,
        context_stack: ScopeStack,
        trigger_port: &str,
        priority: i64,
        delay_ms: u64,
    ) {
        let mut inner = self.inner.lock();
        let seq = inner.counter;
        inner.counter += 1;
        let item = QueueItem {
            priority,
            seq,
            pulse: Pulse {
                node_id: node_id.to_string(),
                stack: context_stack,
                trigger_port: trigger_port.to_string(),
            },
        };
        if delay_ms > 0 {
            let wake_time = Instant::now() + Duration::from_millis(delay_ms);
            inner.delayed_queue.push(DelayedItem { wake_time, item });
        } else {
            inner.queue.push(item);
        }
    }

    fn build_pulse(
        wire: &Wire,
        context_stack: &[String],
        opts: &RouteOptions,
    ) -> TriggeredPulse {
        let stack = opts
            .stack_override_map
            .and_then(|m| m.get(&wire.from_port))
            .cloned()
            .unwrap_or_else(|| context_stack.to_vec());
        TriggeredPulse {
            from_node: wire.from_node.clone(),
            from_port: wire.from_port.clone(),
            to_node: wire.to_node.clone(),
            to_port: wire.to_port.clone(),
            stack,
            priority: opts.priority,
            delay_ms: opts.delay_ms,
        }
    }

    fn push_flow_intent(&self, pulse: &TriggeredPulse, headless: bool, trace: bool) {
        if trace && !headless {
            TraceEvent::Flow {
                from_id: &pulse.from_node,
                from_port: &pulse.from_port,
                to_id: &pulse.to_node,
                to_port: &pulse.to_port,
                priority: pulse.priority,
                delay_ms: pulse.delay_ms,
            }
            .emit();
        }
        self.push(
            &pulse.to_node,
            pulse.stack.clone(),
            &pulse.to_port,
            pulse.priority,
            pulse.delay_ms,
        );
    }

    /// `route_outputs` — the four-rule output resolution algorithm (spec
    /// §4.3 "Output resolution").
    pub fn route_outputs(
        &self,
        node_id: &str,
        wires: &[Wire],
        bridge: &Bridge,
        context_stack: &[String],
        opts: RouteOptions,
    ) -> Vec<TriggeredPulse> {
        let trace_active = opts.trace;

        let (active_ports, condition_result) = if opts.force_trigger {
            (None, None)
        } else {
            let active = bridge
                .get(&format!("{node_id}_ActivePorts"), None)
                .and_then(value_to_string_list);
            let condition = bridge
                .get(&format!("{node_id}_Condition"), None)
                .and_then(|v| v.as_bool());
            (active, condition)
        };

        let relevant_wires: Vec<&Wire> = wires.iter().filter(|w| w.from_node == node_id).collect();
        let mut triggered = Vec::new();

        for w in &relevant_wires {
            let port = &w.from_port;
            if let Some(exclude) = opts.port_exclude {
                if exclude.iter().any(|p| p == port) {
                    continue;
                }
            }
            if let Some(include) = opts.port_include {
                if !include.iter().any(|p| p == port) {
                    continue;
                }
            }

            let mut should_trigger = false;

            if let Some(active) = &active_ports {
                if active.iter().any(|p| p == port) {
                    should_trigger = true;
                }
                if should_trigger {
                    triggered.push(Self::build_pulse(w, context_stack, &opts));
                }
                continue;
            }

            if let Some(cond) = condition_result {
                let has_true_false = relevant_wires
                    .iter()
                    .any(|pw| pw.from_port == "True" || pw.from_port == "False");

                if port == "True" && cond {
                    should_trigger = true;
                } else if port == "False" && !cond {
                    should_trigger = true;
                }

                if should_trigger {
                    triggered.push(Self::build_pulse(w, context_stack, &opts));
                }

                if has_true_false {
                    continue;
                }
            }

            if LEGACY_FLOW_PORTS.contains(&port.as_str()) {
                should_trigger = true;
            }

            if should_trigger {
                triggered.push(Self::build_pulse(w, context_stack, &opts));
            }
        }

        if opts.push_directly {
            for p in &triggered {
                self.push_flow_intent(p, opts.headless, trace_active);
            }
        }

        triggered
    }

    /// `route_wireless` — broadcasts to every node whose `tag` property
    /// matches (spec §4.3, §GLOSSARY).
    pub fn route_wireless(
        &self,
        tag: &str,
        matching_node_ids: &[String],
        context_stack: &[String],
        headless: bool,
        trace: bool,
    ) -> usize {
        if tag.is_empty() {
            return 0;
        }
        if trace && !headless {
            TraceEvent::Wireless { tag }.emit();
        }
        for sub_id in matching_node_ids {
            if trace && !headless {
                TraceEvent::Flow {
                    from_id: sub_id,
                    from_port: "Wireless",
                    to_id: sub_id,
                    to_port: "Wireless",
                    priority: 0,
                    delay_ms: 0,
                }
                .emit();
            }
            self.push(sub_id, context_stack.to_vec(), "Wireless", 0, 0);
        }
        matching_node_ids.len()
    }

    pub fn export_state(&self) -> FlowSnapshot {
        let inner = self.inner.lock();
        let queue = inner
            .queue
            .iter()
            .map(|qi| (qi.priority, qi.seq, qi.pulse.clone()))
            .collect();
        let delayed_queue = inner
            .delayed_queue
            .iter()
            .map(|di| (di.wake_time, di.item.priority, di.item.seq, di.item.pulse.clone()))
            .collect();
        FlowSnapshot {
            queue,
            delayed_queue,
            counter: inner.counter,
        }
    }

    pub fn import_state(&self, snapshot: FlowSnapshot) {
        let mut inner = self.inner.lock();
        inner.queue = snapshot
            .queue
            .into_iter()
            .map(|(priority, seq, pulse)| QueueItem { priority, seq, pulse })
            .collect();
        inner.delayed_queue = snapshot
            .delayed_queue
            .into_iter()
            .map(|(wake_time, priority, seq, pulse)| DelayedItem {
                wake_time,
                item: QueueItem { priority, seq, pulse },
            })
            .collect();
        inner.counter = snapshot.counter;
    }
}

fn value_to_string_list(value: Value) -> Option<Vec<String>> {
    match value {
        Value::List(items) => Some(
            items
                .into_iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_then_fifo_ordering() {
        let fc = FlowController::empty(false);
        fc.push("a", vec![], "Flow", 0, 0);
        fc.push("b", vec![], "Flow", 10, 0);
        fc.push("c", vec![], "Flow", 10, 0);
        assert_eq!(fc.pop().unwrap().node_id, "b");
        assert_eq!(fc.pop().unwrap().node_id, "c");
        assert_eq!(fc.pop().unwrap().node_id, "a");
    }

    #[test]
    fn delayed_pulse_not_eligible_before_ready_time() {
        let fc = FlowController::empty(false);
        fc.push("late", vec![], "Flow", 0, 50);
        assert!(fc.pop().is_none());
        std::thread::sleep(Duration::from_millis(80));
        assert_eq!(fc.pop().unwrap().node_id, "late");
    }

    #[test]
    fn route_outputs_legacy_fallback_fires_flow_port() {
        let bridge = Bridge::new();
        let fc = FlowController::empty(false);
        let wires = vec![Wire::new("n1", "Flow", "n2", "Flow")];
        let triggered = fc.route_outputs(
            "n1",
            &wires,
            &bridge,
            &[],
            RouteOptions {
                push_directly: false,
                ..Default::default()
            },
        );
        assert_eq!(triggered.len(), 1);
        assert_eq!(triggered[0].to_node, "n2");
    }

    #[test]
    fn route_outputs_respects_condition_true_false() {
        let bridge = Bridge::new();
        bridge.set("n1_Condition", Value::Bool(true), "t", None);
        let fc = FlowController::empty(false);
        let wires = vec![
            Wire::new("n1", "True", "n2", "Flow"),
            Wire::new("n1", "False", "n3", "Flow"),
        ];
        let triggered = fc.route_outputs(
            "n1",
            &wires,
            &bridge,
            &[],
            RouteOptions {
                push_directly: false,
                ..Default::default()
            },
        );
        assert_eq!(triggered.len(), 1);
        assert_eq!(triggered[0].to_node, "n2");
    }
}
