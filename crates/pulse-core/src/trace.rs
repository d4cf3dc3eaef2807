//! The stdout trace protocol (spec §6 "Trace protocol"). UI front-ends
//! parse these lines directly, so the exact wire format matters more than
//! how it's produced — this module is the single place that owns it.

pub enum TraceEvent<'a> {
    NodeStart { id: &'a str },
    NodeStop { id: &'a str },
    Flow {
        from_id: &'a str,
        from_port: &'a str,
        to_id: &'a str,
        to_port: &'a str,
        priority: i64,
        delay_ms: u64,
    },
    NodeWaitingStart { id: &'a str, ms: u64 },
    NodeWaitingPulse { id: &'a str, ms: u64 },
    Wireless { tag: &'a str },
    ServiceStart { id: &'a str },
    NodeError { id: &'a str, message: &'a str },
    SubgraphActivity { parent_id: &'a str },
    SubgraphFinished { parent_id: &'a str },
    HotReload { path: &'a str },
    CriticalError { message: &'a str },
}

impl<'a> TraceEvent<'a> {
    pub fn render(&self) -> String {
        match self {
            TraceEvent::NodeStart { id } => format!("[NODE_START] {id}"),
            TraceEvent::NodeStop { id } => format!("[NODE_STOP] {id}"),
            TraceEvent::Flow {
                from_id,
                from_port,
                to_id,
                to_port,
                priority,
                delay_ms,
            } => {
                let prio_str = if *priority != 0 {
                    format!(" [P:{priority}]")
                } else {
                    String::new()
                };
                let delay_str = if *delay_ms > 0 {
                    format!(" [D:{delay_ms}ms]")
                } else {
                    String::new()
                };
                format!("[FLOW] {from_id}:{from_port} -> {to_id}:{to_port}{prio_str}{delay_str}")
            }
            TraceEvent::NodeWaitingStart { id, ms } => format!("[NODE_WAITING_START] {id} | {ms}"),
            TraceEvent::NodeWaitingPulse { id, ms } => format!("[NODE_WAITING_PULSE] {id} | {ms}"),
            TraceEvent::Wireless { tag } => format!("[WIRELESS] Broadcasting tag: {tag}"),
            TraceEvent::ServiceStart { id } => format!("[SERVICE_START] {id}"),
            TraceEvent::NodeError { id, message } => format!("[NODE_ERROR] {id} | {message}"),
            TraceEvent::SubgraphActivity { parent_id } => {
                format!("[SYNP_SUBGRAPH_ACTIVITY] {parent_id}")
            }
            TraceEvent::SubgraphFinished { parent_id } => {
                format!("[SYNP_SUBGRAPH_FINISHED] {parent_id}")
            }
            TraceEvent::HotReload { path } => format!("[HOT_RELOAD] {path}"),
            TraceEvent::CriticalError { message } => format!("[CRITICAL ERROR] {message}"),
        }
    }

    pub fn emit(&self) {
        println!("{}", self.render());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flow_event_omits_optional_suffixes_when_default() {
        let ev = TraceEvent::Flow {
            from_id: "a",
            from_port: "Flow",
            to_id: "b",
            to_port: "Flow",
            priority: 0,
            delay_ms: 0,
        };
        assert_eq!(ev.render(), "[FLOW] a:Flow -> b:Flow");
    }

    #[test]
    fn flow_event_includes_priority_and_delay() {
        let ev = TraceEvent::Flow {
            from_id: "a",
            from_port: "Out",
            to_id: "b",
            to_port: "In",
            priority: 5,
            delay_ms: 100,
        };
        assert_eq!(ev.render(), "[FLOW] a:Out -> b:In [P:5] [D:100ms]");
    }
}
