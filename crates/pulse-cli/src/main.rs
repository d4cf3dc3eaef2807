//! pulse-cli: batch/headless runner for a persisted pulse graph (spec
//! §6 "CLI surface"). Loads a graph file, resolves a start node (or
//! autoselects when exactly one exists), runs it to completion, and
//! relays runtime control files into the bridge's `_SYSTEM_STOP` key for
//! engines supervised from outside the process.

use pulse_core::{Bridge, EngineConfig, ExecutionEngine};
use pulse_domain::Value;
use pulse_persistence::{build_graph_snapshot, load_graph, ControlFiles, SETTINGS};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

struct CliArgs {
    graph_path: PathBuf,
    start_node: Option<String>,
    headless: bool,
    trace: bool,
    delay_secs: f64,
    pause_file: Option<PathBuf>,
    stop_file: Option<PathBuf>,
    speed_file: Option<PathBuf>,
}

impl CliArgs {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, String> {
        let graph_path = args
            .next()
            .ok_or_else(|| "usage: pulse-cli <graph.json> [flags]".to_string())?
            .into();

        let mut parsed = CliArgs {
            graph_path,
            start_node: None,
            headless: false,
            trace: true,
            delay_secs: 0.0,
            pause_file: None,
            stop_file: None,
            speed_file: None,
        };

        while let Some(flag) = args.next() {
            match flag.as_str() {
                "--start-node" => parsed.start_node = Some(next_value(&mut args, &flag)?),
                "--headless" => parsed.headless = true,
                "--no-trace" => parsed.trace = false,
                "--delay" => {
                    parsed.delay_secs = next_value(&mut args, &flag)?
                        .parse()
                        .map_err(|_| format!("{flag} expects a number"))?
                }
                "--pause-file" => parsed.pause_file = Some(next_value(&mut args, &flag)?.into()),
                "--stop-file" => parsed.stop_file = Some(next_value(&mut args, &flag)?.into()),
                "--speed-file" => parsed.speed_file = Some(next_value(&mut args, &flag)?.into()),
                other => return Err(format!("unrecognised flag: {other}")),
            }
        }

        Ok(parsed)
    }
}

fn next_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, String> {
    args.next().ok_or_else(|| format!("{flag} expects a value"))
}

/// Watches the control files on a background thread and relays them into
/// the bridge's reserved keys (spec §6: pause/speed/stop files are a host
/// contract the engine itself never reads from disk directly).
fn spawn_control_watcher(bridge: Arc<Bridge>, controls: ControlFiles, base_delay: Duration) {
    std::thread::spawn(move || loop {
        if controls.is_stopped() {
            bridge.set("_SYSTEM_STOP", Value::Bool(true), "pulse-cli", None);
            return;
        }
        if controls.is_paused() {
            std::thread::sleep(Duration::from_millis(100));
            continue;
        }
        std::thread::sleep(controls.step_delay(base_delay).max(Duration::from_millis(50)));
    });
}

/// Watches the graph file's mtime and applies changes to a running engine
/// (spec §4.6.4 "Hot reload"). In-flight pulses are untouched; the new
/// graph only governs pulses enqueued after the swap.
fn spawn_hot_reload_watcher(engine: Arc<ExecutionEngine>, graph_path: PathBuf, poll: Duration) {
    std::thread::spawn(move || {
        let mut last_mtime = std::fs::metadata(&graph_path).and_then(|m| m.modified()).ok();
        loop {
            std::thread::sleep(poll);
            if engine.check_stop_signal() {
                return;
            }
            let mtime = match std::fs::metadata(&graph_path).and_then(|m| m.modified()) {
                Ok(mtime) => mtime,
                Err(_) => continue,
            };
            if last_mtime == Some(mtime) {
                continue;
            }
            last_mtime = Some(mtime);

            let loaded = match load_graph(&graph_path) {
                Ok(loaded) => loaded,
                Err(e) => {
                    log::warn!("hot reload: failed to reload {}: {e}", graph_path.display());
                    continue;
                }
            };
            let snapshot = match build_graph_snapshot(&loaded.document, pulse_nodes::build) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    log::warn!("hot reload: failed to rebuild {}: {e}", graph_path.display());
                    continue;
                }
            };
            engine.hot_reload(
                &graph_path.display().to_string(),
                snapshot.nodes,
                snapshot.node_impls,
                snapshot.wires,
            );
        }
    });
}

fn run(cli: CliArgs) -> Result<(), String> {
    let loaded = load_graph(&cli.graph_path).map_err(|e| e.to_string())?;

    let start_node_id = match cli.start_node.clone() {
        Some(id) => id,
        None => match loaded.start_node_ids.as_slice() {
            [single] => single.clone(),
            [] => return Err("no start node found in graph file; pass --start-node".to_string()),
            _ => return Err("multiple start nodes found in graph file; pass --start-node".to_string()),
        },
    };

    let snapshot = build_graph_snapshot(&loaded.document, pulse_nodes::build)
        .map_err(|e| format!("failed to build graph: {e}"))?;

    let bridge = Bridge::new();
    bridge.set("_SYSTEM_HEADLESS", Value::Bool(cli.headless), "pulse-cli", None);

    let controls = ControlFiles::new(
        cli.pause_file.clone(),
        cli.speed_file.clone(),
        cli.stop_file.clone(),
    );
    if controls.pause_file.is_some() || controls.speed_file.is_some() || controls.stop_file.is_some() {
        spawn_control_watcher(
            Arc::clone(&bridge),
            controls,
            Duration::from_secs_f64(cli.delay_secs.max(0.0)),
        );
    }

    let config = EngineConfig {
        headless: cli.headless,
        trace: cli.trace,
        default_scope: "ROOT".to_string(),
    };

    let engine = ExecutionEngine::new(snapshot, bridge, config);
    spawn_hot_reload_watcher(
        Arc::clone(&engine),
        cli.graph_path.clone(),
        Duration::from_millis(SETTINGS.hot_reload_poll_ms),
    );
    engine
        .run(&start_node_id, vec!["ROOT".to_string()])
        .map_err(|e| format!("run stopped: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> impl Iterator<Item = String> {
        raw.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn parses_graph_path_with_defaults() {
        let cli = CliArgs::parse(args(&["graph.json"])).unwrap();
        assert_eq!(cli.graph_path, PathBuf::from("graph.json"));
        assert_eq!(cli.start_node, None);
        assert!(!cli.headless);
        assert!(cli.trace);
        assert_eq!(cli.delay_secs, 0.0);
    }

    #[test]
    fn parses_all_flags() {
        let cli = CliArgs::parse(args(&[
            "graph.json",
            "--start-node",
            "n1",
            "--headless",
            "--no-trace",
            "--delay",
            "0.5",
            "--pause-file",
            "/tmp/pause",
            "--stop-file",
            "/tmp/stop",
            "--speed-file",
            "/tmp/speed",
        ]))
        .unwrap();
        assert_eq!(cli.start_node, Some("n1".to_string()));
        assert!(cli.headless);
        assert!(!cli.trace);
        assert_eq!(cli.delay_secs, 0.5);
        assert_eq!(cli.pause_file, Some(PathBuf::from("/tmp/pause")));
        assert_eq!(cli.stop_file, Some(PathBuf::from("/tmp/stop")));
        assert_eq!(cli.speed_file, Some(PathBuf::from("/tmp/speed")));
    }

    #[test]
    fn missing_graph_path_is_an_error() {
        assert!(CliArgs::parse(args(&[])).is_err());
    }

    #[test]
    fn unrecognised_flag_is_an_error() {
        assert!(CliArgs::parse(args(&["graph.json", "--bogus"])).is_err());
    }

    #[test]
    fn flag_missing_its_value_is_an_error() {
        assert!(CliArgs::parse(args(&["graph.json", "--start-node"])).is_err());
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match CliArgs::parse(args.into_iter()) {
        Ok(cli) => cli,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli) {
        Ok(()) => {
            log::info!("run completed cleanly");
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}
