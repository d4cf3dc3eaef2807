//! Bridge state snapshotting to disk (spec §4.1 `export_state`/
//! `import_state`, §8 round-trip law). `Bridge::export_state` already
//! produces a serializable shape; this module just owns the file I/O
//! around it so the time-travel debugging facility can persist across
//! process restarts, not just within one run.

use pulse_core::{Bridge, BridgeSnapshot};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to (de)serialize snapshot at {path}: {source}")]
    Serde {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Writes `bridge.export_state()` to `path` as JSON.
pub fn save_snapshot(bridge: &Arc<Bridge>, path: &Path) -> Result<(), SnapshotError> {
    let snapshot = bridge.export_state();
    let raw = serde_json::to_string_pretty(&snapshot).map_err(|source| SnapshotError::Serde {
        path: path.display().to_string(),
        source,
    })?;
    std::fs::write(path, raw).map_err(|source| SnapshotError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Reads a previously-saved snapshot from `path` and applies it to
/// `bridge` via `import_state`.
pub fn load_snapshot(bridge: &Arc<Bridge>, path: &Path) -> Result<(), SnapshotError> {
    let raw = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let snapshot: BridgeSnapshot =
        serde_json::from_str(&raw).map_err(|source| SnapshotError::Serde {
            path: path.display().to_string(),
            source,
        })?;
    bridge.import_state(snapshot);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_domain::Value;

    #[test]
    fn round_trips_bridge_state_through_a_file() {
        let bridge = Bridge::new();
        bridge.set("greeting", Value::String("hi".to_string()), "test", None);

        let dir = std::env::temp_dir().join(format!("synapse-snapshot-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("snapshot.json");

        save_snapshot(&bridge, &path).unwrap();

        let restored = Bridge::new();
        load_snapshot(&restored, &path).unwrap();
        assert_eq!(
            restored.get("greeting", None),
            Some(Value::String("hi".to_string()))
        );

        std::fs::remove_dir_all(&dir).ok();
    }
}
