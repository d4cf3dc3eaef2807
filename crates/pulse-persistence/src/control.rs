//! Runtime control files (spec §6 "Runtime control files"): a pause-file
//! whose mere existence pauses the main loop, a speed-file holding a
//! numeric inter-step delay, and a stop-file requesting termination.
//! These are polled from disk rather than held in memory so an external
//! supervisor can drive a running engine without touching the bridge.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Optional on-disk paths an external supervisor can use to steer a
/// running engine. Any field left `None` disables that control.
#[derive(Debug, Clone, Default)]
pub struct ControlFiles {
    pub pause_file: Option<PathBuf>,
    pub speed_file: Option<PathBuf>,
    pub stop_file: Option<PathBuf>,
}

impl ControlFiles {
    pub fn new(
        pause_file: Option<impl AsRef<Path>>,
        speed_file: Option<impl AsRef<Path>>,
        stop_file: Option<impl AsRef<Path>>,
    ) -> Self {
        ControlFiles {
            pause_file: pause_file.map(|p| p.as_ref().to_path_buf()),
            speed_file: speed_file.map(|p| p.as_ref().to_path_buf()),
            stop_file: stop_file.map(|p| p.as_ref().to_path_buf()),
        }
    }

    pub fn is_paused(&self) -> bool {
        self.pause_file.as_ref().is_some_and(|p| p.exists())
    }

    pub fn is_stopped(&self) -> bool {
        self.stop_file.as_ref().is_some_and(|p| p.exists())
    }

    /// Reads the inter-step delay from the speed-file, falling back to
    /// `default` when the file is absent, empty, or unparsable (spec §6:
    /// "a numeric text value ... sets the inter-step delay in seconds").
    pub fn step_delay(&self, default: Duration) -> Duration {
        let Some(path) = &self.speed_file else {
            return default;
        };
        match std::fs::read_to_string(path) {
            Ok(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v >= 0.0)
                .map(Duration::from_secs_f64)
                .unwrap_or(default),
            Err(_) => default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn unset_controls_report_running_unpaused() {
        let controls = ControlFiles::default();
        assert!(!controls.is_paused());
        assert!(!controls.is_stopped());
        assert_eq!(controls.step_delay(Duration::from_millis(50)), Duration::from_millis(50));
    }

    #[test]
    fn pause_and_stop_reflect_file_existence() {
        let dir = std::env::temp_dir().join(format!("synapse-control-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let pause = dir.join("pause");
        let stop = dir.join("stop");
        std::fs::write(&pause, "").unwrap();

        let controls = ControlFiles::new(Some(&pause), None::<&Path>, Some(&stop));
        assert!(controls.is_paused());
        assert!(!controls.is_stopped());

        std::fs::write(&stop, "").unwrap();
        assert!(controls.is_stopped());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn speed_file_parses_numeric_seconds() {
        let dir = std::env::temp_dir().join(format!("synapse-speed-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let speed = dir.join("speed");
        let mut f = std::fs::File::create(&speed).unwrap();
        write!(f, "0.25").unwrap();

        let controls = ControlFiles::new(None::<&Path>, Some(&speed), None::<&Path>);
        assert_eq!(controls.step_delay(Duration::from_millis(10)), Duration::from_millis(250));

        std::fs::remove_dir_all(&dir).ok();
    }
}
