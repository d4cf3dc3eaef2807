//! Central engine configuration. Env-var driven, with defaults matching
//! the constants spec §4.5/§4.6 name, loaded once into a global `Lazy`
//! the way the teacher's root `config.rs` loads `CONFIG`.

use once_cell::sync::Lazy;
use std::env;

/// Engine-level tunables overridable via environment variables.
pub struct EngineSettings {
    /// Thread count for the Native dispatch pool (spec §4.5: default 32).
    pub native_pool_size: usize,
    /// Worker count for the Heavy (blocking) dispatch pool (spec §4.5:
    /// default host parallelism).
    pub heavy_pool_size: usize,
    /// Sleep interval between idle scheduler ticks, in milliseconds
    /// (spec §4.6: default 10ms).
    pub step_idle_sleep_ms: u64,
    /// Poll interval for hot-reload file watching, in milliseconds
    /// (spec §6: default 2000ms).
    pub hot_reload_poll_ms: u64,
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Global, lazily-evaluated settings instance, read once per process.
pub static SETTINGS: Lazy<EngineSettings> = Lazy::new(|| EngineSettings {
    native_pool_size: env_usize("SYNAPSE_NATIVE_POOL_SIZE", 32),
    heavy_pool_size: env_usize(
        "SYNAPSE_HEAVY_POOL_SIZE",
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4),
    ),
    step_idle_sleep_ms: env_u64("SYNAPSE_STEP_IDLE_SLEEP_MS", 10),
    hot_reload_poll_ms: env_u64("SYNAPSE_HOT_RELOAD_POLL_MS", 2000),
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_usize_falls_back_to_default_when_unset() {
        assert_eq!(env_usize("SYNAPSE_TEST_DOES_NOT_EXIST", 7), 7);
    }

    #[test]
    fn settings_defaults_match_spec_constants() {
        assert_eq!(SETTINGS.step_idle_sleep_ms > 0, true);
        assert_eq!(SETTINGS.hot_reload_poll_ms, 2000);
    }
}
