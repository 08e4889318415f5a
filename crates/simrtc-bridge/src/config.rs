//! Bridge configuration – reads/writes `~/.simrtc/config.toml`.

use serde::{Deserialize, Serialize};
use simrtc_queue::channels::DEFAULT_RESULT_TIMEOUT;
use simrtc_types::BridgeError;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tunables for the command/result rendezvous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// How long a service call waits for its result before giving up.
    #[serde(default = "default_result_timeout_ms")]
    pub result_timeout_ms: u64,

    /// Commands served per host tick.
    #[serde(default = "default_commands_per_tick")]
    pub commands_per_tick: usize,

    /// Silence after which the executor is reported as stalled.
    #[serde(default = "default_executor_stall_ms")]
    pub executor_stall_ms: u64,

    /// Tick rate of the `simrtc` shell's stub simulator.
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,
}

fn default_result_timeout_ms() -> u64 {
    u64::try_from(DEFAULT_RESULT_TIMEOUT.as_millis()).unwrap_or(u64::MAX)
}
fn default_commands_per_tick() -> usize {
    1
}
fn default_executor_stall_ms() -> u64 {
    2_000
}
fn default_tick_hz() -> u32 {
    20
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            result_timeout_ms: default_result_timeout_ms(),
            commands_per_tick: default_commands_per_tick(),
            executor_stall_ms: default_executor_stall_ms(),
            tick_hz: default_tick_hz(),
        }
    }
}

impl BridgeConfig {
    pub fn result_timeout(&self) -> Duration {
        Duration::from_millis(self.result_timeout_ms)
    }

    pub fn executor_stall(&self) -> Duration {
        Duration::from_millis(self.executor_stall_ms)
    }

    /// Period between host ticks; a zero rate is treated as 1 Hz.
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_hz.max(1)))
    }
}

/// Return the path to `~/.simrtc/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".simrtc").join("config.toml")
}

/// Load the config from disk and apply `SIMRTC_*` overrides.  Returns
/// `None` if the file does not exist.
pub fn load() -> Result<Option<BridgeConfig>, BridgeError> {
    let mut cfg = load_from(&config_path())?;
    if let Some(cfg) = cfg.as_mut() {
        apply_env_overrides(cfg);
    }
    Ok(cfg)
}

/// Load the config from a specific path, without environment overrides.
pub fn load_from(path: &Path) -> Result<Option<BridgeConfig>, BridgeError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        BridgeError::Config(format!("failed to read config at {}: {e}", path.display()))
    })?;
    let cfg: BridgeConfig =
        toml::from_str(&raw).map_err(|e| BridgeError::Config(format!("failed to parse config: {e}")))?;
    Ok(Some(cfg))
}

/// Load the config, falling back to defaults (plus overrides) when the file
/// is missing.
pub fn load_or_default() -> Result<BridgeConfig, BridgeError> {
    match load()? {
        Some(cfg) => Ok(cfg),
        None => {
            let mut cfg = BridgeConfig::default();
            apply_env_overrides(&mut cfg);
            Ok(cfg)
        }
    }
}

/// Apply `SIMRTC_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `SIMRTC_RESULT_TIMEOUT_MS` | `result_timeout_ms` |
/// | `SIMRTC_COMMANDS_PER_TICK` | `commands_per_tick` |
/// | `SIMRTC_EXECUTOR_STALL_MS` | `executor_stall_ms` |
/// | `SIMRTC_TICK_HZ` | `tick_hz` |
///
/// Unparseable values are ignored.
pub fn apply_env_overrides(cfg: &mut BridgeConfig) {
    if let Some(v) = env_parse("SIMRTC_RESULT_TIMEOUT_MS") {
        cfg.result_timeout_ms = v;
    }
    if let Some(v) = env_parse("SIMRTC_COMMANDS_PER_TICK") {
        cfg.commands_per_tick = v;
    }
    if let Some(v) = env_parse("SIMRTC_EXECUTOR_STALL_MS") {
        cfg.executor_stall_ms = v;
    }
    if let Some(v) = env_parse("SIMRTC_TICK_HZ") {
        cfg.tick_hz = v;
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok()?.trim().parse().ok()
}

/// Save the config to disk, creating `~/.simrtc/` if necessary.
pub fn save(cfg: &BridgeConfig) -> Result<(), BridgeError> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path.
pub fn save_to(cfg: &BridgeConfig, path: &Path) -> Result<(), BridgeError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| BridgeError::Config(format!("failed to create config directory: {e}")))?;
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| BridgeError::Config(format!("failed to serialize config: {e}")))?;
    fs::write(path, raw).map_err(|e| {
        BridgeError::Config(format!("failed to write config at {}: {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&BridgeConfig::default(), &path).expect("save");
        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.commands_per_tick, 1);
        assert_eq!(loaded.result_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn missing_fields_take_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "commands_per_tick = 4\n").unwrap();

        let loaded = load_from(&path).unwrap().unwrap();
        assert_eq!(loaded.commands_per_tick, 4);
        assert_eq!(loaded.executor_stall_ms, 2_000);
        assert_eq!(loaded.tick_hz, 20);
    }

    #[test]
    fn malformed_file_is_config_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "commands_per_tick = \"many\"\n").unwrap();
        assert!(matches!(load_from(&path), Err(BridgeError::Config(_))));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn config_path_points_to_simrtc_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".simrtc"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn tick_period_from_rate() {
        let cfg = BridgeConfig {
            tick_hz: 50,
            ..BridgeConfig::default()
        };
        assert_eq!(cfg.tick_period(), Duration::from_millis(20));
        let zero = BridgeConfig {
            tick_hz: 0,
            ..BridgeConfig::default()
        };
        assert_eq!(zero.tick_period(), Duration::from_secs(1));
    }

    #[test]
    fn apply_env_overrides_changes_and_ignores() {
        // SAFETY: the only test touching these variables.
        unsafe {
            std::env::set_var("SIMRTC_COMMANDS_PER_TICK", "3");
            std::env::set_var("SIMRTC_TICK_HZ", "fast");
        }
        let mut cfg = BridgeConfig::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.commands_per_tick, 3);
        assert_eq!(cfg.tick_hz, 20);
        unsafe {
            std::env::remove_var("SIMRTC_COMMANDS_PER_TICK");
            std::env::remove_var("SIMRTC_TICK_HZ");
        }
    }
}
