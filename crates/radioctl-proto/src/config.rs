use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::{Error, Result};
use super::platform::{self, RuntimePaths};
use super::probe::Budget;
use super::stations::Catalog;

/// Everything radioctl needs, built once at startup and passed by reference.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub ipc: IpcConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub menu: MenuConfig,
    #[serde(default)]
    pub volume: VolumeConfig,
    #[serde(default)]
    pub status_bar: StatusBarConfig,
    #[serde(default)]
    pub streams: Catalog,
    /// Derived from the temp root and user name, never read from disk.
    #[serde(skip)]
    pub paths: RuntimePaths,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "default_player_binary")]
    pub binary: String,
    /// Extra arguments; the IPC server argument is always appended.
    #[serde(default = "default_player_args")]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IpcConfig {
    /// Pause between writing a request and reading the reply.  mpv logs
    /// "Write error (Broken pipe)" when the client hangs up too early.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_read_buffer_bytes")]
    pub read_buffer_bytes: usize,
}

/// Try budgets for the Polling Probe, per call site.
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "default_probe_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_interactive_interval_ms")]
    pub interactive_interval_ms: u64,
    #[serde(default = "default_cli_tries")]
    pub cli_tries: u32,
    #[serde(default = "default_menu_tries")]
    pub menu_tries: u32,
    #[serde(default = "default_selector_tries")]
    pub selector_tries: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MenuConfig {
    /// Consecutive invalid inputs before an interactive loop gives up.
    #[serde(default = "default_max_errors")]
    pub max_errors: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VolumeConfig {
    #[serde(default = "default_volume_min")]
    pub min: i64,
    #[serde(default = "default_volume_max")]
    pub max: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusBarConfig {
    /// Program run after every title change; skipped when not on `PATH`.
    /// An empty string disables the hook.
    #[serde(default = "default_status_hook")]
    pub hook: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            binary: default_player_binary(),
            args: default_player_args(),
        }
    }
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            read_buffer_bytes: default_read_buffer_bytes(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_probe_interval_ms(),
            interactive_interval_ms: default_interactive_interval_ms(),
            cli_tries: default_cli_tries(),
            menu_tries: default_menu_tries(),
            selector_tries: default_selector_tries(),
        }
    }
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            max_errors: default_max_errors(),
        }
    }
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            min: default_volume_min(),
            max: default_volume_max(),
        }
    }
}

impl Default for StatusBarConfig {
    fn default() -> Self {
        Self {
            hook: default_status_hook(),
        }
    }
}

fn default_player_binary() -> String {
    "mpv".to_string()
}

fn default_player_args() -> Vec<String> {
    [
        "--no-config",
        "--msg-level=all=v",
        "--network-timeout=10",
        "--cache=no",
        "--cache-pause=no",
        "--keep-open=always",
        "--keep-open-pause=no",
        "--idle=yes",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_settle_delay_ms() -> u64 {
    100
}

fn default_read_timeout_ms() -> u64 {
    5000
}

fn default_read_buffer_bytes() -> usize {
    1024
}

fn default_probe_interval_ms() -> u64 {
    1000
}

fn default_interactive_interval_ms() -> u64 {
    500
}

fn default_cli_tries() -> u32 {
    10
}

fn default_menu_tries() -> u32 {
    5
}

fn default_selector_tries() -> u32 {
    1
}

fn default_max_errors() -> u32 {
    5
}

fn default_volume_min() -> i64 {
    0
}

fn default_volume_max() -> i64 {
    100
}

fn default_status_hook() -> String {
    "wmbarupdate".to_string()
}

impl IpcConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl ProbeConfig {
    /// Batch/CLI paths: slow and patient.
    pub fn cli(&self) -> Budget {
        Budget::new(self.cli_tries, Duration::from_millis(self.interval_ms))
    }

    pub fn menu(&self) -> Budget {
        Budget::new(
            self.menu_tries,
            Duration::from_millis(self.interactive_interval_ms),
        )
    }

    pub fn selector(&self) -> Budget {
        Budget::new(
            self.selector_tries,
            Duration::from_millis(self.interactive_interval_ms),
        )
    }
}

impl Config {
    /// Read the config file if there is one; otherwise use the defaults.
    /// Nothing is ever written back.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let source = explicit.map_or_else(Self::config_path, Path::to_path_buf);
        let mut config = if explicit.is_some() || source.exists() {
            Self::from_file(&source)?
        } else {
            Self::default()
        };
        config.paths = RuntimePaths::detect();
        config.validate(&source)?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| Error::fs("read config", path, e))?;
        Self::from_toml(&content).map_err(|reason| Error::Config {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }

    /// Same settings, runtime files rooted somewhere else.
    pub fn with_paths(mut self, paths: RuntimePaths) -> Self {
        self.paths = paths;
        self
    }

    /// `source` is only used to name the file in errors.
    fn validate(&self, source: &Path) -> Result<()> {
        let bad = |reason: &str| Error::Config {
            path: source.to_path_buf(),
            reason: reason.to_string(),
        };
        if self.volume.min > self.volume.max {
            return Err(bad("volume.min is greater than volume.max"));
        }
        if self.player.binary.trim().is_empty() {
            return Err(bad("player.binary is empty"));
        }
        if self.ipc.read_buffer_bytes == 0 {
            return Err(bad("ipc.read_buffer_bytes must be positive"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            player: PlayerConfig::default(),
            ipc: IpcConfig::default(),
            probe: ProbeConfig::default(),
            menu: MenuConfig::default(),
            volume: VolumeConfig::default(),
            status_bar: StatusBarConfig::default(),
            streams: Catalog::default(),
            paths: RuntimePaths::default(),
        }
    }
}
