//! TOML configuration for the fleet controller.
//!
//! The file lives in the platform config directory unless a path is given
//! explicitly (`--config` / `MDC_CONFIG`):
//! - Windows:  `%APPDATA%\MdcFleet\config.toml`
//! - Linux:    `$XDG_CONFIG_HOME/mdc-fleet/config.toml` (or `~/.config/...`)
//! - macOS:    `~/Library/Application Support/MdcFleet/config.toml`
//!
//! ```toml
//! [controller]
//! log_level = "info"
//!
//! [network]
//! port = 1515
//! response_timeout_secs = 5
//!
//! [monitor]
//! interval_secs = 30
//! temperature_critical = 80
//!
//! [[displays]]
//! id = 1
//! host = "192.168.1.101"
//! name = "Lobby left"
//!
//! [video_wall]
//! default_layout = "2x2"
//! ```
//!
//! Every field has a default, so a missing file, a missing section, or a
//! missing key all fall back to the values below.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mdc_core::DisplayId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::alerts::AlertThresholds;
use crate::infrastructure::network::session::{SessionConfig, DEFAULT_MDC_PORT};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Two `[[displays]]` entries share an id.
    #[error("display id {0} is configured more than once")]
    DuplicateDisplay(DisplayId),

    /// A numeric setting is outside the range the controller can use.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: &'static str,
    },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub displays: Vec<DisplayEntry>,
    #[serde(default)]
    pub video_wall: VideoWallConfig,
}

/// General process settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControllerConfig {
    /// `tracing` level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Transport settings shared by every display session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// MDC TCP port used when a display entry has none.
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_response_timeout")]
    pub response_timeout_secs: u64,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

/// Monitoring cadence and alert thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorConfig {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    /// °C.
    #[serde(default = "default_temperature_warning")]
    pub temperature_warning: u8,
    /// °C.
    #[serde(default = "default_temperature_critical")]
    pub temperature_critical: u8,
    /// Maximum age of the last response before a warning.
    #[serde(default = "default_alert_response_timeout")]
    pub response_timeout_secs: u64,
    #[serde(default = "default_error_count_warning")]
    pub error_count_warning: u32,
}

/// One managed display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplayEntry {
    /// MDC display id, also the key used by layouts.
    pub id: DisplayId,
    pub host: String,
    /// Overrides `network.port`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Video wall settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VideoWallConfig {
    /// Layout applied by `wall` when none is given, e.g. `"2x2"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_layout: Option<String>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_port() -> u16 {
    DEFAULT_MDC_PORT
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_response_timeout() -> u64 {
    5
}
fn default_retry_delay() -> u64 {
    1
}
fn default_max_retries() -> u32 {
    3
}
fn default_interval() -> u64 {
    30
}
fn default_temperature_warning() -> u8 {
    70
}
fn default_temperature_critical() -> u8 {
    80
}
fn default_alert_response_timeout() -> u64 {
    10
}
fn default_error_count_warning() -> u32 {
    3
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            connect_timeout_secs: default_connect_timeout(),
            response_timeout_secs: default_response_timeout(),
            retry_delay_secs: default_retry_delay(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            temperature_warning: default_temperature_warning(),
            temperature_critical: default_temperature_critical(),
            response_timeout_secs: default_alert_response_timeout(),
            error_count_warning: default_error_count_warning(),
        }
    }
}

// ── Conversions ───────────────────────────────────────────────────────────────

impl NetworkConfig {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            response_timeout: Duration::from_secs(self.response_timeout_secs),
            retry_delay: Duration::from_secs(self.retry_delay_secs),
            max_retries: self.max_retries,
        }
    }
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn thresholds(&self) -> AlertThresholds {
        AlertThresholds {
            temperature_warning: self.temperature_warning,
            temperature_critical: self.temperature_critical,
            response_timeout: Duration::from_secs(self.response_timeout_secs),
            error_count_warning: self.error_count_warning,
        }
    }
}

impl AppConfig {
    /// Port for `entry`, falling back to `network.port`.
    pub fn port_for(&self, entry: &DisplayEntry) -> u16 {
        entry.port.unwrap_or(self.network.port)
    }

    /// Rejects configurations that cannot be driven unambiguously.
    ///
    /// # Errors
    ///
    /// [`ConfigError::DuplicateDisplay`] if two entries share an id, and
    /// [`ConfigError::InvalidValue`] if `network.max_retries` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.max_retries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "network.max_retries",
                reason: "at least one attempt is required",
            });
        }
        let mut seen = HashSet::new();
        for entry in &self.displays {
            if !seen.insert(entry.id) {
                return Err(ConfigError::DuplicateDisplay(entry.id));
            }
        }
        Ok(())
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from the default location.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the
/// file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// [`ConfigError::Parse`] if the TOML is malformed, and
/// [`ConfigError::DuplicateDisplay`] or [`ConfigError::InvalidValue`] if the
/// content fails validation.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let cfg: AppConfig = toml::from_str(&content)?;
            cfg.validate()?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config directory including the `MdcFleet` component.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("MdcFleet"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("mdc-fleet"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("MdcFleet")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
