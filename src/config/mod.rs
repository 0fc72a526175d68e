//! Configuration for recon-plot
//!
//! Settings are read from a TOML file. Every field has a default, so a
//! partial file (or no file at all) is valid.
//!
//! # Config Location
//!
//! Unless a path is given explicitly, the file is looked up in the
//! platform-appropriate config directory under `recon-plot`:
//!
//! - **Linux**: `~/.config/recon-plot/config.toml`
//! - **macOS**: `~/Library/Application Support/recon-plot/config.toml`
//! - **Windows**: `%APPDATA%\recon-plot\config.toml`
//!
//! # Example
//!
//! ```toml
//! [import]
//! progress_interval_ms = 250
//! default_smoothing_window = 10
//!
//! [container]
//! compression_level = 9
//! extension = "plot"
//!
//! [logging]
//! filter = "debug"
//! directory = "/var/log/recon-plot"
//! ```

use crate::error::{PlotError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier for config directories
pub const APP_ID: &str = "recon-plot";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Default minimum time between import progress events
pub const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 100;

/// Default tracing filter
pub const DEFAULT_LOG_FILTER: &str = "info,recon_plot=debug";

/// Get the default config file path
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID).join(CONFIG_FILE))
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub import: ImportConfig,

    #[serde(default)]
    pub container: ContainerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Text import settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Minimum time between progress events in milliseconds
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,

    /// Give imported channels distinct palette colors instead of black
    #[serde(default = "default_true")]
    pub assign_colors: bool,

    /// Smoothing window for descriptors that do not specify one
    #[serde(default = "default_smoothing_window")]
    pub default_smoothing_window: usize,
}

fn default_progress_interval_ms() -> u64 {
    DEFAULT_PROGRESS_INTERVAL_MS
}

fn default_true() -> bool {
    true
}

fn default_smoothing_window() -> usize {
    1
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            progress_interval_ms: DEFAULT_PROGRESS_INTERVAL_MS,
            assign_colors: true,
            default_smoothing_window: default_smoothing_window(),
        }
    }
}

impl ImportConfig {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}

/// Binary container settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// zlib level, 0 (store) to 9 (best)
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,

    /// Extension of native container files; other paths must be saved under a new name
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_compression_level() -> u32 {
    crate::codec::DEFAULT_COMPRESSION_LEVEL
}

fn default_extension() -> String {
    crate::model::FILE_EXTENSION.to_string()
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            compression_level: default_compression_level(),
            extension: default_extension(),
        }
    }
}

/// Logging settings for the command line front end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set
    #[serde(default = "default_log_filter")]
    pub filter: String,

    /// Also write daily rolling log files here
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            directory: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PlotError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        Self::from_toml(&content).map_err(|e| e.with_context(format!("{:?}", path)))
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| PlotError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load from the default location, returning defaults on any error
    pub fn load_or_default() -> Self {
        let Some(path) = default_config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save configuration as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                PlotError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| PlotError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            PlotError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }
}
