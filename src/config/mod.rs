//! Configuration module for StreamPlot
//!
//! Configuration is a single TOML file. Lookup order:
//!
//! 1. A path given explicitly (the binary's first argument)
//! 2. `streamplot.toml` in the platform config directory:
//!    - **Linux**: `~/.config/streamplot/`
//!    - **macOS**: `~/Library/Application Support/streamplot/`
//!    - **Windows**: `%APPDATA%\streamplot\`
//! 3. Built-in defaults
//!
//! # Example
//!
//! ```toml
//! [listener]
//! host = "0.0.0.0"
//! port = 5757
//!
//! [workers]
//! max_threads = 5
//!
//! [plot]
//! background = "dark"
//! show_error_bars = true
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{Result, StreamPlotError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "streamplot";

/// Config filename
pub const CONFIG_FILE: &str = "streamplot.toml";

/// Get the application config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Get the path to the default config file
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join(CONFIG_FILE))
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub listener: ListenerConfig,

    #[serde(default)]
    pub workers: WorkerConfig,

    #[serde(default)]
    pub plot: PlotConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

impl AppConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| StreamPlotError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            StreamPlotError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        Self::from_toml(&content)
    }

    /// Config file to use: the explicit path, else the default file if present
    pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => default_config_path().filter(|path| path.exists()),
        }
    }

    /// Resolve and load the configuration, falling back to defaults
    ///
    /// A missing default file is not an error. A file that fails to read,
    /// parse or validate is logged and replaced by defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> Self {
        let Some(path) = Self::locate(explicit) else {
            return Self::default();
        };

        match Self::load(&path) {
            Ok(config) => {
                tracing::info!("Loaded configuration from {:?}", path);
                config
            }
            Err(e) => {
                tracing::warn!("Failed to load config, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Save config as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StreamPlotError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| StreamPlotError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            StreamPlotError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// Reject settings the runtime cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.workers.max_threads < 2 {
            return Err(StreamPlotError::Config(format!(
                "workers.max_threads must be at least 2 (one is reserved for the listener), got {}",
                self.workers.max_threads
            )));
        }
        if self.listener.port == 0 {
            return Err(StreamPlotError::Config(
                "listener.port must not be 0".to_string(),
            ));
        }
        if self.listener.host.trim().is_empty() {
            return Err(StreamPlotError::Config(
                "listener.host must not be empty".to_string(),
            ));
        }
        if self.listener.max_line_bytes == 0 {
            return Err(StreamPlotError::Config(
                "listener.max_line_bytes must be at least 1".to_string(),
            ));
        }
        if self.diagnostics.capacity == 0 {
            return Err(StreamPlotError::Config(
                "diagnostics.capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
