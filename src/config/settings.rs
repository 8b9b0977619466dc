//! Configuration sections
//!
//! Each section deserializes independently with `#[serde(default)]`, so a
//! config file only needs to name the values it changes.
//!
//! # Main Types
//!
//! - [`ListenerConfig`] - Where the instrument connects and how often to poll
//! - [`WorkerConfig`] - Background worker pool sizing
//! - [`PlotConfig`] - Plot appearance
//! - [`LoggingConfig`] - Optional rolling log file
//! - [`DiagnosticsConfig`] - In-memory diagnostics shown in the status bar

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default listen host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default listen port
pub const DEFAULT_PORT: u16 = 5757;

/// Default line size limit (1 MiB)
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

/// TCP listener configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind
    pub host: String,

    /// Port to bind
    pub port: u16,

    /// Sleep between accept attempts while no instrument is connected
    pub poll_interval_ms: u64,

    /// Read timeout; bounds how long shutdown waits on a quiet connection
    pub read_timeout_ms: u64,

    /// Longest accepted line; longer lines are dropped
    pub max_line_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            poll_interval_ms: 50,
            read_timeout_ms: 100,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }
}

/// Worker pool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of worker threads; one is permanently held by the listener
    pub max_threads: usize,

    /// How long shutdown waits for workers to exit
    pub shutdown_timeout_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_threads: crate::worker::DEFAULT_MAX_THREADS,
            shutdown_timeout_ms: 2000,
        }
    }
}

/// Plot background colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Background {
    #[default]
    White,
    Dark,
}

/// Plot appearance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    pub background: Background,

    /// Show grid on plots
    pub show_grid: bool,

    /// Show legend on plots
    pub show_legend: bool,

    /// Plot line width in pixels
    pub line_width: f32,

    /// Radius of the per-point markers
    pub marker_radius: f32,

    /// Draw error bars for curves that carry uncertainties
    pub show_error_bars: bool,

    /// Initial window size
    pub window_width: f32,
    pub window_height: f32,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            background: Background::White,
            show_grid: true,
            show_legend: true,
            line_width: 1.5,
            marker_radius: 3.0,
            show_error_bars: true,
            window_width: 900.0,
            window_height: 700.0,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for a daily rolling log file; console only when unset
    pub file_directory: Option<PathBuf>,

    /// Filter used when `RUST_LOG` is not set
    pub filter: Option<String>,
}

/// In-memory diagnostics ring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Number of recent diagnostics kept for display
    pub capacity: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self { capacity: 64 }
    }
}
