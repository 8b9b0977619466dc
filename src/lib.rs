//! # StreamPlot: live measurement plotter
//!
//! StreamPlot receives measurement samples from an instrument over TCP and
//! plots them as they arrive. Each sample carries one independent value and
//! one dependent value per curve, optionally with uncertainties.
//!
//! ## Architecture
//!
//! - **Worker pool**: fixed set of background threads; one slot runs the
//!   blocking listen loop for the whole process lifetime
//! - **Ingest**: the listener pushes raw lines through a crossbeam channel
//! - **Dispatch**: the GUI thread decodes each line into commands and runs
//!   them in order against the plot session
//! - **Curves**: per-curve buffers owned exclusively by the GUI thread
//! - **Frontend**: eframe/egui with egui_plot for the plot itself
//!
//! ## Configuration
//!
//! Settings are read from `streamplot.toml`, either the path given as the
//! first argument or the file in the platform config directory:
//!
//! - **Linux**: `~/.config/streamplot/`
//! - **macOS**: `~/Library/Application Support/streamplot/`
//! - **Windows**: `%APPDATA%\streamplot\`
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use streamplot::{
//!     config::AppConfig,
//!     fit::UnavailableFitEngine,
//!     frontend::StreamPlotApp,
//!     ingest::{IngestSession, TcpLineListener},
//!     worker::WorkerPool,
//! };
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::load_or_default(None);
//!     let pool = WorkerPool::new(config.workers.max_threads)?;
//!     let ingest = IngestSession::start(&pool, TcpLineListener::new(&config.listener))?;
//!
//!     eframe::run_native(
//!         "StreamPlot",
//!         eframe::NativeOptions::default(),
//!         Box::new(|_cc| {
//!             Ok(Box::new(StreamPlotApp::new(
//!                 config,
//!                 pool,
//!                 ingest,
//!                 Arc::new(UnavailableFitEngine),
//!             )))
//!         }),
//!     )?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod curves;
pub mod dispatch;
pub mod error;
pub mod fit;
pub mod frontend;
pub mod ingest;
pub mod session;
pub mod types;
pub mod worker;

// Re-export commonly used types
pub use config::AppConfig;
pub use curves::{CurveSnapshot, CurveStore};
pub use dispatch::{Dispatcher, JsonMessageDecoder, MessageDecoder};
pub use error::{Result, StreamPlotError};
pub use frontend::StreamPlotApp;
pub use ingest::{IngestSession, Listener, TcpLineListener};
pub use session::{PlotSession, Renderer};
pub use types::{Sample, SampleSchema};
pub use worker::{WorkerFailure, WorkerPool};
