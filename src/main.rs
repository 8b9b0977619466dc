//! StreamPlot - Main Entry Point
//!
//! Listens for an instrument on the configured TCP port and plots the
//! samples it sends.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use streamplot::{
    config::{AppConfig, Background, LoggingConfig},
    fit::UnavailableFitEngine,
    frontend::StreamPlotApp,
    ingest::{IngestSession, TcpLineListener},
    worker::WorkerPool,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info,streamplot=debug";

#[derive(Parser, Debug)]
#[command(name = "streamplot", version)]
#[command(about = "Live plotter for measurement samples streamed over TCP", long_about = None)]
struct Cli {
    /// Configuration file (default: streamplot.toml in the platform config directory)
    config: Option<PathBuf>,
}

fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(config.filter.as_deref().unwrap_or(DEFAULT_FILTER))
    });

    let (file_layer, guard) = match &config.file_directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "streamplot.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    guard
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let path = AppConfig::locate(cli.config.as_deref());

    // Logging settings live in the config, so problems are reported after init
    let loaded = path.as_ref().map(AppConfig::load);
    let config = match &loaded {
        Some(Ok(config)) => config.clone(),
        _ => AppConfig::default(),
    };
    let _log_guard = init_logging(&config.logging);

    match (&path, &loaded) {
        (Some(path), Some(Ok(_))) => tracing::info!("Loaded configuration from {:?}", path),
        (_, Some(Err(e))) => tracing::warn!("Failed to load config, using defaults: {}", e),
        _ => tracing::info!("No configuration file found, using defaults"),
    }

    tracing::info!("Starting StreamPlot");

    let pool = WorkerPool::new(config.workers.max_threads)?;
    let listener = TcpLineListener::new(&config.listener);
    let ingest = match IngestSession::start(&pool, listener) {
        Ok(ingest) => ingest,
        Err(e) => {
            tracing::error!("Cannot start the instrument listener: {}", e);
            anyhow::bail!("cannot start the instrument listener: {}", e);
        }
    };

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.plot.window_width, config.plot.window_height])
            .with_min_inner_size([480.0, 360.0])
            .with_title("StreamPlot"),
        ..Default::default()
    };

    let background = config.plot.background;
    let result = eframe::run_native(
        "StreamPlot",
        native_options,
        Box::new(move |cc| {
            match background {
                Background::White => cc.egui_ctx.set_visuals(egui::Visuals::light()),
                Background::Dark => cc.egui_ctx.set_visuals(egui::Visuals::dark()),
            }
            Ok(Box::new(StreamPlotApp::new(
                config,
                pool,
                ingest,
                Arc::new(UnavailableFitEngine),
            )))
        }),
    );

    tracing::info!("Shutting down...");
    result.map_err(|e| anyhow::anyhow!("GUI error: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{error::ErrorKind, CommandFactory};

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_config_path_is_optional() {
        let cli = Cli::try_parse_from(["streamplot"]).unwrap();
        assert!(cli.config.is_none());

        let cli = Cli::try_parse_from(["streamplot", "lab.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("lab.toml")));
    }

    #[test]
    fn test_help_and_unknown_flags_are_not_config_paths() {
        let err = Cli::try_parse_from(["streamplot", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);

        let err = Cli::try_parse_from(["streamplot", "--version"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayVersion);

        let err = Cli::try_parse_from(["streamplot", "--confg", "lab.toml"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }
}
