//! Frontend module for StreamPlot
//!
//! [`StreamPlotApp`] is the consumer context. Every frame it drains the
//! lines handed off by the listener, dispatches them in arrival order on
//! the GUI thread, polls background task events, and redraws the plot.
//!
//! # Module Organization
//!
//! - [`plot`] - egui_plot renderer for curve data
//! - [`status_bar`] - Listener state and diagnostics

pub mod plot;
pub mod status_bar;

pub use plot::PlotScene;

use crate::config::AppConfig;
use crate::dispatch::Dispatcher;
use crate::fit::{prepare_fit, submit_fit, FitEngine, FitFunction, FitResult, PrefitRegistry};
use crate::ingest::IngestSession;
use crate::session::{PlotSession, Severity};
use crate::worker::{TaskEvent, TaskHandle, WorkerPool};
use egui::Color32;
use serde_json::Value;
use status_bar::{render_status_bar, StatusBarContext};
use std::sync::Arc;
use std::time::Duration;

/// Main application state
pub struct StreamPlotApp {
    config: AppConfig,
    pool: Option<WorkerPool>,
    ingest: Option<IngestSession>,
    dispatcher: Dispatcher,
    session: PlotSession<PlotScene>,
    fit_engine: Arc<dyn FitEngine>,
    fit_function: FitFunction,
    fit_curve: Option<usize>,
    fit_tasks: Vec<TaskHandle<FitResult>>,
    last_fit: Option<FitResult>,
    prefits: PrefitRegistry,
    prefit_window: Option<usize>,
    listener_failure_reported: bool,
}

impl StreamPlotApp {
    /// Create the application around an already running ingest session
    pub fn new(
        config: AppConfig,
        pool: WorkerPool,
        ingest: IngestSession,
        fit_engine: Arc<dyn FitEngine>,
    ) -> Self {
        let scene = PlotScene::new(config.plot.clone());
        let session = PlotSession::new(scene, config.diagnostics.capacity);

        Self {
            config,
            pool: Some(pool),
            ingest: Some(ingest),
            dispatcher: Dispatcher::new(),
            session,
            fit_engine,
            fit_function: FitFunction::None,
            fit_curve: None,
            fit_tasks: Vec::new(),
            last_fit: None,
            prefits: PrefitRegistry::new(),
            prefit_window: None,
            listener_failure_reported: false,
        }
    }

    pub fn session(&self) -> &PlotSession<PlotScene> {
        &self.session
    }

    /// Dispatch every handed-off line and fold task events
    ///
    /// Returns the number of lines processed.
    pub fn pump(&mut self) -> usize {
        let lines = self
            .ingest
            .as_ref()
            .map(IngestSession::drain_lines)
            .unwrap_or_default();

        for line in &lines {
            self.dispatcher.dispatch(line, &mut self.session);
        }

        self.poll_listener();
        self.poll_fits();
        lines.len()
    }

    fn poll_listener(&mut self) {
        let Some(ingest) = self.ingest.as_mut() else {
            return;
        };
        if let Err(e) = ingest.check() {
            if !self.listener_failure_reported {
                self.session.report(Severity::Error, e.to_string());
                self.listener_failure_reported = true;
            }
        }
    }

    fn poll_fits(&mut self) {
        for handle in &mut self.fit_tasks {
            for event in handle.drain() {
                match event {
                    TaskEvent::Result(result) => {
                        if result.success {
                            tracing::info!(
                                task = handle.name(),
                                parameters = ?result.parameters,
                                "Fit succeeded"
                            );
                            let message = format!("Fit succeeded: {}", result.message);
                            self.session.report(Severity::Info, message);
                        } else {
                            tracing::warn!(
                                task = handle.name(),
                                "Fit not successful: {}",
                                result.message
                            );
                            let message = format!("Fit failed: {}", result.message);
                            self.session.report(Severity::Warning, message);
                        }
                        self.last_fit = Some(result);
                    }
                    TaskEvent::Error(failure) => {
                        self.session.report(Severity::Error, failure.to_string());
                    }
                    TaskEvent::Finished => {}
                }
            }
        }
        self.fit_tasks.retain(|handle| !handle.is_finished());
    }

    fn do_fit(&mut self) {
        let input = match prepare_fit(self.session.store(), self.fit_curve, self.fit_function) {
            Ok(input) => input,
            Err(e) => {
                tracing::warn!("Not fitting: {}", e);
                self.session.report(Severity::Warning, e.to_string());
                return;
            }
        };

        let Some(pool) = self.pool.as_ref() else {
            self.session.report(Severity::Error, "Worker pool is shut down");
            return;
        };
        match submit_fit(pool, Arc::clone(&self.fit_engine), input) {
            Ok(handle) => self.fit_tasks.push(handle),
            Err(e) => self.session.report(Severity::Error, e.to_string()),
        }
    }

    fn open_prefit(&mut self) {
        match prepare_fit(self.session.store(), self.fit_curve, self.fit_function) {
            Ok(input) => {
                let curve = input.curve;
                self.prefits.open(input);
                self.prefit_window = Some(curve);
            }
            Err(e) => {
                tracing::warn!("Not opening prefit: {}", e);
                self.session.report(Severity::Warning, e.to_string());
            }
        }
    }

    fn clear_data(&mut self) {
        if let Err(e) = self.session.clear_data(&Value::String("all".to_string())) {
            self.session.report(Severity::Warning, e.to_string());
        }
        self.fit_curve = None;
        self.prefits.clear();
        self.prefit_window = None;
    }

    fn render_controls(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("Clear plot").clicked() {
                self.session.clear_plot();
            }
            if ui.button("Clear data").clicked() {
                self.clear_data();
            }

            ui.separator();

            egui::ComboBox::from_label("Fit function")
                .selected_text(self.fit_function.name())
                .show_ui(ui, |ui| {
                    for function in FitFunction::ALL {
                        ui.selectable_value(&mut self.fit_function, function, function.name());
                    }
                });

            let curve_text = self
                .fit_curve
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string());
            let registered = self.session.registered_curves().to_vec();
            egui::ComboBox::from_label("Curve")
                .selected_text(curve_text)
                .show_ui(ui, |ui| {
                    for curve in registered {
                        ui.selectable_value(&mut self.fit_curve, Some(curve), curve.to_string());
                    }
                });

            if ui.button("Reg. cv.").clicked() {
                let registered = self.session.register_curves().to_vec();
                if self.fit_curve.is_some_and(|c| !registered.contains(&c)) {
                    self.fit_curve = None;
                }
            }
            if ui.button("Do fit").clicked() {
                self.do_fit();
            }
            if ui.button("Prefit").clicked() {
                self.open_prefit();
            }
            if let Some(fit) = &self.last_fit {
                let color = if fit.success { Color32::GREEN } else { Color32::GRAY };
                let text = if fit.parameters.is_empty() {
                    fit.message.clone()
                } else {
                    fit.parameters
                        .iter()
                        .map(|(name, value)| format!("{} = {:.4}", name, value))
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                ui.colored_label(color, text);
            }

            ui.separator();

            let plot = self.session.renderer_mut().config_mut();
            ui.checkbox(&mut plot.show_grid, "Grid");
            ui.checkbox(&mut plot.show_legend, "Legend");
            ui.checkbox(&mut plot.show_error_bars, "Error bars");
        });
    }

    fn render_prefit_window(&mut self, ctx: &egui::Context) {
        let Some(curve) = self.prefit_window else {
            return;
        };
        let mut open = true;
        let prefits = &mut self.prefits;

        egui::Window::new(format!("Prefit curve {}", curve))
            .open(&mut open)
            .resizable(false)
            .show(ctx, |ui| match prefits.get_mut(curve) {
                Some(model) => {
                    ui.label(format!("Function: {}", model.function));
                    ui.label(format!("Points: {}", model.input.x.len()));
                    egui::Grid::new("prefit_parameters").show(ui, |ui| {
                        for (name, value) in &mut model.parameters {
                            ui.label(name.as_str());
                            ui.add(egui::DragValue::new(value).speed(0.01));
                            ui.end_row();
                        }
                    });
                }
                None => {
                    ui.colored_label(Color32::YELLOW, "No prefit model for this curve");
                }
            });

        if !open {
            self.prefit_window = None;
        }
    }

    /// Stop the listener and wait a bounded time for workers
    pub fn shutdown(&mut self) {
        let timeout = Duration::from_millis(self.config.workers.shutdown_timeout_ms);
        if let Some(mut ingest) = self.ingest.take() {
            ingest.shutdown_and_wait(timeout);
        }
        if let Some(pool) = self.pool.take() {
            if !pool.shutdown(timeout) {
                tracing::warn!("Some background tasks were still running at exit");
            }
        }
    }
}

impl eframe::App for StreamPlotApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let processed = self.pump();

        if processed > 0 || !self.fit_tasks.is_empty() {
            ctx.request_repaint();
        } else {
            // Keep polling the hand-off while idle
            ctx.request_repaint_after(Duration::from_millis(self.config.listener.poll_interval_ms));
        }

        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            self.render_controls(ui);
        });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            let address = format!("{}:{}", self.config.listener.host, self.config.listener.port);
            let status_ctx = StatusBarContext {
                listener: self.ingest.as_ref().map(IngestSession::status),
                address: &address,
                curves: self.session.store().curve_count(),
                samples: self.session.store().samples_ingested(),
                pending_fits: self.fit_tasks.len(),
                latest: self.session.diagnostics().latest(),
            };
            render_status_bar(ui, &status_ctx);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.session.renderer().render(ui);
        });

        self.render_prefit_window(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.shutdown();
    }
}
