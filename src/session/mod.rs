//! Consumer-side plot session
//!
//! [`PlotSession`] is the single owner of the curve store and the renderer.
//! Every handler the dispatcher can reach is a method here, so mutation of
//! curve data is confined to whichever context owns the session.
//!
//! # Render publishing
//!
//! After each accepted sample the session pushes a sorted snapshot of every
//! active curve to the renderer. Render items are created for all curves on
//! the first sample of a session, and again on the first sample after
//! [`PlotSession::clear_plot`], which drops the items but keeps the data.

pub mod diagnostics;
pub mod renderer;

pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use renderer::Renderer;

use crate::curves::{CurveStore, IngestOutcome};
use crate::error::{Result, StreamPlotError};
use crate::types::{CurveStyle, Sample};
use serde_json::Value;

/// Which data a `clear_data` command addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearTarget {
    All,
    Curve(usize),
}

impl ClearTarget {
    /// Accepts `"all"`, a non-negative integer, or an integer in a string
    pub fn from_value(value: &Value) -> Result<Self> {
        let invalid = || {
            StreamPlotError::InvalidCurveSelection(format!(
                "expected \"all\" or a curve index, got {}",
                value
            ))
        };

        match value {
            Value::String(s) if s.trim().eq_ignore_ascii_case("all") => Ok(ClearTarget::All),
            Value::String(s) => s.trim().parse().map(ClearTarget::Curve).map_err(|_| invalid()),
            Value::Number(n) => {
                if let Some(index) = n.as_u64() {
                    return usize::try_from(index).map(ClearTarget::Curve).map_err(|_| invalid());
                }
                match n.as_f64() {
                    Some(f) if f >= 0.0 && f.fract() == 0.0 => Ok(ClearTarget::Curve(f as usize)),
                    _ => Err(invalid()),
                }
            }
            _ => Err(invalid()),
        }
    }
}

/// Curve data, renderer and user-facing state of the plot window
pub struct PlotSession<R: Renderer = Box<dyn Renderer>> {
    store: CurveStore,
    renderer: R,
    plots_cleared: bool,
    registered_curves: Vec<usize>,
    diagnostics: Diagnostics,
}

impl<R: Renderer> PlotSession<R> {
    pub fn new(renderer: R, diagnostics_capacity: usize) -> Self {
        Self {
            store: CurveStore::new(),
            renderer,
            plots_cleared: false,
            registered_curves: Vec::new(),
            diagnostics: Diagnostics::new(diagnostics_capacity),
        }
    }

    // Handlers

    /// `generate_plot_pointbypoint`: ingest one sample tuple and republish
    pub fn ingest_point(&mut self, argument: &Value) -> Result<()> {
        let sample = Sample::from_value(argument)?;
        let outcome = self.store.ingest(&sample)?;

        if let IngestOutcome::SessionStarted { arity } = outcome {
            tracing::debug!(arity, "New plot session");
            self.create_render_items();
        } else if self.plots_cleared {
            self.create_render_items();
        }

        self.publish()
    }

    /// `clear_plot`: drop render items, keep data
    pub fn clear_plot(&mut self) {
        self.renderer.clear_all();
        self.plots_cleared = true;
    }

    /// `clear_data`: drop everything, or retire one curve
    pub fn clear_data(&mut self, argument: &Value) -> Result<()> {
        match ClearTarget::from_value(argument)? {
            ClearTarget::All => {
                self.store.clear_all();
                self.renderer.clear_all();
                self.registered_curves.clear();
                // The next sample starts a new session and recreates items
                self.plots_cleared = false;
                tracing::info!("Cleared all curve data");
            }
            ClearTarget::Curve(index) => {
                self.store.clear_curve(index)?;
                self.renderer.remove_curve(index);
                self.registered_curves.retain(|&registered| registered != index);
                tracing::info!(curve = index, "Cleared curve");
            }
        }
        Ok(())
    }

    /// `set_axis_labels`: `[bottom, left]`
    pub fn set_axis_labels(&mut self, argument: &Value) -> Result<()> {
        let labels = argument
            .as_array()
            .filter(|labels| labels.len() == 2)
            .ok_or_else(|| {
                StreamPlotError::Decode(format!(
                    "axis labels must be [bottom, left], got {}",
                    argument
                ))
            })?;
        self.renderer
            .set_axis_labels(&label_text(&labels[0]), &label_text(&labels[1]));
        Ok(())
    }

    /// `set_plot_title`
    pub fn set_plot_title(&mut self, argument: &Value) {
        self.renderer.set_title(&label_text(argument));
    }

    /// `showdata`
    pub fn show_data(&mut self, argument: &Value) {
        tracing::info!("Instrument data: {}", argument);
    }

    /// `register_available_curves`: refresh the curves offered for fitting
    pub fn register_curves(&mut self) -> &[usize] {
        self.registered_curves = self.store.active_indices().collect();
        tracing::debug!(curves = ?self.registered_curves, "Registered curves");
        &self.registered_curves
    }

    // State

    /// Record a user-visible diagnostic
    pub fn report(&mut self, severity: Severity, message: impl Into<String>) {
        self.diagnostics.push(severity, message);
    }

    pub fn store(&self) -> &CurveStore {
        &self.store
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn plots_cleared(&self) -> bool {
        self.plots_cleared
    }

    pub fn registered_curves(&self) -> &[usize] {
        &self.registered_curves
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    fn create_render_items(&mut self) {
        let indices: Vec<usize> = self.store.active_indices().collect();
        for index in indices {
            self.renderer.create_curve(index, &CurveStyle::for_index(index));
        }
        self.plots_cleared = false;
    }

    fn publish(&mut self) -> Result<()> {
        let indices: Vec<usize> = self.store.active_indices().collect();
        for index in indices {
            let snapshot = self.store.snapshot_sorted(index)?;
            self.renderer.update_curve(index, &snapshot.x, &snapshot.y);
            if let Some(err) = &snapshot.err {
                self.renderer
                    .set_error_bars(index, &snapshot.x, &snapshot.y, err);
            }
        }
        Ok(())
    }
}

/// Strings are used as-is; anything else is shown as JSON
fn label_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
