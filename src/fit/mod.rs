//! Fit and prefit input preparation
//!
//! Fitting numerics live behind [`FitEngine`]. This module validates a fit
//! request against the curve store, copies a sorted snapshot of the chosen
//! curve, and hands that copy to the engine, optionally on a worker thread.

pub mod prefit;

pub use prefit::{PrefitModel, PrefitRegistry};

use crate::curves::CurveStore;
use crate::error::{Result, StreamPlotError};
use crate::worker::{TaskHandle, WorkerPool};
use std::fmt;
use std::sync::Arc;

/// Fit model offered in the fit chooser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FitFunction {
    #[default]
    None,
    Sinewave,
    DampedSine,
}

impl FitFunction {
    pub const ALL: [FitFunction; 3] = [
        FitFunction::None,
        FitFunction::Sinewave,
        FitFunction::DampedSine,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FitFunction::None => "None",
            FitFunction::Sinewave => "sinewave",
            FitFunction::DampedSine => "damped_sine",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Parameters the model is expressed in, in engine order
    pub fn parameter_names(&self) -> &'static [&'static str] {
        match self {
            FitFunction::None => &[],
            FitFunction::Sinewave => &["amplitude", "frequency", "phase", "offset"],
            FitFunction::DampedSine => &["amplitude", "frequency", "phase", "offset", "decay"],
        }
    }
}

impl fmt::Display for FitFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Owned copy of one curve, sorted by x, ready for a fit
#[derive(Debug, Clone, PartialEq)]
pub struct FitInput {
    pub curve: usize,
    pub function: FitFunction,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub err: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    pub success: bool,
    pub parameters: Vec<(String, f64)>,
    pub message: String,
}

impl FitResult {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            parameters: Vec::new(),
            message: message.into(),
        }
    }
}

/// Fitting backend
pub trait FitEngine: Send + Sync {
    fn fit(&self, input: &FitInput) -> anyhow::Result<FitResult>;
}

/// Engine used when no fitting backend is installed
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableFitEngine;

impl FitEngine for UnavailableFitEngine {
    fn fit(&self, input: &FitInput) -> anyhow::Result<FitResult> {
        Ok(FitResult::failed(format!(
            "No fit engine installed; cannot fit {} to curve {}",
            input.function, input.curve
        )))
    }
}

/// Validate a fit request and copy the curve it addresses
pub fn prepare_fit(
    store: &CurveStore,
    curve: Option<usize>,
    function: FitFunction,
) -> Result<FitInput> {
    if function == FitFunction::None {
        return Err(StreamPlotError::FitFunctionNotSelected);
    }

    let curve = curve.ok_or_else(|| {
        StreamPlotError::InvalidCurveSelection("no curve selected".to_string())
    })?;

    if !store.curve_exists(curve) {
        return Err(StreamPlotError::InvalidCurveSelection(format!(
            "curve {} does not exist or was cleared",
            curve
        )));
    }
    if store.curve_length(curve) == 0 {
        return Err(StreamPlotError::InvalidCurveSelection(format!(
            "curve {} has no data",
            curve
        )));
    }

    let snapshot = store.snapshot_sorted(curve)?;
    Ok(FitInput {
        curve,
        function,
        x: snapshot.x,
        y: snapshot.y,
        err: snapshot.err,
    })
}

/// Run a fit on the worker pool
pub fn submit_fit(
    pool: &WorkerPool,
    engine: Arc<dyn FitEngine>,
    input: FitInput,
) -> Result<TaskHandle<FitResult>> {
    let name = format!("fit {} curve {}", input.function, input.curve);
    tracing::debug!(task = %name, points = input.x.len(), "Submitting fit");
    pool.submit(name, move || engine.fit(&input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sample;
    use crate::worker::TaskEvent;
    use std::time::Duration;

    fn store_with_unsorted_points() -> CurveStore {
        let mut store = CurveStore::new();
        for (x, y, e) in [(2.0, 20.0, 0.2), (0.0, 0.0, 0.0), (1.0, 10.0, 0.1)] {
            store
                .ingest(&Sample::with_uncertainties(x, vec![y], vec![e]).unwrap())
                .unwrap();
        }
        store
    }

    #[test]
    fn test_fit_function_names() {
        assert_eq!(FitFunction::from_name("damped_sine"), Some(FitFunction::DampedSine));
        assert_eq!(FitFunction::from_name("None"), Some(FitFunction::None));
        assert_eq!(FitFunction::from_name("gaussian"), None);
    }

    #[test]
    fn test_prepare_fit_copies_sorted_errors() {
        let store = store_with_unsorted_points();
        let input = prepare_fit(&store, Some(0), FitFunction::Sinewave).unwrap();
        assert_eq!(input.x, vec![0.0, 1.0, 2.0]);
        assert_eq!(input.y, vec![0.0, 10.0, 20.0]);
        assert_eq!(input.err, Some(vec![0.0, 0.1, 0.2]));
    }

    #[test]
    fn test_prepare_fit_rejections() {
        let mut store = store_with_unsorted_points();
        assert!(matches!(
            prepare_fit(&store, Some(0), FitFunction::None),
            Err(StreamPlotError::FitFunctionNotSelected)
        ));
        assert!(matches!(
            prepare_fit(&store, None, FitFunction::Sinewave),
            Err(StreamPlotError::InvalidCurveSelection(_))
        ));
        assert!(matches!(
            prepare_fit(&store, Some(4), FitFunction::Sinewave),
            Err(StreamPlotError::InvalidCurveSelection(_))
        ));

        store.clear_curve(0).unwrap();
        assert!(matches!(
            prepare_fit(&store, Some(0), FitFunction::Sinewave),
            Err(StreamPlotError::InvalidCurveSelection(_))
        ));
    }

    #[test]
    fn test_unavailable_engine_reports_failure() {
        let pool = WorkerPool::new(2).unwrap();
        let store = store_with_unsorted_points();
        let input = prepare_fit(&store, Some(0), FitFunction::DampedSine).unwrap();

        let mut handle = submit_fit(&pool, Arc::new(UnavailableFitEngine), input).unwrap();
        match handle.wait_finished(Duration::from_secs(5)).first() {
            Some(TaskEvent::Result(result)) => {
                assert!(!result.success);
                assert!(result.message.contains("damped_sine"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
