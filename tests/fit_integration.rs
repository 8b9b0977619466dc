//! Fit requests from curve data through the worker pool

mod common;

use common::builders::SampleBuilder;
use common::mock_helpers::MockEngine;
use common::test_timeout;
use std::sync::Arc;
use streamplot::fit::{prepare_fit, submit_fit, FitFunction, FitResult, PrefitRegistry};
use streamplot::worker::{FailureKind, TaskEvent};
use streamplot::{CurveStore, StreamPlotError, WorkerPool};

fn store() -> CurveStore {
    let mut store = CurveStore::new();
    for (x, y, e) in [(3.0, 9.0, 0.3), (1.0, 1.0, 0.1), (2.0, 4.0, 0.2)] {
        store
            .ingest(&SampleBuilder::new(x).values(&[y, -y]).uncertainties(&[e, e]).build())
            .unwrap();
    }
    store
}

#[test]
fn test_engine_receives_sorted_copy() {
    let mut engine = MockEngine::new();
    engine
        .expect_fit()
        .withf(|input| {
            input.curve == 1
                && input.function == FitFunction::Sinewave
                && input.x == vec![1.0, 2.0, 3.0]
                && input.y == vec![-1.0, -4.0, -9.0]
                && input.err == Some(vec![0.1, 0.2, 0.3])
        })
        .times(1)
        .returning(|_| {
            Ok(FitResult {
                success: true,
                parameters: vec![("amplitude".to_string(), 4.5)],
                message: "converged".to_string(),
            })
        });

    let pool = WorkerPool::new(2).unwrap();
    let input = prepare_fit(&store(), Some(1), FitFunction::Sinewave).unwrap();
    let mut handle = submit_fit(&pool, Arc::new(engine), input).unwrap();

    let events = handle.wait_finished(test_timeout());
    match events.first() {
        Some(TaskEvent::Result(result)) => {
            assert!(result.success);
            common::assert_float_eq(result.parameters[0].1, 4.5, 1e-12);
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(events.last(), Some(&TaskEvent::Finished));
}

#[test]
fn test_engine_error_becomes_worker_failure() {
    let mut engine = MockEngine::new();
    engine
        .expect_fit()
        .returning(|_| Err(anyhow::anyhow!("singular matrix")));

    let pool = WorkerPool::new(2).unwrap();
    let input = prepare_fit(&store(), Some(0), FitFunction::DampedSine).unwrap();
    let mut handle = submit_fit(&pool, Arc::new(engine), input).unwrap();

    match handle.wait_finished(test_timeout()).first() {
        Some(TaskEvent::Error(failure)) => {
            assert_eq!(failure.kind, FailureKind::Error);
            assert!(failure.message.contains("singular matrix"));
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn test_invalid_requests_never_reach_engine() {
    let mut store = store();
    assert!(matches!(
        prepare_fit(&store, Some(0), FitFunction::None),
        Err(StreamPlotError::FitFunctionNotSelected)
    ));

    store.clear_curve(0).unwrap();
    assert!(matches!(
        prepare_fit(&store, Some(0), FitFunction::Sinewave),
        Err(StreamPlotError::InvalidCurveSelection(_))
    ));

    store.clear_all();
    assert!(matches!(
        prepare_fit(&store, Some(1), FitFunction::Sinewave),
        Err(StreamPlotError::InvalidCurveSelection(_))
    ));
}

#[test]
fn test_snapshot_is_isolated_from_later_ingest() {
    let mut store = store();
    let input = prepare_fit(&store, Some(0), FitFunction::Sinewave).unwrap();
    store
        .ingest(&SampleBuilder::new(0.0).values(&[0.0, 0.0]).uncertainties(&[0.0, 0.0]).build())
        .unwrap();

    assert_eq!(input.x.len(), 3);
    assert_eq!(store.curve_length(0), 4);
}

#[test]
fn test_prefit_follows_fit_function_changes() {
    let store = store();
    let mut registry = PrefitRegistry::new();

    let sine = prepare_fit(&store, Some(0), FitFunction::Sinewave).unwrap();
    registry.open(sine.clone()).set_parameter("phase", 0.25);
    assert!(registry
        .open(sine)
        .parameters
        .contains(&("phase".to_string(), 0.25)));

    let damped = prepare_fit(&store, Some(0), FitFunction::DampedSine).unwrap();
    let model = registry.open(damped);
    assert_eq!(model.function, FitFunction::DampedSine);
    assert!(model.parameters.iter().all(|(_, v)| *v == 0.0));
}
