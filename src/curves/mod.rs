//! Curve buffer store
//!
//! [`CurveStore`] accumulates the samples of one session into per-curve
//! buffers. It is owned by the consumer context and is never shared across
//! threads; consumers outside that context only ever see [`CurveSnapshot`]
//! copies.
//!
//! # Session lifecycle
//!
//! ```text
//! Empty --ingest--> Populated --clear_all--> Empty
//!                     |    ^
//!                     +----+ ingest / snapshot_sorted / clear_curve
//! ```
//!
//! The first sample of a session fixes its [`SampleSchema`]: the number of
//! curves and whether each curve carries an error buffer. Later samples with
//! a different schema are rejected without touching any buffer.
//!
//! # Clearing a single curve
//!
//! Every curve owns its own x buffer. `clear_curve` empties that curve and
//! retires it: values addressed to a retired index are discarded until the
//! next `clear_all`, and the index stays reserved so the other curves keep
//! their numbering. Clearing the last active curve leaves the session
//! `Populated` with its schema intact.

mod curve;

pub use curve::{Curve, CurveSnapshot};

use crate::error::{Result, StreamPlotError};
use crate::types::{Sample, SampleSchema};

/// State of the current session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No sample since start or the last full clear
    Empty,
    /// Schema established, curves allocated
    Populated,
}

/// What an accepted sample did to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The sample opened a new session and allocated its curves
    SessionStarted { arity: usize },
    /// The sample was appended to an existing session
    Appended,
}

/// Per-curve buffers for the current session
#[derive(Debug, Default)]
pub struct CurveStore {
    schema: Option<SampleSchema>,
    /// Indexed by curve index; length equals the session arity
    curves: Vec<Curve>,
    curve_count: usize,
    samples_ingested: usize,
}

impl CurveStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one sample, opening a session if none is active
    pub fn ingest(&mut self, sample: &Sample) -> Result<IngestOutcome> {
        let found = sample.schema();
        if found.arity == 0 {
            return Err(StreamPlotError::InvalidSample(
                "sample has no dependent values".to_string(),
            ));
        }
        if let Some(errs) = &sample.uncertainties {
            if errs.len() != found.arity {
                return Err(StreamPlotError::InvalidSample(format!(
                    "{} dependent values but {} uncertainties",
                    found.arity,
                    errs.len()
                )));
            }
        }

        let outcome = match self.schema {
            None => {
                self.start_session(found);
                IngestOutcome::SessionStarted { arity: found.arity }
            }
            Some(expected) if expected != found => {
                return Err(StreamPlotError::SchemaMismatch { expected, found });
            }
            Some(_) => IngestOutcome::Appended,
        };

        for curve in self.curves.iter_mut().filter(|c| c.is_active()) {
            let i = curve.index();
            let err = sample.uncertainties.as_ref().map(|errs| errs[i]);
            curve.push(sample.independent_value, sample.dependent_values[i], err);
        }
        self.samples_ingested += 1;

        Ok(outcome)
    }

    fn start_session(&mut self, schema: SampleSchema) {
        tracing::debug!(
            arity = schema.arity,
            with_uncertainty = schema.with_uncertainty,
            "Starting new curve session"
        );
        self.curves = (0..schema.arity)
            .map(|i| Curve::new(i, schema.with_uncertainty))
            .collect();
        self.curve_count = schema.arity;
        self.schema = Some(schema);
        self.samples_ingested = 0;
    }

    /// Sorted copy of one curve's data
    ///
    /// A retired curve yields an empty snapshot; an index outside the session
    /// is an [`StreamPlotError::InvalidCurveSelection`].
    pub fn snapshot_sorted(&self, index: usize) -> Result<CurveSnapshot> {
        self.curves
            .get(index)
            .map(Curve::snapshot_sorted)
            .ok_or_else(|| self.missing_curve(index))
    }

    /// Empty one curve and retire its index for the rest of the session
    pub fn clear_curve(&mut self, index: usize) -> Result<()> {
        if index >= self.curves.len() {
            return Err(self.missing_curve(index));
        }
        let curve = &mut self.curves[index];
        if !curve.is_active() {
            tracing::debug!(curve = index, "Curve already cleared");
            return Ok(());
        }
        curve.clear();
        self.curve_count -= 1;
        tracing::debug!(curve = index, remaining = self.curve_count, "Cleared curve");
        Ok(())
    }

    /// Drop every buffer and return to the empty session state
    pub fn clear_all(&mut self) {
        self.schema = None;
        self.curves.clear();
        self.curve_count = 0;
        self.samples_ingested = 0;
    }

    /// True if the curve holds at least one point
    pub fn curve_exists(&self, index: usize) -> bool {
        self.curves
            .get(index)
            .is_some_and(|c| c.is_active() && !c.is_empty())
    }

    /// Number of points held by a curve, 0 for unknown or cleared curves
    pub fn curve_length(&self, index: usize) -> usize {
        self.curves.get(index).map_or(0, Curve::len)
    }

    /// Session arity, 0 before the first sample
    pub fn arity(&self) -> usize {
        self.schema.map_or(0, |s| s.arity)
    }

    /// Established schema, if a session is active
    pub fn schema(&self) -> Option<SampleSchema> {
        self.schema
    }

    /// Number of curves still active
    pub fn curve_count(&self) -> usize {
        self.curve_count
    }

    /// Samples accepted since the session started
    pub fn samples_ingested(&self) -> usize {
        self.samples_ingested
    }

    pub fn state(&self) -> SessionState {
        if self.schema.is_some() {
            SessionState::Populated
        } else {
            SessionState::Empty
        }
    }

    /// Read-only access to a curve
    pub fn curve(&self, index: usize) -> Option<&Curve> {
        self.curves.get(index)
    }

    /// Indices of curves still receiving samples
    pub fn active_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.curves
            .iter()
            .filter(|c| c.is_active())
            .map(Curve::index)
    }

    fn missing_curve(&self, index: usize) -> StreamPlotError {
        StreamPlotError::InvalidCurveSelection(format!(
            "curve {} does not exist (session has {} curves)",
            index,
            self.arity()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(samples: &[Sample]) -> CurveStore {
        let mut store = CurveStore::new();
        for sample in samples {
            store.ingest(sample).unwrap();
        }
        store
    }

    #[test]
    fn test_first_sample_fixes_arity() {
        let mut store = CurveStore::new();
        assert_eq!(store.state(), SessionState::Empty);
        assert_eq!(store.arity(), 0);

        let outcome = store.ingest(&Sample::new(0.0, vec![1.0, 2.0, 3.0])).unwrap();
        assert_eq!(outcome, IngestOutcome::SessionStarted { arity: 3 });
        assert_eq!(store.arity(), 3);
        assert_eq!(store.curve_count(), 3);
        assert_eq!(store.state(), SessionState::Populated);

        let outcome = store.ingest(&Sample::new(1.0, vec![1.0, 2.0, 3.0])).unwrap();
        assert_eq!(outcome, IngestOutcome::Appended);
        assert_eq!(store.arity(), 3);
    }

    #[test]
    fn test_sort_by_independent_value() {
        let store = store_with(&[
            Sample::new(1.0, vec![2.0]),
            Sample::new(2.0, vec![3.0]),
            Sample::new(0.0, vec![1.0]),
        ]);
        let snapshot = store.snapshot_sorted(0).unwrap();
        assert_eq!(snapshot.x, vec![0.0, 1.0, 2.0]);
        assert_eq!(snapshot.y, vec![1.0, 2.0, 3.0]);
        assert!(snapshot.err.is_none());
    }

    #[test]
    fn test_schema_mismatch_leaves_buffers_untouched() {
        let mut store = store_with(&[Sample::new(0.0, vec![1.0, 2.0, 3.0])]);

        let err = store.ingest(&Sample::new(1.0, vec![1.0, 2.0])).unwrap_err();
        match err {
            StreamPlotError::SchemaMismatch { expected, found } => {
                assert_eq!(expected.arity, 3);
                assert_eq!(found.arity, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        for i in 0..3 {
            assert_eq!(store.curve_length(i), 1);
        }
        assert_eq!(store.samples_ingested(), 1);
    }

    #[test]
    fn test_uncertainty_presence_is_part_of_schema() {
        let mut store = store_with(&[Sample::new(0.0, vec![1.0])]);
        let with_errs = Sample::with_uncertainties(1.0, vec![1.0], vec![0.1]).unwrap();
        assert!(matches!(
            store.ingest(&with_errs),
            Err(StreamPlotError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_uncertainties_follow_the_sort() {
        let store = store_with(&[
            Sample::with_uncertainties(1.0, vec![10.0], vec![0.1]).unwrap(),
            Sample::with_uncertainties(0.0, vec![20.0], vec![0.2]).unwrap(),
        ]);
        let snapshot = store.snapshot_sorted(0).unwrap();
        assert_eq!(snapshot.y, vec![20.0, 10.0]);
        assert_eq!(snapshot.err, Some(vec![0.2, 0.1]));
    }

    #[test]
    fn test_empty_sample_rejected() {
        let mut store = CurveStore::new();
        assert!(matches!(
            store.ingest(&Sample::new(0.0, vec![])),
            Err(StreamPlotError::InvalidSample(_))
        ));
        assert_eq!(store.state(), SessionState::Empty);
    }

    #[test]
    fn test_clear_all_returns_to_empty() {
        let mut store = store_with(&[
            Sample::new(0.0, vec![1.0, 2.0]),
            Sample::new(1.0, vec![1.0, 2.0]),
        ]);
        store.clear_all();
        assert_eq!(store.curve_count(), 0);
        assert_eq!(store.arity(), 0);
        assert_eq!(store.state(), SessionState::Empty);
        for i in 0..4 {
            assert!(!store.curve_exists(i));
            assert_eq!(store.curve_length(i), 0);
        }

        // A new session may choose a different arity
        let outcome = store.ingest(&Sample::new(0.0, vec![1.0])).unwrap();
        assert_eq!(outcome, IngestOutcome::SessionStarted { arity: 1 });
    }

    #[test]
    fn test_clear_single_curve() {
        let mut store = store_with(&[
            Sample::new(0.0, vec![1.0, 2.0, 3.0]),
            Sample::new(1.0, vec![1.0, 2.0, 3.0]),
        ]);
        store.clear_curve(1).unwrap();

        assert!(!store.curve_exists(1));
        assert_eq!(store.curve_length(1), 0);
        assert_eq!(store.curve_length(0), 2);
        assert_eq!(store.curve_length(2), 2);
        assert_eq!(store.curve_count(), 2);

        // Retired curve no longer receives samples, the others stay aligned
        store.ingest(&Sample::new(2.0, vec![1.0, 2.0, 3.0])).unwrap();
        assert_eq!(store.curve_length(1), 0);
        let snapshot = store.snapshot_sorted(2).unwrap();
        assert_eq!(snapshot.x.len(), snapshot.y.len());
        assert_eq!(snapshot.len(), 3);
    }

    #[test]
    fn test_clear_curve_is_idempotent() {
        let mut store = store_with(&[Sample::new(0.0, vec![1.0, 2.0])]);
        store.clear_curve(0).unwrap();
        store.clear_curve(0).unwrap();
        assert_eq!(store.curve_count(), 1);
    }

    #[test]
    fn test_clearing_every_curve_keeps_session() {
        let mut store = store_with(&[Sample::new(0.0, vec![1.0, 2.0])]);
        store.clear_curve(0).unwrap();
        store.clear_curve(1).unwrap();
        assert_eq!(store.curve_count(), 0);
        assert_eq!(store.state(), SessionState::Populated);
        assert_eq!(store.arity(), 2);

        // Still locked to the old schema
        assert!(store.ingest(&Sample::new(1.0, vec![1.0])).is_err());
        assert_eq!(
            store.ingest(&Sample::new(1.0, vec![1.0, 2.0])).unwrap(),
            IngestOutcome::Appended
        );
    }

    #[test]
    fn test_unknown_curve_selection() {
        let mut store = store_with(&[Sample::new(0.0, vec![1.0])]);
        assert!(matches!(
            store.clear_curve(5),
            Err(StreamPlotError::InvalidCurveSelection(_))
        ));
        assert!(matches!(
            store.snapshot_sorted(5),
            Err(StreamPlotError::InvalidCurveSelection(_))
        ));
        assert!(!store.curve_exists(5));
        assert_eq!(store.curve_length(5), 0);
    }
}
