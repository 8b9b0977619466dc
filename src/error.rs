//! Error handling for StreamPlot
//!
//! This module defines the error taxonomy used across ingestion, dispatch,
//! curve storage and background work, plus a Result alias.

use crate::types::SampleSchema;
use crate::worker::WorkerFailure;
use thiserror::Error;

/// Main error type for StreamPlot operations
#[derive(Error, Debug)]
pub enum StreamPlotError {
    /// A decoded command named a handler that is not registered
    #[error("Unrecognized command '{name}' in message: {message}")]
    UnrecognizedCommand { name: String, message: String },

    /// A sample does not match the schema established by the session's first sample
    #[error("Schema mismatch: session expects {expected}, sample has {found}")]
    SchemaMismatch {
        expected: SampleSchema,
        found: SampleSchema,
    },

    /// A sample tuple could not be interpreted
    #[error("Invalid sample: {0}")]
    InvalidSample(String),

    /// A curve index that was never populated or has been cleared
    #[error("Invalid curve selection: {0}")]
    InvalidCurveSelection(String),

    /// A fit was requested without choosing a fit function
    #[error("No fit function selected")]
    FitFunctionNotSelected,

    /// A background task failed
    #[error("Worker failure: {0}")]
    WorkerFailure(WorkerFailure),

    /// No worker slot was free for a task that needs one immediately
    #[error("Worker pool exhausted: {busy} of {capacity} slots busy")]
    PoolExhausted { busy: usize, capacity: usize },

    /// Errors related to message decoding
    #[error("Decode error: {0}")]
    Decode(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<StreamPlotError>,
    },
}

impl StreamPlotError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        StreamPlotError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping any context wrappers
    pub fn root(&self) -> &StreamPlotError {
        match self {
            StreamPlotError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<WorkerFailure> for StreamPlotError {
    fn from(failure: WorkerFailure) -> Self {
        StreamPlotError::WorkerFailure(failure)
    }
}

/// Result type alias for StreamPlot operations
pub type Result<T> = std::result::Result<T, StreamPlotError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StreamPlotError::InvalidSample("expected 2 or 3 elements".to_string());
        assert_eq!(err.to_string(), "Invalid sample: expected 2 or 3 elements");
    }

    #[test]
    fn test_schema_mismatch_display() {
        let err = StreamPlotError::SchemaMismatch {
            expected: SampleSchema::new(3, false),
            found: SampleSchema::new(2, false),
        };
        let text = err.to_string();
        assert!(text.contains("3 curves"));
        assert!(text.contains("2 curves"));
    }

    #[test]
    fn test_error_with_context() {
        let err = StreamPlotError::InvalidCurveSelection("curve 4".to_string());
        let with_ctx = err.with_context("Failed to prepare fit");
        assert!(with_ctx.to_string().contains("Failed to prepare fit"));
        assert!(matches!(
            with_ctx.root(),
            StreamPlotError::InvalidCurveSelection(_)
        ));
    }
}
