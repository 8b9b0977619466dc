//! Bounded ring of recent user-visible diagnostics

use std::collections::VecDeque;
use std::fmt;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub at: Instant,
}

/// Oldest entries are evicted once `capacity` is reached
#[derive(Debug)]
pub struct Diagnostics {
    entries: VecDeque<Diagnostic>,
    capacity: usize,
}

impl Diagnostics {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, severity: Severity, message: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(Diagnostic {
            severity,
            message: message.into(),
            at: Instant::now(),
        });
    }

    pub fn latest(&self) -> Option<&Diagnostic> {
        self.entries.back()
    }

    /// Oldest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(64)
    }
}
