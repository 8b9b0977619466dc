//! Task handles, completion events and cancellation.

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Identifier assigned to each submitted task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub u64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a background task failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The task returned an error
    Error,
    /// The task panicked
    Panic,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Error => write!(f, "error"),
            FailureKind::Panic => write!(f, "panic"),
        }
    }
}

/// A fault captured at the pool boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerFailure {
    /// Name the task was submitted under
    pub task: String,
    pub kind: FailureKind,
    pub message: String,
    /// Error chain and/or stack trace, as text
    pub trace: String,
}

impl std::fmt::Display for WorkerFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task '{}' failed ({}): {}", self.task, self.kind, self.message)
    }
}

impl std::error::Error for WorkerFailure {}

/// Asynchronous outcome of a task, delivered in this order:
/// at most one `Result` or `Error`, then exactly one `Finished`
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent<T> {
    Result(T),
    Error(WorkerFailure),
    Finished,
}

/// Submitting side's view of a task
///
/// Polling never blocks unless [`TaskHandle::wait`] is used.
#[derive(Debug)]
pub struct TaskHandle<T> {
    id: TaskId,
    name: String,
    events: Receiver<TaskEvent<T>>,
    finished: bool,
}

impl<T> TaskHandle<T> {
    pub(crate) fn new(id: TaskId, name: String, events: Receiver<TaskEvent<T>>) -> Self {
        Self {
            id,
            name,
            events,
            finished: false,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the `Finished` event has been observed
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Next pending event, if any
    pub fn try_next(&mut self) -> Option<TaskEvent<T>> {
        match self.events.try_recv() {
            Ok(event) => Some(self.observe(event)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => self.lost(),
        }
    }

    /// All pending events
    pub fn drain(&mut self) -> Vec<TaskEvent<T>> {
        let mut events = Vec::new();
        while let Some(event) = self.try_next() {
            events.push(event);
        }
        events
    }

    /// Block up to `timeout` for the next event
    pub fn wait(&mut self, timeout: Duration) -> Option<TaskEvent<T>> {
        match self.events.recv_timeout(timeout) {
            Ok(event) => Some(self.observe(event)),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => self.lost(),
        }
    }

    /// Block until the task finishes or `timeout` elapses, returning every event seen
    pub fn wait_finished(&mut self, timeout: Duration) -> Vec<TaskEvent<T>> {
        let deadline = std::time::Instant::now() + timeout;
        let mut events = Vec::new();
        while !self.finished {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.wait(remaining) {
                Some(event) => events.push(event),
                None => break,
            }
        }
        events
    }

    fn observe(&mut self, event: TaskEvent<T>) -> TaskEvent<T> {
        if matches!(event, TaskEvent::Finished) {
            self.finished = true;
        }
        event
    }

    /// The worker side went away without reporting `Finished`
    fn lost(&mut self) -> Option<TaskEvent<T>> {
        if self.finished {
            return None;
        }
        self.finished = true;
        tracing::warn!(task = %self.name, id = %self.id, "Task channel closed before completion");
        Some(TaskEvent::Finished)
    }
}

/// Cooperative cancellation flag shared with long-running tasks
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
