//! Ingest session: the listen loop and its hand-off to the consumer
//!
//! [`IngestSession::start`] claims one worker slot for the whole lifetime of
//! the listener. The listener runs there and pushes every line into an
//! unbounded crossbeam channel; the consumer context drains that channel
//! without blocking and in FIFO order.
//!
//! The listener is not restarted when it fails. The failure is logged and
//! reported through [`ListenerStatus::Failed`], and ingestion stays stopped.

pub mod listener;

pub use listener::{Listener, TcpLineListener};

use crate::error::{Result, ResultExt};
use crate::worker::{CancelToken, TaskEvent, TaskHandle, WorkerFailure, WorkerPool};
use crossbeam_channel::{unbounded, Receiver};

/// Name of the listener task in the worker pool
pub const LISTENER_TASK: &str = "listener";

/// Lifecycle of the listen task as seen from the consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerStatus {
    Running,
    /// Returned normally, usually after cancellation
    Stopped,
    Failed(WorkerFailure),
}

/// Owner of the long-running listen task
pub struct IngestSession {
    lines: Receiver<String>,
    task: TaskHandle<()>,
    cancel: CancelToken,
    status: ListenerStatus,
}

impl IngestSession {
    /// Start the listener on a free worker slot
    ///
    /// Fails with [`crate::StreamPlotError::PoolExhausted`] when no slot is free,
    /// which the binary treats as fatal.
    pub fn start<L: Listener>(pool: &WorkerPool, mut listener: L) -> Result<Self> {
        let (line_tx, lines) = unbounded::<String>();
        let cancel = CancelToken::new();
        let token = cancel.clone();

        let task = pool
            .try_submit(LISTENER_TASK, move || {
                let mut on_line = |line: String| {
                    if line_tx.send(line).is_err() {
                        tracing::trace!("Consumer gone, dropping line");
                    }
                };
                listener.listen(&mut on_line, &token)
            })
            .context("Could not reserve a worker slot for the listener")?;

        tracing::info!("Ingest session started");

        Ok(Self {
            lines,
            task,
            cancel,
            status: ListenerStatus::Running,
        })
    }

    /// Next handed-off line, without blocking
    pub fn try_recv_line(&self) -> Option<String> {
        self.lines.try_recv().ok()
    }

    /// All lines handed off so far, oldest first
    pub fn drain_lines(&self) -> Vec<String> {
        self.lines.try_iter().collect()
    }

    /// Receiving end of the hand-off, for callers that want to block or select
    pub fn lines(&self) -> &Receiver<String> {
        &self.lines
    }

    /// Fold pending task events into the listener status
    pub fn poll_status(&mut self) -> &ListenerStatus {
        for event in self.task.drain() {
            self.observe(event);
        }
        &self.status
    }

    /// Poll, then surface a listener failure as an error
    pub fn check(&mut self) -> Result<()> {
        match self.poll_status() {
            ListenerStatus::Failed(failure) => Err(failure.clone().into()),
            _ => Ok(()),
        }
    }

    fn observe(&mut self, event: TaskEvent<()>) {
        match event {
            TaskEvent::Result(()) => {}
            TaskEvent::Error(failure) => {
                tracing::error!(
                    kind = %failure.kind,
                    trace = %failure.trace,
                    "Listener stopped: {}. Ingestion will not restart automatically",
                    failure.message
                );
                self.status = ListenerStatus::Failed(failure);
            }
            TaskEvent::Finished => {
                if self.status == ListenerStatus::Running {
                    tracing::info!("Listener finished");
                    self.status = ListenerStatus::Stopped;
                }
            }
        }
    }

    /// Whether the listen task has reported completion
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Last known status without polling
    pub fn status(&self) -> &ListenerStatus {
        &self.status
    }

    /// Ask the listener to stop; it exits at its next cancellation check
    pub fn shutdown(&self) {
        tracing::info!("Stopping ingest session");
        self.cancel.cancel();
    }

    /// Stop and wait up to `timeout` for the listener to finish
    pub fn shutdown_and_wait(&mut self, timeout: std::time::Duration) -> &ListenerStatus {
        self.shutdown();
        for event in self.task.wait_finished(timeout) {
            self.observe(event);
        }
        &self.status
    }
}

impl Drop for IngestSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
