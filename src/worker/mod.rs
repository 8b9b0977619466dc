//! Bounded background worker pool
//!
//! A fixed set of named threads pull jobs from a shared crossbeam queue.
//! Submissions never block and are never dropped: when every slot is busy
//! the job waits in the queue. Each task reports back through its own
//! [`TaskHandle`], whose channel the worker writes without blocking.
//!
//! A task that returns `Err` or panics is converted into a
//! [`WorkerFailure`] at the pool boundary; the worker thread survives and
//! picks up the next job.
//!
//! There is no preemptive cancellation. Long-running tasks such as the
//! listen loop hold a slot for their whole lifetime and observe a
//! [`CancelToken`] to stop; [`WorkerPool::try_submit`] lets callers claim such a
//! slot and fail fast when none is free.

mod task;
mod trace;

pub use task::{CancelToken, FailureKind, TaskEvent, TaskHandle, TaskId, WorkerFailure};

use crate::error::{Result, StreamPlotError};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Default number of worker threads
pub const DEFAULT_MAX_THREADS: usize = 5;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed-size pool of worker threads
pub struct WorkerPool {
    job_tx: Option<Sender<Job>>,
    exit_rx: Receiver<usize>,
    threads: Vec<JoinHandle<()>>,
    capacity: usize,
    /// Tasks queued or running
    in_flight: Arc<AtomicUsize>,
    next_id: AtomicU64,
}

impl WorkerPool {
    /// Spawn `max_threads` workers
    pub fn new(max_threads: usize) -> Result<Self> {
        if max_threads == 0 {
            return Err(StreamPlotError::Config(
                "worker pool needs at least one thread".to_string(),
            ));
        }

        trace::install_hook();

        let (job_tx, job_rx) = unbounded::<Job>();
        let (exit_tx, exit_rx) = unbounded();
        let mut threads = Vec::with_capacity(max_threads);

        for slot in 0..max_threads {
            let jobs = job_rx.clone();
            let exit = exit_tx.clone();
            let handle = std::thread::Builder::new()
                .name(format!("streamplot-worker-{}", slot))
                .spawn(move || {
                    while let Ok(job) = jobs.recv() {
                        job();
                    }
                    let _ = exit.send(slot);
                })?;
            threads.push(handle);
        }

        tracing::debug!(threads = max_threads, "Worker pool started");

        Ok(Self {
            job_tx: Some(job_tx),
            exit_rx,
            threads,
            capacity: max_threads,
            in_flight: Arc::new(AtomicUsize::new(0)),
            next_id: AtomicU64::new(1),
        })
    }

    /// Number of worker threads
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tasks queued or running
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Slots not currently claimed by a task
    pub fn idle_slots(&self) -> usize {
        self.capacity.saturating_sub(self.in_flight())
    }

    /// Queue a task; it runs as soon as a slot frees up
    pub fn submit<T, F>(&self, name: impl Into<String>, task: F) -> Result<TaskHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.enqueue(name.into(), task)
    }

    /// Run a task only if a slot is free right now
    ///
    /// Used for tasks that occupy their slot indefinitely, where queueing
    /// behind other work would mean never starting.
    pub fn try_submit<T, F>(&self, name: impl Into<String>, task: F) -> Result<TaskHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    {
        let capacity = self.capacity;
        self.in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |busy| {
                (busy < capacity).then_some(busy + 1)
            })
            .map_err(|busy| StreamPlotError::PoolExhausted { busy, capacity })?;
        self.enqueue(name.into(), task)
    }

    fn enqueue<T, F>(&self, name: String, task: F) -> Result<TaskHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (events_tx, events_rx) = unbounded();
        let in_flight = Arc::clone(&self.in_flight);
        let task_name = name.clone();

        let job: Job = Box::new(move || {
            tracing::trace!(task = %task_name, %id, "Task started");
            let outcome = trace::capture(|| panic::catch_unwind(AssertUnwindSafe(task)));
            match outcome {
                Ok(Ok(value)) => {
                    let _ = events_tx.send(TaskEvent::Result(value));
                }
                Ok(Err(err)) => {
                    let failure = WorkerFailure {
                        task: task_name.clone(),
                        kind: FailureKind::Error,
                        message: err.to_string(),
                        trace: format!("{:?}", err),
                    };
                    tracing::error!(task = %task_name, %id, "{}", failure);
                    let _ = events_tx.send(TaskEvent::Error(failure));
                }
                Err(payload) => {
                    let failure = WorkerFailure {
                        task: task_name.clone(),
                        kind: FailureKind::Panic,
                        message: panic_payload_to_string(payload.as_ref()),
                        trace: trace::take_last()
                            .unwrap_or_else(|| "no backtrace recorded".to_string()),
                    };
                    tracing::error!(task = %task_name, %id, "{}", failure);
                    let _ = events_tx.send(TaskEvent::Error(failure));
                }
            }
            in_flight.fetch_sub(1, Ordering::SeqCst);
            let _ = events_tx.send(TaskEvent::Finished);
        });

        let sent = self
            .job_tx
            .as_ref()
            .map(|tx| tx.send(job).is_ok())
            .unwrap_or(false);
        if !sent {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            return Err(StreamPlotError::Channel(
                "worker pool is shut down".to_string(),
            ));
        }

        Ok(TaskHandle::new(id, name, events_rx))
    }

    /// Stop accepting work and wait up to `timeout` for workers to exit
    ///
    /// Returns `false` if some worker was still busy when the timeout hit;
    /// those threads are left detached.
    pub fn shutdown(mut self, timeout: Duration) -> bool {
        self.job_tx.take();
        let deadline = Instant::now() + timeout;
        let mut exited = 0;

        while exited < self.threads.len() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.exit_rx.recv_timeout(remaining) {
                Ok(_) => exited += 1,
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        if exited < self.threads.len() {
            tracing::warn!(
                busy = self.threads.len() - exited,
                "Worker pool shutdown timed out, detaching busy workers"
            );
            return false;
        }

        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
        tracing::debug!("Worker pool stopped");
        true
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the queue lets idle workers exit on their own
        self.job_tx.take();
    }
}

fn panic_payload_to_string(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn test_result_then_finished() {
        let pool = WorkerPool::new(2).unwrap();
        let mut handle = pool.submit("answer", || Ok(42)).unwrap();
        let events = handle.wait_finished(WAIT);
        assert_eq!(events, vec![TaskEvent::Result(42), TaskEvent::Finished]);
        assert!(pool.shutdown(WAIT));
    }

    #[test]
    fn test_error_is_captured() {
        let pool = WorkerPool::new(1).unwrap();
        let mut handle = pool
            .submit::<(), _>("failing", || Err(anyhow::anyhow!("connection refused")))
            .unwrap();
        let events = handle.wait_finished(WAIT);
        assert_eq!(events.len(), 2);
        match &events[0] {
            TaskEvent::Error(failure) => {
                assert_eq!(failure.kind, FailureKind::Error);
                assert_eq!(failure.task, "failing");
                assert!(failure.message.contains("connection refused"));
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(events[1], TaskEvent::Finished);
    }

    #[test]
    fn test_panic_does_not_kill_pool() {
        let pool = WorkerPool::new(1).unwrap();
        let mut bad = pool
            .submit::<(), _>("panicking", || panic!("boom"))
            .unwrap();
        let events = bad.wait_finished(WAIT);
        match &events[0] {
            TaskEvent::Error(failure) => {
                assert_eq!(failure.kind, FailureKind::Panic);
                assert_eq!(failure.message, "boom");
                assert!(!failure.trace.is_empty());
            }
            other => panic!("unexpected event {other:?}"),
        }

        // Same single worker still serves new tasks
        let mut good = pool.submit("after", || Ok("ok")).unwrap();
        assert_eq!(
            good.wait_finished(WAIT),
            vec![TaskEvent::Result("ok"), TaskEvent::Finished]
        );
        assert_eq!(pool.in_flight(), 0);
    }

    #[inline(never)]
    fn calibrate_detector_offsets() -> anyhow::Result<()> {
        panic!("offset table missing")
    }

    #[test]
    fn test_panic_trace_points_at_fault() {
        let pool = WorkerPool::new(1).unwrap();
        let mut handle = pool.submit("calibrate", calibrate_detector_offsets).unwrap();
        match handle.wait_finished(WAIT).first() {
            Some(TaskEvent::Error(failure)) => {
                assert_eq!(failure.kind, FailureKind::Panic);
                assert!(
                    failure.trace.contains("calibrate_detector_offsets"),
                    "{}",
                    failure.trace
                );
                assert!(failure.trace.contains("offset table missing"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_submit_queues_when_busy() {
        let pool = WorkerPool::new(1).unwrap();
        let gate = Arc::new(Barrier::new(2));
        let blocker_gate = Arc::clone(&gate);
        let mut blocker = pool
            .submit("blocker", move || {
                blocker_gate.wait();
                Ok(1)
            })
            .unwrap();
        let mut queued = pool.submit("queued", || Ok(2)).unwrap();
        assert_eq!(pool.in_flight(), 2);
        assert!(queued.try_next().is_none());

        gate.wait();
        assert_eq!(blocker.wait_finished(WAIT)[0], TaskEvent::Result(1));
        assert_eq!(queued.wait_finished(WAIT)[0], TaskEvent::Result(2));
    }

    #[test]
    fn test_try_submit_fails_when_no_slot_is_free() {
        let pool = WorkerPool::new(1).unwrap();
        let token = CancelToken::new();
        let listener_token = token.clone();
        let mut listener = pool
            .try_submit("listener", move || {
                while !listener_token.is_cancelled() {
                    std::thread::sleep(Duration::from_millis(5));
                }
                Ok(())
            })
            .unwrap();

        let err = pool.try_submit("second", || Ok(())).unwrap_err();
        assert!(matches!(
            err,
            StreamPlotError::PoolExhausted { busy: 1, capacity: 1 }
        ));

        token.cancel();
        listener.wait_finished(WAIT);
        assert!(pool.shutdown(WAIT));
    }

    #[test]
    fn test_zero_threads_rejected() {
        assert!(WorkerPool::new(0).is_err());
    }
}
