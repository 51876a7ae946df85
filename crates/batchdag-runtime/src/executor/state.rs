//! Shared run state.
//!
//! One `ExecState` is shared by every worker and the watchdog for the
//! duration of a run: completion counters, the cancellation flag, the
//! first-error slot, and the progress clock the watchdog samples.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::RuntimeError;

pub(crate) struct ExecState {
    /// Total tasks this run was seeded with (graph size x batch count).
    pub total_tasks: usize,
    /// Tasks executed successfully.
    pub executed: AtomicUsize,
    /// Tasks currently being executed by a worker.
    pub in_flight: AtomicUsize,
    /// Times a popped task was pushed back because it was not ready.
    pub requeues: AtomicUsize,
    /// Milliseconds since `start` at the last completed task.
    pub last_progress_ms: AtomicU64,
    /// Run start, the zero point of the progress clock.
    pub start: Instant,

    cancelled: AtomicBool,
    first_error: Mutex<Option<RuntimeError>>,
    finished: Mutex<bool>,
    finished_signal: Condvar,
}

impl ExecState {
    pub fn new(total_tasks: usize) -> Self {
        Self {
            total_tasks,
            executed: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            requeues: AtomicUsize::new(0),
            last_progress_ms: AtomicU64::new(0),
            start: Instant::now(),
            cancelled: AtomicBool::new(false),
            first_error: Mutex::new(None),
            finished: Mutex::new(false),
            finished_signal: Condvar::new(),
        }
    }

    #[inline]
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Tasks that have not executed yet.
    pub fn remaining(&self) -> usize {
        self.total_tasks
            .saturating_sub(self.executed.load(Ordering::Relaxed))
    }

    /// Advance the progress clock; called after every completed task.
    pub fn record_progress(&self) {
        self.last_progress_ms
            .store(self.elapsed_ms(), Ordering::Relaxed);
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Records `error` if no error has been recorded yet.
    pub fn set_first_error(&self, error: RuntimeError) {
        let mut guard = self.first_error.lock();
        if guard.is_none() {
            *guard = Some(error);
        }
    }

    /// Takes the recorded error, if any.
    pub fn take_first_error(&self) -> Option<RuntimeError> {
        self.first_error.lock().take()
    }

    /// Marks the run finished and wakes the watchdog.
    pub fn mark_finished(&self) {
        *self.finished.lock() = true;
        self.finished_signal.notify_all();
    }

    /// Sleeps until the run finishes or `timeout` passes; returns whether
    /// the run has finished.
    pub fn wait_finished(&self, timeout: Duration) -> bool {
        let mut finished = self.finished.lock();
        if *finished {
            return true;
        }
        let _ = self.finished_signal.wait_for(&mut finished, timeout);
        *finished
    }
}
