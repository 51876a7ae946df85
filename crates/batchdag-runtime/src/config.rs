//! Executor configuration.

use std::time::Duration;

/// Tuning knobs for [`Executor::run`](crate::Executor::run).
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Worker thread count; `0` means the machine's available parallelism.
    pub workers: usize,

    /// How often the watchdog samples progress.
    pub watchdog_interval: Duration,

    /// How long the run may go without completing a task (while tasks
    /// remain queued) before the watchdog cancels it as stalled.
    pub stall_timeout: Duration,

    /// Install a global `tracing` fmt subscriber at the start of the run.
    /// Ignored if one is already installed.
    pub enable_tracing: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            watchdog_interval: Duration::from_millis(50),
            stall_timeout: Duration::from_secs(5),
            enable_tracing: false,
        }
    }
}

impl ExecutorConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// A human-readable description of the first violated constraint.
    pub fn validate(&self) -> Result<(), String> {
        if self.watchdog_interval.is_zero() {
            return Err("watchdog_interval must be non-zero".to_string());
        }
        if self.stall_timeout < self.watchdog_interval {
            return Err("stall_timeout must be at least watchdog_interval".to_string());
        }
        Ok(())
    }

    /// The effective worker count after resolving `0` to the machine's
    /// available parallelism.
    pub fn worker_count(&self) -> usize {
        if self.workers != 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}
