//! The executor.
//!
//! Owns the graph for the duration of a run: seeds root storage from the
//! caller's input batches, enqueues one task per (node, batch) pair, and
//! drives a pool of worker threads plus a stall watchdog until the queue
//! drains or the run is cancelled.

mod state;
mod worker;

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::thread;

use batchdag_core::MiniBatch;
use batchdag_graph::{BatchId, Graph, NodeId};

use crate::config::ExecutorConfig;
use crate::error::RuntimeError;
use crate::executor::state::ExecState;
use crate::executor::worker::{worker_loop, WorkerCtx};
use crate::queue::TaskQueue;

/// One unit of scheduled work: a (node, batch) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Task {
    pub node: NodeId,
    pub batch: BatchId,
}

/// Counters describing a completed run.
#[derive(Debug, Clone)]
pub struct ExecutionStats {
    /// Tasks executed (exactly graph size x batch count on success).
    pub executed_tasks: usize,
    /// Times a task was popped before its inputs had arrived and pushed
    /// back to the tail.
    pub requeues: usize,
    /// Wall-clock duration of the run in milliseconds.
    pub duration_ms: u128,
}

/// Drives a [`Graph`] over a sequence of input batches.
///
/// `inputs` holds one map per batch; each map seeds the port storage of
/// every root node by name before work starts. After [`run`](Executor::run)
/// returns, per-batch outputs are read back through
/// [`Graph::mini_batch`] on [`graph`](Executor::graph).
pub struct Executor {
    graph: Graph,
    inputs: Vec<HashMap<String, MiniBatch>>,
    cfg: ExecutorConfig,
}

impl Executor {
    /// Creates an executor with the default configuration.
    pub fn new(graph: Graph, inputs: Vec<HashMap<String, MiniBatch>>) -> Self {
        Self::with_config(graph, inputs, ExecutorConfig::default())
    }

    /// Creates an executor with an explicit configuration.
    pub fn with_config(
        graph: Graph,
        inputs: Vec<HashMap<String, MiniBatch>>,
        cfg: ExecutorConfig,
    ) -> Self {
        Self { graph, inputs, cfg }
    }

    /// The driven graph; used to read outputs back after a run.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Consumes the executor, returning the graph.
    pub fn into_graph(self) -> Graph {
        self.graph
    }

    /// Runs every (node, batch) task to completion.
    ///
    /// Blocks until the task queue drains. Execution happens exactly once
    /// per (node, batch) pair; there is no ordering guarantee beyond the
    /// data-dependency order enforced by the readiness gate. The engine
    /// fails fast: the first body failure (or a watchdog-detected stall)
    /// cancels the run, the remaining workers wind down, and that first
    /// error is returned.
    ///
    /// # Errors
    ///
    /// The first [`RuntimeError`] recorded during the run, or
    /// [`RuntimeError::Config`] when the configuration is invalid.
    pub fn run(&mut self) -> Result<ExecutionStats, RuntimeError> {
        self.cfg.validate().map_err(RuntimeError::Config)?;
        if self.cfg.enable_tracing {
            tracing_subscriber::fmt()
                .with_target(false)
                .with_level(true)
                .try_init()
                .ok();
        }

        let num_batches = self.inputs.len();
        tracing::info!(
            nodes = self.graph.size(),
            batches = num_batches,
            workers = self.cfg.worker_count(),
            "starting run"
        );

        self.seed_storage()?;

        let queue = TaskQueue::new();
        for node in 0..self.graph.size() {
            for batch in 0..num_batches {
                queue.push(Task { node, batch });
            }
        }

        let state = ExecState::new(self.graph.size() * num_batches);
        state.record_progress();
        self.drive(&queue, &state);

        if let Some(error) = state.take_first_error() {
            return Err(error);
        }
        let stats = ExecutionStats {
            executed_tasks: state.executed.load(Ordering::Relaxed),
            requeues: state.requeues.load(Ordering::Relaxed),
            duration_ms: state.start.elapsed().as_millis(),
        };
        tracing::info!(
            executed = stats.executed_tasks,
            requeues = stats.requeues,
            duration_ms = stats.duration_ms as u64,
            "run complete"
        );
        Ok(stats)
    }

    /// Initializes per-batch storage and installs the caller's mini-batches
    /// at every root, by name and by content. Names not provided stay at
    /// their empty defaults; non-root nodes are not seeded.
    fn seed_storage(&mut self) -> Result<(), RuntimeError> {
        self.graph.init_storage(self.inputs.len());
        let roots = self.graph.root_nodes().to_vec();
        for (batch_id, seed) in self.inputs.iter().enumerate() {
            for &root in &roots {
                let mut ports = self.graph.batch_ports(root, batch_id)?;
                for (name, batch) in seed {
                    ports.insert(name.clone(), batch.clone());
                }
            }
        }
        Ok(())
    }

    /// Spawns the worker pool and the watchdog, then joins the workers.
    fn drive(&self, queue: &TaskQueue<Task>, state: &ExecState) {
        let workers = self.cfg.worker_count();
        let graph = &self.graph;
        thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|worker_id| {
                    let ctx = WorkerCtx {
                        graph,
                        queue,
                        state,
                    };
                    scope.spawn(move || worker_loop(worker_id, &ctx))
                })
                .collect();
            scope.spawn(|| watchdog_loop(state, &self.cfg));

            let mut panicked = false;
            for handle in handles {
                panicked |= handle.join().is_err();
            }
            if panicked {
                state.set_first_error(RuntimeError::WorkerPanic);
            }
            state.mark_finished();
        });
    }
}

/// Stall watchdog.
///
/// Samples the progress clock every `watchdog_interval`. A run is stalled
/// when tasks remain, none is in a worker's hands, and nothing has completed
/// for `stall_timeout`: every surviving task is spinning through the requeue
/// path waiting for data that can no longer arrive. Such a run is recorded
/// as stalled and cancelled rather than left to spin.
fn watchdog_loop(state: &ExecState, cfg: &ExecutorConfig) {
    let stall_ms = cfg.stall_timeout.as_millis() as u64;
    loop {
        if state.wait_finished(cfg.watchdog_interval) {
            break;
        }
        if state.is_cancelled() {
            break;
        }
        let idle_ms = state
            .elapsed_ms()
            .saturating_sub(state.last_progress_ms.load(Ordering::Relaxed));
        if idle_ms < stall_ms {
            continue;
        }
        let remaining = state.remaining();
        if remaining == 0 || state.in_flight.load(Ordering::Relaxed) != 0 {
            // Finished or still executing something; not stuck.
            continue;
        }
        tracing::warn!(stalled_ms = idle_ms, remaining, "no progress; cancelling run");
        state.set_first_error(RuntimeError::Stalled {
            stalled_ms: idle_ms,
            remaining,
        });
        state.cancel();
        break;
    }
}
