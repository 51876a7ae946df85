//! Runtime errors.
//!
//! Errors that occur while an executor drives a graph: storage and id
//! failures bubbled up from the graph, body failures, mis-shaped inputs,
//! and stalled schedules.

use thiserror::Error;

use batchdag_graph::{BatchId, BodyError, GraphError, NodeId};

/// Errors surfaced by [`Executor::run`](crate::Executor::run).
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Storage or id error reported by the graph.
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    /// A node body failed; the run is cancelled and this is the first error.
    #[error("node {node_id} failed on batch {batch_id}: {source}")]
    Body {
        /// Node whose body failed.
        node_id: NodeId,
        /// Batch the node was executing.
        batch_id: BatchId,
        /// The underlying body error.
        source: BodyError,
    },

    /// A multi-input node saw differing cell counts across its input ports.
    #[error("node {node_id} has mismatched input cell counts on batch {batch_id}")]
    RaggedInputs {
        /// Node with the ragged inputs.
        node_id: NodeId,
        /// Batch being executed.
        batch_id: BatchId,
    },

    /// The watchdog observed no progress while tasks remained unfinished.
    #[error("no progress for {stalled_ms}ms with {remaining} unfinished tasks")]
    Stalled {
        /// Milliseconds since the last completed task.
        stalled_ms: u64,
        /// Tasks that had not executed when the run was cancelled.
        remaining: usize,
    },

    /// A worker thread panicked.
    #[error("worker thread panicked")]
    WorkerPanic,

    /// The executor configuration failed validation.
    #[error("invalid executor config: {0}")]
    Config(String),
}
