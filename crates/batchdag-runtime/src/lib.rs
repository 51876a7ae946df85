//! Batchdag Runtime - the engine that drives a computation graph.
//!
//! The executor seeds per-batch port storage at the graph's roots, fans
//! `(node, batch)` tasks out over a worker pool through a shared FIFO, gates
//! each task on data readiness (requeueing it until its inputs have
//! arrived), and propagates outputs into the input slots of downstream
//! nodes. `run` blocks until every task has executed once.

pub mod config;
pub mod error;
pub mod executor;
pub mod queue;

pub use config::ExecutorConfig;
pub use error::RuntimeError;
pub use executor::{ExecutionStats, Executor};
pub use queue::TaskQueue;

// Re-export what clients need to assemble a runnable graph.
pub use batchdag_core::{Cell, CellError, CellKind, MiniBatch};
pub use batchdag_graph::{
    BatchId, BodyError, EdgeRejection, Graph, GraphError, GraphNode, NodeId, Placement, PortMap,
};
