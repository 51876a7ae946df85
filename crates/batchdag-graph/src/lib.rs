//! Computation graph for the batchdag engine.
//!
//! This crate holds the graph structure the executor drives: [`GraphNode`]s
//! with named, typed ports and per-placement processing bodies, and the
//! [`Graph`] that owns them together with its adjacency matrix, acyclicity
//! and IO-compatibility invariants, root tracking, and the per-(node, batch)
//! port storage mutated during a run.

use thiserror::Error;

pub mod graph;
pub mod node;

pub use graph::{EdgeRejection, Graph, PortStore};
pub use node::{BodyError, GraphNode, NodeBody, Placement, PortMap};

/// Node identity: the insertion index into the owning graph, stable for the
/// graph's lifetime.
pub type NodeId = usize;

/// Batch identity: the index into the executor's input sequence.
pub type BatchId = usize;

/// Errors raised by graph and node accessors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// A node id referenced a non-existent node.
    #[error("node id {id} out of range for graph of {len} nodes")]
    NodeOutOfRange {
        /// The offending id.
        id: NodeId,
        /// Current node count.
        len: usize,
    },

    /// A batch id referenced a batch slot that storage does not hold.
    #[error("batch id {id} out of range for {len} initialized batches")]
    BatchOutOfRange {
        /// The offending id.
        id: BatchId,
        /// Number of batch slots initialized for the node.
        len: usize,
    },

    /// A node port accessor was given an undeclared port name.
    #[error("no declared port named {port:?}")]
    PortMissing {
        /// The name that was looked up.
        port: String,
    },
}
