//! The computation graph.
//!
//! Holds a dense, index-keyed node registry, a square boolean adjacency
//! matrix, the derived root list, and the 3-level per-execution storage
//! `store[node][batch][port] -> MiniBatch`. Edge admission enforces
//! acyclicity, IO compatibility, and single-writer input ports; readiness
//! of a (node, batch) pair requires every input port slot to hold data.

use std::collections::HashMap;
use std::fmt;

use batchdag_core::MiniBatch;
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use thiserror::Error;

use crate::node::GraphNode;
use crate::{BatchId, GraphError, NodeId};

/// Port-name to mini-batch mapping for one (node, batch) pair.
pub type PortStore = HashMap<String, MiniBatch>;

/// Why an edge was not admitted. Non-fatal: the graph is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EdgeRejection {
    /// One of the endpoints does not exist.
    #[error("edge {from} -> {to} out of range for graph of {len} nodes")]
    OutOfRange {
        /// Source id.
        from: NodeId,
        /// Target id.
        to: NodeId,
        /// Current node count.
        len: usize,
    },

    /// Admitting the edge would close a cycle.
    #[error("edge {from} -> {to} would close a cycle")]
    Cycle {
        /// Source id.
        from: NodeId,
        /// Target id.
        to: NodeId,
    },

    /// No output port name of the source matches an input port name of the
    /// target.
    #[error("no output port of node {from} matches an input port of node {to}")]
    IoMismatch {
        /// Source id.
        from: NodeId,
        /// Target id.
        to: NodeId,
    },

    /// An existing predecessor already supplies one of the matched input
    /// ports; at most one predecessor may write a given input port.
    #[error("input port {port:?} of node {to} already has a writer")]
    DuplicateWriter {
        /// Target id.
        to: NodeId,
        /// The contested port name.
        port: String,
    },
}

/// A directed acyclic computation graph with per-(node, batch) port storage.
///
/// Nodes are moved in via [`add_node`](Graph::add_node) and identified by
/// their insertion index for the graph's lifetime. The adjacency matrix is
/// always `size x size` with a false diagonal. Each (node, batch) port map
/// sits behind its own mutex; that per-slot lock is what lets executor
/// workers mutate storage concurrently.
#[derive(Default)]
pub struct Graph {
    nodes: Vec<GraphNode>,
    adjacency: Vec<Vec<bool>>,
    roots: Vec<NodeId>,
    store: Vec<Vec<Mutex<PortStore>>>,
}

impl Graph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves `node` into the graph and returns its id.
    ///
    /// Grows the adjacency matrix by one all-false row and column and the
    /// storage by one (empty) per-node slot, then recomputes the root list.
    pub fn add_node(&mut self, node: GraphNode) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        for row in &mut self.adjacency {
            row.push(false);
        }
        self.adjacency.push(vec![false; self.nodes.len()]);
        self.store.push(Vec::new());
        self.update_roots();
        tracing::debug!(node = id, "node registered");
        id
    }

    /// Checks whether the edge `from -> to` would be admitted.
    ///
    /// # Errors
    ///
    /// The specific [`EdgeRejection`] that [`add_edge`](Graph::add_edge)
    /// would report for this edge.
    pub fn check_edge(&mut self, from: NodeId, to: NodeId) -> Result<(), EdgeRejection> {
        let len = self.nodes.len();
        if from >= len || to >= len {
            return Err(EdgeRejection::OutOfRange { from, to, len });
        }
        if self.creates_cycle(from, to) {
            return Err(EdgeRejection::Cycle { from, to });
        }
        let shared: Vec<&String> = self.nodes[from]
            .outputs()
            .keys()
            .filter(|name| self.nodes[to].inputs().contains_key(*name))
            .collect();
        if shared.is_empty() {
            return Err(EdgeRejection::IoMismatch { from, to });
        }
        // Single-writer rule: no existing predecessor of `to` may already
        // supply one of the matched port names.
        for port in shared {
            for pred in 0..len {
                if self.adjacency[pred][to] && self.nodes[pred].outputs().contains_key(port) {
                    return Err(EdgeRejection::DuplicateWriter {
                        to,
                        port: port.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Admits the edge `from -> to` if it passes every admission check.
    ///
    /// Returns `false` and leaves the graph unchanged on rejection; the
    /// reason is reported on the diagnostic channel.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> bool {
        match self.check_edge(from, to) {
            Ok(()) => {
                self.adjacency[from][to] = true;
                self.update_roots();
                tracing::debug!(from, to, "edge admitted");
                true
            }
            Err(reason) => {
                tracing::warn!(from, to, %reason, "edge rejected");
                false
            }
        }
    }

    /// Whether the graph currently contains a cycle.
    ///
    /// DFS with visited and on-stack coloring; neighbors are taken in
    /// ascending index order, so the traversal is deterministic. O(V + E).
    pub fn has_cycle(&self) -> bool {
        let mut visited = vec![false; self.nodes.len()];
        let mut on_stack = vec![false; self.nodes.len()];
        (0..self.nodes.len()).any(|id| !visited[id] && self.dfs(id, &mut visited, &mut on_stack))
    }

    /// Whether tentatively admitting `from -> to` would create a cycle.
    ///
    /// The candidate edge is set, checked, and rolled back before returning.
    fn creates_cycle(&mut self, from: NodeId, to: NodeId) -> bool {
        let prior = self.adjacency[from][to];
        self.adjacency[from][to] = true;
        let cyclic = self.has_cycle();
        self.adjacency[from][to] = prior;
        cyclic
    }

    fn dfs(&self, current: NodeId, visited: &mut [bool], on_stack: &mut [bool]) -> bool {
        if !visited[current] {
            visited[current] = true;
            on_stack[current] = true;
            for next in 0..self.nodes.len() {
                if !self.adjacency[current][next] {
                    continue;
                }
                if !visited[next] && self.dfs(next, visited, on_stack) {
                    return true;
                }
                if on_stack[next] {
                    return true;
                }
            }
        }
        on_stack[current] = false;
        false
    }

    fn update_roots(&mut self) {
        self.roots.clear();
        for id in 0..self.nodes.len() {
            if self.is_root(id) {
                self.roots.push(id);
            }
        }
    }

    /// Whether `id` names a node with no incoming edges.
    pub fn is_root(&self, id: NodeId) -> bool {
        id < self.nodes.len() && self.adjacency.iter().all(|row| !row[id])
    }

    /// The root ids in ascending order.
    pub fn root_nodes(&self) -> &[NodeId] {
        &self.roots
    }

    /// Number of registered nodes.
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether the edge `from -> to` exists.
    pub fn edge_exists(&self, from: NodeId, to: NodeId) -> bool {
        from < self.nodes.len() && to < self.nodes.len() && self.adjacency[from][to]
    }

    /// Borrows the node with the given id.
    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    /// Mutably borrows the node with the given id.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut GraphNode> {
        self.nodes.get_mut(id)
    }

    /// Sizes the per-execution storage for `num_batches` batches.
    ///
    /// After the call every node has exactly `num_batches` batch slots, and
    /// every batch map holds one entry per declared input and output port.
    /// Idempotent on shape: entries that already hold data are preserved.
    pub fn init_storage(&mut self, num_batches: usize) {
        for (id, node) in self.nodes.iter().enumerate() {
            let slots = &mut self.store[id];
            slots.truncate(num_batches);
            while slots.len() < num_batches {
                slots.push(Mutex::new(PortStore::new()));
            }
            for slot in slots.iter_mut() {
                let ports = slot.get_mut();
                for name in node.inputs().keys().chain(node.outputs().keys()) {
                    ports.entry(name.clone()).or_default();
                }
            }
        }
        tracing::debug!(nodes = self.nodes.len(), num_batches, "storage initialized");
    }

    /// Whether the (node, batch) pair is ready to execute: every declared
    /// input port slot exists and holds at least one cell. Empty default
    /// slots do not satisfy readiness.
    ///
    /// # Errors
    ///
    /// [`GraphError::NodeOutOfRange`] / [`GraphError::BatchOutOfRange`] for
    /// ids that storage does not cover.
    pub fn is_ready(&self, node_id: NodeId, batch_id: BatchId) -> Result<bool, GraphError> {
        let node = self.nodes.get(node_id).ok_or(GraphError::NodeOutOfRange {
            id: node_id,
            len: self.nodes.len(),
        })?;
        let ports = self.batch_ports(node_id, batch_id)?;
        Ok(node
            .inputs()
            .keys()
            .all(|port| ports.get(port).is_some_and(|batch| !batch.is_empty())))
    }

    /// Locks one port slot, creating an empty mini-batch on miss. The outer
    /// storage vectors are never reshaped by this accessor.
    pub fn mini_batch(
        &self,
        node_id: NodeId,
        batch_id: BatchId,
        port: &str,
    ) -> Result<MappedMutexGuard<'_, MiniBatch>, GraphError> {
        let guard = self.batch_ports(node_id, batch_id)?;
        Ok(MutexGuard::map(guard, |ports| {
            ports.entry(port.to_string()).or_default()
        }))
    }

    /// Locks the whole port map of one (node, batch) pair.
    pub fn batch_ports(
        &self,
        node_id: NodeId,
        batch_id: BatchId,
    ) -> Result<MutexGuard<'_, PortStore>, GraphError> {
        let slots = self.store.get(node_id).ok_or(GraphError::NodeOutOfRange {
            id: node_id,
            len: self.nodes.len(),
        })?;
        let slot = slots.get(batch_id).ok_or(GraphError::BatchOutOfRange {
            id: batch_id,
            len: slots.len(),
        })?;
        Ok(slot.lock())
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let edges: Vec<(NodeId, NodeId)> = (0..self.nodes.len())
            .flat_map(|from| {
                (0..self.nodes.len())
                    .filter(move |&to| self.adjacency[from][to])
                    .map(move |to| (from, to))
            })
            .collect();
        f.debug_struct("Graph")
            .field("nodes", &self.nodes.len())
            .field("edges", &edges)
            .field("roots", &self.roots)
            .finish()
    }
}
