//! Worker loop for the executor.
//!
//! Workers pull `(node, batch)` tasks from the shared queue until it drains.
//! A task whose inputs have not arrived is pushed back to the tail; a ready
//! task is executed once and its outputs copied into the input slots of
//! every downstream node.

use std::sync::atomic::Ordering;
use std::thread;

use batchdag_core::MiniBatch;
use batchdag_graph::{Graph, GraphError, GraphNode};

use crate::error::RuntimeError;
use crate::executor::state::ExecState;
use crate::executor::Task;
use crate::queue::TaskQueue;

/// Everything a worker needs, borrowed for the scope of the run.
#[derive(Clone, Copy)]
pub(crate) struct WorkerCtx<'a> {
    pub graph: &'a Graph,
    pub queue: &'a TaskQueue<Task>,
    pub state: &'a ExecState,
}

/// Main worker loop.
///
/// Exits on the first empty pop or as soon as the run is cancelled. Tasks
/// are requeued only before execution; once a worker starts a task it never
/// puts it back, so each (node, batch) pair executes exactly once.
pub(crate) fn worker_loop(worker_id: usize, ctx: &WorkerCtx<'_>) {
    while let Some(task) = ctx.queue.try_pop() {
        if ctx.state.is_cancelled() {
            break;
        }

        let ready = match ctx.graph.is_ready(task.node, task.batch) {
            Ok(ready) => ready,
            Err(err) => {
                ctx.state.set_first_error(err.into());
                ctx.state.cancel();
                break;
            }
        };
        if !ready {
            // Not ready yet: back to the tail, let readiness ordering decide.
            ctx.queue.push(task);
            ctx.state.requeues.fetch_add(1, Ordering::Relaxed);
            thread::yield_now();
            continue;
        }

        ctx.state.in_flight.fetch_add(1, Ordering::Relaxed);
        let outcome =
            execute_node(ctx.graph, task).and_then(|()| propagate_outputs(ctx.graph, task));
        ctx.state.in_flight.fetch_sub(1, Ordering::Relaxed);
        if let Err(err) = outcome {
            tracing::error!(
                worker_id,
                node = task.node,
                batch = task.batch,
                %err,
                "task failed; cancelling run"
            );
            ctx.state.set_first_error(err);
            ctx.state.cancel();
            break;
        }

        ctx.state.executed.fetch_add(1, Ordering::Relaxed);
        ctx.state.record_progress();
        tracing::trace!(worker_id, node = task.node, batch = task.batch, "task complete");
    }
}

fn node_ref(graph: &Graph, task: Task) -> Result<&GraphNode, RuntimeError> {
    graph.node(task.node).ok_or_else(|| {
        GraphError::NodeOutOfRange {
            id: task.node,
            len: graph.size(),
        }
        .into()
    })
}

/// Executes one (node, batch) task.
///
/// Input ports are consumed in lockstep: every port must hold the same
/// number of cells, and the body runs once per position with each port's
/// cell at that position staged in a scratch input map. Every invocation
/// appends exactly one cell per declared output port. A node with no input
/// ports runs zero times; whatever its output slots already hold (for
/// example a seeded root output) is left for propagation.
pub(crate) fn execute_node(graph: &Graph, task: Task) -> Result<(), RuntimeError> {
    let node = node_ref(graph, task)?;
    let mut ports = graph.batch_ports(task.node, task.batch)?;

    // Snapshot the input columns so output appends below cannot alias them.
    let mut positions: Option<usize> = None;
    let mut columns: Vec<(&String, MiniBatch)> = Vec::with_capacity(node.inputs().len());
    for name in node.inputs().keys() {
        let cells = ports.get(name).cloned().unwrap_or_default();
        match positions {
            None => positions = Some(cells.len()),
            Some(expected) if expected != cells.len() => {
                return Err(RuntimeError::RaggedInputs {
                    node_id: task.node,
                    batch_id: task.batch,
                });
            }
            Some(_) => {}
        }
        columns.push((name, cells));
    }
    let positions = positions.unwrap_or(0);

    let mut scratch_in = node.inputs().clone();
    let mut scratch_out = node.outputs().clone();
    for position in 0..positions {
        for (name, cells) in &columns {
            if let Some(cell) = cells.get(position) {
                scratch_in.insert((*name).clone(), cell.clone());
            }
        }
        node.invoke(&scratch_in, &mut scratch_out)
            .map_err(|source| RuntimeError::Body {
                node_id: task.node,
                batch_id: task.batch,
                source,
            })?;
        for name in node.outputs().keys() {
            if let Some(cell) = scratch_out.get(name) {
                ports.entry(name.clone()).or_default().push(cell.clone());
            }
        }
    }
    Ok(())
}

/// Copies every output mini-batch of the finished task into the matching
/// slot of each downstream neighbor, by content. Slots are created on miss;
/// downstream ports not named by this node's outputs are untouched. The
/// source is snapshotted first so no two slot locks are ever held at once.
pub(crate) fn propagate_outputs(graph: &Graph, task: Task) -> Result<(), RuntimeError> {
    let node = node_ref(graph, task)?;
    let outputs: Vec<(String, MiniBatch)> = {
        let ports = graph.batch_ports(task.node, task.batch)?;
        node.outputs()
            .keys()
            .map(|name| (name.clone(), ports.get(name).cloned().unwrap_or_default()))
            .collect()
    };

    for downstream in 0..graph.size() {
        if !graph.edge_exists(task.node, downstream) {
            continue;
        }
        let mut ports = graph.batch_ports(downstream, task.batch)?;
        for (name, cells) in &outputs {
            ports.insert(name.clone(), cells.clone());
        }
    }
    Ok(())
}
