//! Graph node representation.
//!
//! A node carries a compute-placement tag, its declared input and output
//! ports, and up to one processing body per placement. Nodes are value
//! entities at registration time; the graph takes ownership when they are
//! added.

use std::collections::BTreeMap;
use std::fmt;

use batchdag_core::{Cell, CellError};
use thiserror::Error;

use crate::GraphError;

/// Where a node's body runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placement {
    /// The body runs on the host CPU.
    Cpu,
    /// The body offloads to an accelerator device. The engine only requires
    /// that outputs are populated by the time the body returns.
    Device,
}

/// Port-name to cell mapping. The ordered map gives deterministic
/// (ascending-name) port traversal.
pub type PortMap = BTreeMap<String, Cell>;

/// Error returned by a node body.
#[derive(Debug, Error)]
pub enum BodyError {
    /// A typed cell retrieval failed inside the body.
    #[error(transparent)]
    Cell(#[from] CellError),

    /// Any other body-specific failure.
    #[error("node body failed: {0}")]
    Custom(String),
}

/// A node's processing body: reads the input map, writes the output map.
pub type NodeBody = Box<dyn Fn(&PortMap, &mut PortMap) -> Result<(), BodyError> + Send + Sync>;

/// A computation node: placement tag, declared ports, and optional bodies.
///
/// Port names must be unique across the combined input and output set; the
/// executor addresses both through one per-(node, batch) port store.
pub struct GraphNode {
    placement: Placement,
    inputs: PortMap,
    outputs: PortMap,
    cpu_body: Option<NodeBody>,
    device_body: Option<NodeBody>,
}

impl GraphNode {
    /// Creates a node with no ports and no bodies.
    pub fn new(placement: Placement) -> Self {
        Self {
            placement,
            inputs: PortMap::new(),
            outputs: PortMap::new(),
            cpu_body: None,
            device_body: None,
        }
    }

    /// Creates a node and registers `body` under the given placement tag.
    pub fn with_body<F>(placement: Placement, body: F) -> Self
    where
        F: Fn(&PortMap, &mut PortMap) -> Result<(), BodyError> + Send + Sync + 'static,
    {
        let mut node = Self::new(placement);
        match placement {
            Placement::Cpu => node.cpu_body = Some(Box::new(body)),
            Placement::Device => node.device_body = Some(Box::new(body)),
        }
        node
    }

    /// Registers the CPU body.
    pub fn set_cpu_body<F>(&mut self, body: F)
    where
        F: Fn(&PortMap, &mut PortMap) -> Result<(), BodyError> + Send + Sync + 'static,
    {
        self.cpu_body = Some(Box::new(body));
    }

    /// Registers the device-offload body.
    pub fn set_device_body<F>(&mut self, body: F)
    where
        F: Fn(&PortMap, &mut PortMap) -> Result<(), BodyError> + Send + Sync + 'static,
    {
        self.device_body = Some(Box::new(body));
    }

    /// The node's compute placement.
    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// Declares an input port, seeding its slot with `default`.
    pub fn add_input(&mut self, name: impl Into<String>, default: Cell) {
        self.inputs.insert(name.into(), default);
    }

    /// Declares an output port, seeding its slot with `default`.
    pub fn add_output(&mut self, name: impl Into<String>, default: Cell) {
        self.outputs.insert(name.into(), default);
    }

    /// Replaces the cell in a declared input slot.
    ///
    /// # Errors
    ///
    /// [`GraphError::PortMissing`] when no input port with that name was
    /// declared.
    pub fn set_input(&mut self, name: &str, cell: Cell) -> Result<(), GraphError> {
        match self.inputs.get_mut(name) {
            Some(slot) => {
                *slot = cell;
                Ok(())
            }
            None => Err(GraphError::PortMissing {
                port: name.to_string(),
            }),
        }
    }

    /// Replaces the cell in a declared output slot.
    pub fn set_output(&mut self, name: &str, cell: Cell) -> Result<(), GraphError> {
        match self.outputs.get_mut(name) {
            Some(slot) => {
                *slot = cell;
                Ok(())
            }
            None => Err(GraphError::PortMissing {
                port: name.to_string(),
            }),
        }
    }

    /// Reads a declared input slot.
    pub fn get_input(&self, name: &str) -> Result<&Cell, GraphError> {
        self.inputs.get(name).ok_or_else(|| GraphError::PortMissing {
            port: name.to_string(),
        })
    }

    /// Reads a declared output slot.
    pub fn get_output(&self, name: &str) -> Result<&Cell, GraphError> {
        self.outputs.get(name).ok_or_else(|| GraphError::PortMissing {
            port: name.to_string(),
        })
    }

    /// Read-only view of the input port map.
    pub fn inputs(&self) -> &PortMap {
        &self.inputs
    }

    /// Read-only view of the output port map.
    pub fn outputs(&self) -> &PortMap {
        &self.outputs
    }

    /// Runs the body registered for the node's placement against the node's
    /// own port maps. A node without a matching body is a no-op.
    pub fn execute(&mut self) -> Result<(), BodyError> {
        let Self {
            placement,
            inputs,
            outputs,
            cpu_body,
            device_body,
        } = self;
        let body = match placement {
            Placement::Cpu => cpu_body.as_ref(),
            Placement::Device => device_body.as_ref(),
        };
        match body {
            Some(body) => body(inputs, outputs),
            None => Ok(()),
        }
    }

    /// Runs the placement body against caller-owned port maps.
    ///
    /// This is the executor's path: scratch copies of the port maps let the
    /// same node execute concurrently for different batches without
    /// aliasing its own slots.
    pub fn invoke(&self, inputs: &PortMap, outputs: &mut PortMap) -> Result<(), BodyError> {
        let body = match self.placement {
            Placement::Cpu => self.cpu_body.as_ref(),
            Placement::Device => self.device_body.as_ref(),
        };
        match body {
            Some(body) => body(inputs, outputs),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphNode")
            .field("placement", &self.placement)
            .field("inputs", &self.inputs.keys().collect::<Vec<_>>())
            .field("outputs", &self.outputs.keys().collect::<Vec<_>>())
            .field("cpu_body", &self.cpu_body.is_some())
            .field("device_body", &self.device_body.is_some())
            .finish()
    }
}
