//! Ordered, optionally named sequences of data cells.
//!
//! A `MiniBatch` is the unit of data flow on a graph port for one batch:
//! an append-only run of [`Cell`]s plus an optional name. Mini-batches are
//! values, copyable by content; two of them are equal iff their names match
//! and their cells compare equal pairwise in order.

use serde::{Deserialize, Serialize};

use crate::types::Cell;

/// An ordered, append-only sequence of [`Cell`]s with an optional name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MiniBatch {
    name: Option<String>,
    cells: Vec<Cell>,
}

impl MiniBatch {
    /// Creates an empty, unnamed mini-batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an unnamed mini-batch from a sequence of cells.
    pub fn from_cells(cells: Vec<Cell>) -> Self {
        Self { name: None, cells }
    }

    /// Creates a named mini-batch from a sequence of cells.
    pub fn with_name(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        Self {
            name: Some(name.into()),
            cells,
        }
    }

    /// Appends one cell.
    pub fn push(&mut self, cell: Cell) {
        self.cells.push(cell);
    }

    /// Reads the cell at `index`, or `None` when out of bounds.
    pub fn get(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    /// Number of cells held.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the batch holds no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Drops all cells; the name is kept.
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// The batch name, if one was set.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Sets or replaces the batch name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Iterates over the cells in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Cell> {
        self.cells.iter()
    }
}

impl FromIterator<Cell> for MiniBatch {
    fn from_iter<I: IntoIterator<Item = Cell>>(iter: I) -> Self {
        Self::from_cells(iter.into_iter().collect())
    }
}

impl From<Vec<Cell>> for MiniBatch {
    fn from(cells: Vec<Cell>) -> Self {
        Self::from_cells(cells)
    }
}

impl<'a> IntoIterator for &'a MiniBatch {
    type Item = &'a Cell;
    type IntoIter = std::slice::Iter<'a, Cell>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.iter()
    }
}
