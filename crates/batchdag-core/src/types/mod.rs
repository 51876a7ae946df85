//! Core data types.

pub mod batch;
pub mod cell;

pub use batch::MiniBatch;
pub use cell::{Cell, CellKind};
