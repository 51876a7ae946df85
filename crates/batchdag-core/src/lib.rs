//! Batchdag Core - Value types shared by the batchdag engine.
//!
//! This crate provides the data carriers every other batchdag component
//! depends on: the closed `Cell` tagged union, the ordered `MiniBatch`
//! sequence that flows along graph ports, and the errors their typed
//! accessors raise.

pub mod error;
pub mod types;

pub use error::CellError;
pub use types::{Cell, CellKind, MiniBatch};
