//! Cell access errors.

use thiserror::Error;

use crate::types::CellKind;

/// Errors raised by typed `Cell` accessors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CellError {
    /// A typed retrieval was attempted against the wrong active variant.
    #[error("expected {expected} cell, found {actual}")]
    VariantMismatch {
        /// Variant the caller asked for.
        expected: CellKind,
        /// Variant the cell actually holds.
        actual: CellKind,
    },
}
