//! Typed value carrier for the batchdag engine.
//!
//! The `Cell` enum is the closed union of every value that may travel along
//! a graph port: signed and unsigned integers in three widths, three float
//! widths, text, and homogeneous sequences of the common element types.
//! Typed retrieval fails loudly on a variant mismatch; there are no
//! implicit conversions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CellError;

/// Discriminant of a [`Cell`], used for variant reporting and mismatch
/// diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    I32,
    I64,
    IWide,
    U32,
    U64,
    UWide,
    F32,
    F64,
    FWide,
    Text,
    SeqI32,
    SeqI64,
    SeqF32,
    SeqF64,
    SeqText,
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CellKind::I32 => "i32",
            CellKind::I64 => "i64",
            CellKind::IWide => "iwide",
            CellKind::U32 => "u32",
            CellKind::U64 => "u64",
            CellKind::UWide => "uwide",
            CellKind::F32 => "f32",
            CellKind::F64 => "f64",
            CellKind::FWide => "fwide",
            CellKind::Text => "text",
            CellKind::SeqI32 => "seq<i32>",
            CellKind::SeqI64 => "seq<i64>",
            CellKind::SeqF32 => "seq<f32>",
            CellKind::SeqF64 => "seq<f64>",
            CellKind::SeqText => "seq<text>",
        };
        f.write_str(name)
    }
}

/// A single typed value travelling along a port.
///
/// The variant list is part of the engine contract and is closed: any
/// serializer layered on top must preserve exactly these tags. `FWide`
/// keeps the extended-float tag distinct even though Rust has no native
/// extended-precision type; it is stored as `f64`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Cell {
    /// 32-bit signed integer.
    I32(i32),
    /// 64-bit signed integer.
    I64(i64),
    /// Wide signed integer.
    IWide(i128),
    /// 32-bit unsigned integer.
    U32(u32),
    /// 64-bit unsigned integer.
    U64(u64),
    /// Wide unsigned integer.
    UWide(u128),
    /// Single-precision float.
    F32(f32),
    /// Double-precision float.
    F64(f64),
    /// Extended-precision float (stored as `f64`).
    FWide(f64),
    /// Text string.
    Text(String),
    /// Sequence of 32-bit signed integers.
    SeqI32(Vec<i32>),
    /// Sequence of 64-bit signed integers.
    SeqI64(Vec<i64>),
    /// Sequence of single-precision floats.
    SeqF32(Vec<f32>),
    /// Sequence of double-precision floats.
    SeqF64(Vec<f64>),
    /// Sequence of text strings.
    SeqText(Vec<String>),
}

impl Default for Cell {
    /// The default cell used to seed freshly declared ports.
    fn default() -> Self {
        Cell::I32(0)
    }
}

impl Cell {
    /// Reports the active variant.
    pub fn kind(&self) -> CellKind {
        match self {
            Cell::I32(_) => CellKind::I32,
            Cell::I64(_) => CellKind::I64,
            Cell::IWide(_) => CellKind::IWide,
            Cell::U32(_) => CellKind::U32,
            Cell::U64(_) => CellKind::U64,
            Cell::UWide(_) => CellKind::UWide,
            Cell::F32(_) => CellKind::F32,
            Cell::F64(_) => CellKind::F64,
            Cell::FWide(_) => CellKind::FWide,
            Cell::Text(_) => CellKind::Text,
            Cell::SeqI32(_) => CellKind::SeqI32,
            Cell::SeqI64(_) => CellKind::SeqI64,
            Cell::SeqF32(_) => CellKind::SeqF32,
            Cell::SeqF64(_) => CellKind::SeqF64,
            Cell::SeqText(_) => CellKind::SeqText,
        }
    }

    fn mismatch(&self, expected: CellKind) -> CellError {
        CellError::VariantMismatch {
            expected,
            actual: self.kind(),
        }
    }

    /// Retrieves the value as an `i32`.
    ///
    /// # Errors
    ///
    /// Returns [`CellError::VariantMismatch`] when the cell holds any other
    /// variant; the same holds for every typed accessor below.
    pub fn as_i32(&self) -> Result<i32, CellError> {
        match self {
            Cell::I32(v) => Ok(*v),
            other => Err(other.mismatch(CellKind::I32)),
        }
    }

    /// Retrieves the value as an `i64`.
    pub fn as_i64(&self) -> Result<i64, CellError> {
        match self {
            Cell::I64(v) => Ok(*v),
            other => Err(other.mismatch(CellKind::I64)),
        }
    }

    /// Retrieves the value as a wide signed integer.
    pub fn as_iwide(&self) -> Result<i128, CellError> {
        match self {
            Cell::IWide(v) => Ok(*v),
            other => Err(other.mismatch(CellKind::IWide)),
        }
    }

    /// Retrieves the value as a `u32`.
    pub fn as_u32(&self) -> Result<u32, CellError> {
        match self {
            Cell::U32(v) => Ok(*v),
            other => Err(other.mismatch(CellKind::U32)),
        }
    }

    /// Retrieves the value as a `u64`.
    pub fn as_u64(&self) -> Result<u64, CellError> {
        match self {
            Cell::U64(v) => Ok(*v),
            other => Err(other.mismatch(CellKind::U64)),
        }
    }

    /// Retrieves the value as a wide unsigned integer.
    pub fn as_uwide(&self) -> Result<u128, CellError> {
        match self {
            Cell::UWide(v) => Ok(*v),
            other => Err(other.mismatch(CellKind::UWide)),
        }
    }

    /// Retrieves the value as an `f32`.
    pub fn as_f32(&self) -> Result<f32, CellError> {
        match self {
            Cell::F32(v) => Ok(*v),
            other => Err(other.mismatch(CellKind::F32)),
        }
    }

    /// Retrieves the value as an `f64`.
    pub fn as_f64(&self) -> Result<f64, CellError> {
        match self {
            Cell::F64(v) => Ok(*v),
            other => Err(other.mismatch(CellKind::F64)),
        }
    }

    /// Retrieves the value as an extended-precision float.
    pub fn as_fwide(&self) -> Result<f64, CellError> {
        match self {
            Cell::FWide(v) => Ok(*v),
            other => Err(other.mismatch(CellKind::FWide)),
        }
    }

    /// Retrieves the value as a text slice.
    pub fn as_text(&self) -> Result<&str, CellError> {
        match self {
            Cell::Text(s) => Ok(s),
            other => Err(other.mismatch(CellKind::Text)),
        }
    }

    /// Retrieves the value as a slice of `i32`.
    pub fn as_seq_i32(&self) -> Result<&[i32], CellError> {
        match self {
            Cell::SeqI32(vs) => Ok(vs),
            other => Err(other.mismatch(CellKind::SeqI32)),
        }
    }

    /// Retrieves the value as a slice of `i64`.
    pub fn as_seq_i64(&self) -> Result<&[i64], CellError> {
        match self {
            Cell::SeqI64(vs) => Ok(vs),
            other => Err(other.mismatch(CellKind::SeqI64)),
        }
    }

    /// Retrieves the value as a slice of `f32`.
    pub fn as_seq_f32(&self) -> Result<&[f32], CellError> {
        match self {
            Cell::SeqF32(vs) => Ok(vs),
            other => Err(other.mismatch(CellKind::SeqF32)),
        }
    }

    /// Retrieves the value as a slice of `f64`.
    pub fn as_seq_f64(&self) -> Result<&[f64], CellError> {
        match self {
            Cell::SeqF64(vs) => Ok(vs),
            other => Err(other.mismatch(CellKind::SeqF64)),
        }
    }

    /// Retrieves the value as a slice of text strings.
    pub fn as_seq_text(&self) -> Result<&[String], CellError> {
        match self {
            Cell::SeqText(vs) => Ok(vs),
            other => Err(other.mismatch(CellKind::SeqText)),
        }
    }
}

fn write_seq<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    write!(f, "[")?;
    let mut first = true;
    for item in items {
        if !first {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
        first = false;
    }
    write!(f, "]")
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::I32(v) => write!(f, "{v}"),
            Cell::I64(v) => write!(f, "{v}"),
            Cell::IWide(v) => write!(f, "{v}"),
            Cell::U32(v) => write!(f, "{v}"),
            Cell::U64(v) => write!(f, "{v}"),
            Cell::UWide(v) => write!(f, "{v}"),
            Cell::F32(v) => write!(f, "{v}"),
            Cell::F64(v) => write!(f, "{v}"),
            Cell::FWide(v) => write!(f, "{v}"),
            Cell::Text(s) => write!(f, "\"{s}\""),
            Cell::SeqI32(vs) => write_seq(f, vs),
            Cell::SeqI64(vs) => write_seq(f, vs),
            Cell::SeqF32(vs) => write_seq(f, vs),
            Cell::SeqF64(vs) => write_seq(f, vs),
            Cell::SeqText(vs) => {
                write!(f, "[")?;
                let mut first = true;
                for s in vs {
                    if !first {
                        write!(f, ", ")?;
                    }
                    write!(f, "\"{s}\"")?;
                    first = false;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<i32> for Cell {
    fn from(value: i32) -> Self {
        Cell::I32(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::I64(value)
    }
}

impl From<i128> for Cell {
    fn from(value: i128) -> Self {
        Cell::IWide(value)
    }
}

impl From<u32> for Cell {
    fn from(value: u32) -> Self {
        Cell::U32(value)
    }
}

impl From<u64> for Cell {
    fn from(value: u64) -> Self {
        Cell::U64(value)
    }
}

impl From<u128> for Cell {
    fn from(value: u128) -> Self {
        Cell::UWide(value)
    }
}

impl From<f32> for Cell {
    fn from(value: f32) -> Self {
        Cell::F32(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::F64(value)
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<Vec<i32>> for Cell {
    fn from(value: Vec<i32>) -> Self {
        Cell::SeqI32(value)
    }
}

impl From<Vec<i64>> for Cell {
    fn from(value: Vec<i64>) -> Self {
        Cell::SeqI64(value)
    }
}

impl From<Vec<f32>> for Cell {
    fn from(value: Vec<f32>) -> Self {
        Cell::SeqF32(value)
    }
}

impl From<Vec<f64>> for Cell {
    fn from(value: Vec<f64>) -> Self {
        Cell::SeqF64(value)
    }
}

impl From<Vec<String>> for Cell {
    fn from(value: Vec<String>) -> Self {
        Cell::SeqText(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_zero_i32() {
        let cell = Cell::default();
        assert_eq!(cell, Cell::I32(0));
        assert_eq!(cell.kind(), CellKind::I32);
    }

    #[test]
    fn test_kind_reporting() {
        assert_eq!(Cell::F64(1.5).kind(), CellKind::F64);
        assert_eq!(Cell::FWide(1.5).kind(), CellKind::FWide);
        assert_eq!(Cell::Text("x".to_string()).kind(), CellKind::Text);
        assert_eq!(Cell::SeqText(vec![]).kind(), CellKind::SeqText);
    }

    #[test]
    fn test_typed_retrieval() {
        assert_eq!(Cell::I64(7).as_i64(), Ok(7));
        assert_eq!(Cell::UWide(1u128 << 90).as_uwide(), Ok(1u128 << 90));
        assert_eq!(Cell::Text("hello".to_string()).as_text(), Ok("hello"));
        assert_eq!(
            Cell::SeqF64(vec![0.5, 1.5]).as_seq_f64(),
            Ok(&[0.5, 1.5][..])
        );
    }

    #[test]
    fn test_variant_mismatch_fails_loudly() {
        let err = Cell::F64(2.0).as_i32().unwrap_err();
        assert_eq!(
            err,
            CellError::VariantMismatch {
                expected: CellKind::I32,
                actual: CellKind::F64,
            }
        );
        assert_eq!(err.to_string(), "expected i32 cell, found f64");
    }

    #[test]
    fn test_no_implicit_width_conversion() {
        // f64 and fwide share storage but keep distinct tags.
        assert!(Cell::FWide(2.0).as_f64().is_err());
        assert!(Cell::F64(2.0).as_fwide().is_err());
        assert!(Cell::I32(1).as_i64().is_err());
    }

    #[test]
    fn test_from_impls() {
        assert_eq!(Cell::from(3i32), Cell::I32(3));
        assert_eq!(Cell::from(3.5f64), Cell::F64(3.5));
        assert_eq!(Cell::from("abc"), Cell::Text("abc".to_string()));
        assert_eq!(Cell::from(vec![1i64, 2]), Cell::SeqI64(vec![1, 2]));
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Cell::I32(4)), "4");
        assert_eq!(format!("{}", Cell::Text("hi".to_string())), "\"hi\"");
        assert_eq!(format!("{}", Cell::SeqI32(vec![1, 2, 3])), "[1, 2, 3]");
        assert_eq!(
            format!("{}", Cell::SeqText(vec!["a".to_string(), "b".to_string()])),
            "[\"a\", \"b\"]"
        );
    }

    #[test]
    fn test_kind_display_matches_contract_names() {
        assert_eq!(CellKind::IWide.to_string(), "iwide");
        assert_eq!(CellKind::FWide.to_string(), "fwide");
        assert_eq!(CellKind::SeqF32.to_string(), "seq<f32>");
    }

    #[test]
    fn test_serde_tagging() {
        let json = serde_json::to_string(&Cell::I32(7)).unwrap();
        assert_eq!(json, r#"{"type":"I32","value":7}"#);
    }

    #[test]
    fn test_serde_round_trip() {
        let cell = Cell::SeqText(vec!["a".to_string(), "b".to_string()]);
        let json = serde_json::to_string(&cell).unwrap();
        let restored: Cell = serde_json::from_str(&json).unwrap();
        assert_eq!(cell, restored);
    }
}
