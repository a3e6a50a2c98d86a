//! Parameter values and typed scan targets.
//!
//! Binding and scanning both dispatch over a small closed set of kinds.
//! [`Value`] carries data into the engine; [`ScanTarget`] carries it back
//! out into caller-owned slots. Everything except blobs travels as text:
//! the engine's column affinity turns `"1"` bound into an INTEGER column
//! back into integer storage, and scanning parses the text rendering again.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A value bound to a statement parameter or read back from a column.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Binary blob, bound verbatim.
    Blob(Vec<u8>),
    /// Boolean, bound as the text literal "1" or "0".
    Bool(bool),
    /// 64-bit signed integer, bound as its text rendering.
    Integer(i64),
    /// Double-precision float, bound as its text rendering.
    Float(f64),
    /// UTF-8 text.
    Text(String),
    /// SQL NULL.
    Null,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blob(bytes) => write!(f, "x'{}'", hex::encode(bytes)),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
            Self::Null => f.write_str("NULL"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Blob(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Self::Blob(v.to_vec())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// Renders a parameter list for statement diagnostics.
///
/// Empty input renders as an empty string so an unbound statement's
/// diagnostic SQL is just the SQL text.
pub(crate) fn render_params(params: &[Value]) -> String {
    if params.is_empty() {
        return String::new();
    }
    let rendered: Vec<String> = params.iter().map(ToString::to_string).collect();
    format!("[{}]", rendered.join(", "))
}

/// Convenience macro for building parameter lists.
///
/// Usage: `params![1_i64, blob.as_slice(), "text"]`
#[macro_export]
macro_rules! params {
    ($($val:expr),* $(,)?) => {
        &[$($crate::Value::from($val)),*][..]
    };
}

/// One typed output slot for [`Statement::scan`](crate::Statement::scan).
///
/// The supported target kinds are closed at compile time; numeric targets
/// are parsed from the column's text rendering.
#[derive(Debug)]
pub enum ScanTarget<'a> {
    /// Raw column bytes, copied verbatim.
    Blob(&'a mut Vec<u8>),
    /// Raw column bytes reinterpreted as UTF-8 text.
    Text(&'a mut String),
    /// True iff the raw column bytes equal "1".
    Bool(&'a mut bool),
    /// Parsed 32-bit integer.
    Int(&'a mut i32),
    /// Parsed 64-bit integer.
    BigInt(&'a mut i64),
    /// Parsed double-precision float.
    Float(&'a mut f64),
}

impl ScanTarget<'_> {
    /// Converts one column's raw bytes into this target's slot.
    pub(crate) fn assign(&mut self, column: usize, raw: &[u8]) -> Result<()> {
        match self {
            Self::Blob(out) => **out = raw.to_vec(),
            Self::Text(out) => **out = String::from_utf8_lossy(raw).into_owned(),
            Self::Bool(out) => **out = raw == b"1",
            Self::Int(out) => **out = parse_column(column, "i32", raw)?,
            Self::BigInt(out) => **out = parse_column(column, "i64", raw)?,
            Self::Float(out) => **out = parse_column(column, "f64", raw)?,
        }
        Ok(())
    }
}

fn parse_column<T: FromStr>(column: usize, target: &'static str, raw: &[u8]) -> Result<T>
where
    T::Err: fmt::Display,
{
    let text = std::str::from_utf8(raw).map_err(|e| Error::Conversion {
        column,
        target,
        message: e.to_string(),
    })?;
    text.parse().map_err(|e: T::Err| Error::Conversion {
        column,
        target,
        message: e.to_string(),
    })
}

impl<'a> From<&'a mut Vec<u8>> for ScanTarget<'a> {
    fn from(out: &'a mut Vec<u8>) -> Self {
        Self::Blob(out)
    }
}

impl<'a> From<&'a mut String> for ScanTarget<'a> {
    fn from(out: &'a mut String) -> Self {
        Self::Text(out)
    }
}

impl<'a> From<&'a mut bool> for ScanTarget<'a> {
    fn from(out: &'a mut bool) -> Self {
        Self::Bool(out)
    }
}

impl<'a> From<&'a mut i32> for ScanTarget<'a> {
    fn from(out: &'a mut i32) -> Self {
        Self::Int(out)
    }
}

impl<'a> From<&'a mut i64> for ScanTarget<'a> {
    fn from(out: &'a mut i64) -> Self {
        Self::BigInt(out)
    }
}

impl<'a> From<&'a mut f64> for ScanTarget<'a> {
    fn from(out: &'a mut f64) -> Self {
        Self::Float(out)
    }
}

/// Convenience macro for building scan target lists.
///
/// Usage: `stmt.scan(targets![&mut id, &mut name])`
#[macro_export]
macro_rules! targets {
    ($($val:expr),* $(,)?) => {
        &mut [$($crate::ScanTarget::from($val)),*][..]
    };
}
