//! Result set types for querycsv.
//!
//! Defines the column metadata and cell values handed over by the driver layer.

use std::fmt;

/// Metadata about a column in a result set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnDescriptor {
    /// Column name.
    pub name: String,

    /// Driver-reported type tag, e.g. `INT` or `UNIQUEIDENTIFIER`.
    pub type_name: String,

    /// Whether the column accepts NULL, if known.
    pub nullable: Option<bool>,

    /// Declared length, if applicable.
    pub length: Option<i64>,

    /// Decimal precision and scale, if applicable.
    pub decimal_size: Option<(i64, i64)>,
}

impl ColumnDescriptor {
    /// Creates a new column descriptor with the given name and type.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            ..Default::default()
        }
    }

    /// Sets the known nullability.
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    /// Sets the declared length.
    pub fn with_length(mut self, length: i64) -> Self {
        self.length = Some(length);
        self
    }

    /// Sets the decimal precision and scale.
    pub fn with_decimal_size(mut self, precision: i64, scale: i64) -> Self {
        self.decimal_size = Some((precision, scale));
        self
    }
}

/// A row of decoded cells, one per column.
pub type Row = Vec<CellValue>;

/// A single decoded value from the wire protocol.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CellValue {
    /// NULL value.
    #[default]
    Null,

    /// Boolean value.
    Bool(bool),

    /// Signed integer (up to i64).
    Int(i64),

    /// Floating point number.
    Float(f64),

    /// Binary data.
    Bytes(Vec<u8>),

    /// Text value.
    Text(String),
}

impl CellValue {
    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

/// Default textual form: integers in base 10, floats in shortest round-trip form,
/// text verbatim and bytes as lowercase hex.
impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => f.write_str("NULL"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Int(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

// Conversion implementations for common types
impl From<bool> for CellValue {
    fn from(v: bool) -> Self {
        CellValue::Bool(v)
    }
}

impl From<i32> for CellValue {
    fn from(v: i32) -> Self {
        CellValue::Int(v as i64)
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Int(v)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Float(v)
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        CellValue::Text(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::Text(v.to_string())
    }
}

impl From<Vec<u8>> for CellValue {
    fn from(v: Vec<u8>) -> Self {
        CellValue::Bytes(v)
    }
}

impl<T> From<Option<T>> for CellValue
where
    T: Into<CellValue>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => CellValue::Null,
        }
    }
}
