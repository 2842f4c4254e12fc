//! Cell formatting rules.
//!
//! Maps a decoded cell and the declared column type onto the text written to one CSV field.

use crate::db::{CellValue, ColumnDescriptor};
use crate::error::{QueryCsvError, Result};
use uuid::Uuid;

/// Default literal substituted for SQL NULL.
pub const DEFAULT_NULL_LITERAL: &str = "NULL";

/// Formats one cell for output.
///
/// Rules apply in order: NULL, then the UNIQUEIDENTIFIER, DECIMAL/MONEY and BIT type
/// tags, then raw bytes as `0x`-prefixed hex, then the value's default text form.
/// Only a malformed UNIQUEIDENTIFIER fails.
pub fn format_cell(col: &ColumnDescriptor, value: &CellValue, null_literal: &str) -> Result<String> {
    if value.is_null() {
        return Ok(null_literal.to_string());
    }

    match col.type_name.as_str() {
        "UNIQUEIDENTIFIER" => format_guid(value),
        // DECIMAL shares the MONEY rendering: both arrive as ASCII digits from the driver.
        "DECIMAL" | "MONEY" => Ok(match value {
            CellValue::Bytes(digits) => String::from_utf8_lossy(digits).into_owned(),
            other => other.to_string(),
        }),
        "BIT" => Ok(match value {
            CellValue::Bool(true) => "1".to_string(),
            CellValue::Bool(false) => "0".to_string(),
            other => other.to_string(),
        }),
        _ => Ok(value.to_string()),
    }
}

/// Decodes a GUID from its mixed-endian wire layout into the canonical lowercase form.
fn format_guid(value: &CellValue) -> Result<String> {
    match value {
        CellValue::Bytes(bytes) => Uuid::from_slice_le(bytes)
            .map(|guid| guid.hyphenated().to_string())
            .map_err(|e| QueryCsvError::MalformedIdentifier(e.to_string())),
        other => Err(QueryCsvError::MalformedIdentifier(format!(
            "expected 16 bytes, got {other:?}"
        ))),
    }
}
