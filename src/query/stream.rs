//! Streams one result set into a record sink.

use crate::db::ResultCursor;
use crate::error::{QueryCsvError, Result};
use crate::output::{format_cell, render_header, RecordSink};

/// Writes the header and every row of the cursor's current result set.
///
/// Rows go to the sink as soon as they are decoded, so memory stays proportional to the
/// column count. A failing row aborts the result set with its 1-based index; rows already
/// written stay written. Returns the number of rows written.
pub async fn stream_result_set(
    cursor: &mut dyn ResultCursor,
    sink: &mut dyn RecordSink,
    null_literal: &str,
) -> Result<u64> {
    let columns = cursor.columns().to_vec();
    sink.write_record(&render_header(&columns))?;

    let mut formatted = vec![String::new(); columns.len()];
    let mut row_count: u64 = 0;

    loop {
        let row_number = row_count + 1;
        let row = match cursor.next_row().await {
            Ok(Some(row)) => row,
            Ok(None) => break,
            Err(e) if e.is_execution() => return Err(e),
            Err(e) => return Err(e.in_row(row_number)),
        };

        if row.len() != columns.len() {
            return Err(QueryCsvError::decode(format!(
                "expected {} cells, got {}",
                columns.len(),
                row.len()
            ))
            .in_row(row_number));
        }

        for ((field, col), value) in formatted.iter_mut().zip(&columns).zip(&row) {
            *field = format_cell(col, value, null_literal).map_err(|e| e.in_row(row_number))?;
        }

        sink.write_record(&formatted)?;
        row_count = row_number;
    }

    Ok(row_count)
}
