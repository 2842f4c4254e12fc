//! Splits statement text into batches on `GO` lines.

use crate::error::{QueryCsvError, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::debug;

/// Line terminator used when reassembling a batch.
const LINE_ENDING: &str = "\r\n";

/// Reads batches from a line-oriented input.
///
/// Lines accumulate until one whose trimmed content is `GO` (any case); the accumulated
/// text is then returned as one batch with every line terminated by CRLF. Text left over
/// at end of input without a closing `GO` is never returned.
pub struct BatchReader<R> {
    lines: Lines<R>,
    buffer: String,
}

impl<R: AsyncBufRead + Unpin> BatchReader<R> {
    /// Creates a batch reader over the given input.
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            buffer: String::new(),
        }
    }

    /// Returns the next complete batch, or `None` at end of input.
    pub async fn next_batch(&mut self) -> Result<Option<String>> {
        while let Some(line) = self
            .lines
            .next_line()
            .await
            .map_err(|e| QueryCsvError::input(e.to_string()))?
        {
            if is_batch_terminator(&line) {
                return Ok(Some(std::mem::take(&mut self.buffer)));
            }
            self.buffer.push_str(&line);
            self.buffer.push_str(LINE_ENDING);
        }

        if !self.buffer.is_empty() {
            debug!(
                bytes = self.buffer.len(),
                "Discarding trailing statement text without a closing GO"
            );
            self.buffer.clear();
        }
        Ok(None)
    }
}

fn is_batch_terminator(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("GO")
}
