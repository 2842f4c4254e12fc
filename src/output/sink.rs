//! Record sinks: where formatted CSV records end up.

use crate::error::{QueryCsvError, Result};
use std::io::Write;

/// Destination for output records, written strictly in order.
pub trait RecordSink: Send {
    /// Writes one record of already formatted fields.
    fn write_record(&mut self, fields: &[String]) -> Result<()>;

    /// Writes an empty record separating result sets.
    fn write_separator(&mut self) -> Result<()>;

    /// Pushes buffered records to the underlying stream.
    fn flush(&mut self) -> Result<()>;
}

/// RFC 4180 style CSV writer.
///
/// Fields containing the delimiter, a quote or a line break are quoted with inner quotes
/// doubled. Records may differ in width since every result set has its own columns.
///
/// Each record is encoded into a scratch buffer and copied to the stream, which leaves the
/// stream free for the raw newline that separates result sets.
pub struct CsvSink<W: Write> {
    inner: W,
    builder: csv::WriterBuilder,
    scratch: Vec<u8>,
}

impl<W: Write> CsvSink<W> {
    /// Creates a sink writing to the given stream.
    pub fn new(inner: W) -> Self {
        let mut builder = csv::WriterBuilder::new();
        builder
            .flexible(true)
            .terminator(csv::Terminator::Any(b'\n'))
            .quote_style(csv::QuoteStyle::Necessary);
        Self {
            inner,
            builder,
            scratch: Vec::new(),
        }
    }

    /// Flushes and returns the underlying stream.
    pub fn into_inner(mut self) -> Result<W> {
        self.inner
            .flush()
            .map_err(|e| QueryCsvError::sink(e.to_string()))?;
        Ok(self.inner)
    }

    fn encode(&mut self, fields: &[String]) -> Result<()> {
        self.scratch.clear();
        let mut encoder = self.builder.from_writer(&mut self.scratch);
        encoder.write_record(fields)?;
        encoder
            .flush()
            .map_err(|e| QueryCsvError::sink(e.to_string()))
    }
}

impl<W: Write + Send> RecordSink for CsvSink<W> {
    fn write_record(&mut self, fields: &[String]) -> Result<()> {
        self.encode(fields)?;
        self.inner
            .write_all(&self.scratch)
            .map_err(|e| QueryCsvError::sink(e.to_string()))
    }

    fn write_separator(&mut self) -> Result<()> {
        // csv renders a record without fields as `""`, not as an empty line.
        self.inner
            .write_all(b"\n")
            .map_err(|e| QueryCsvError::sink(e.to_string()))
    }

    fn flush(&mut self) -> Result<()> {
        self.inner
            .flush()
            .map_err(|e| QueryCsvError::sink(e.to_string()))
    }
}

/// Sink that keeps records in memory; a separator is an empty record.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemorySink {
    pub records: Vec<Vec<String>>,
    pub flushes: usize,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordSink for MemorySink {
    fn write_record(&mut self, fields: &[String]) -> Result<()> {
        self.records.push(fields.to_vec());
        Ok(())
    }

    fn write_separator(&mut self) -> Result<()> {
        self.records.push(Vec::new());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }
}
