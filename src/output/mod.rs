//! CSV projection of result sets.
//!
//! Cell formatting, header labels and the record sinks they are written to.

mod format;
mod header;
mod sink;

pub use format::{format_cell, DEFAULT_NULL_LITERAL};
pub use header::render_header;
pub use sink::{CsvSink, MemorySink, RecordSink};
