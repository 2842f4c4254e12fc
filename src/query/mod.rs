//! Query execution for querycsv.
//!
//! Streams each result set of a batch to a record sink as it arrives.

pub mod executor;
mod stream;

pub use executor::{ExecuteOptions, ExecutionSummary, QueryExecutor, DEFAULT_TIMEOUT};
pub use stream::stream_result_set;
