//! Batch execution under a deadline.
//!
//! Runs one batch, walks its result sets in order and frames each one as its own CSV
//! block behind a blank separator record.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::debug;

use super::stream::stream_result_set;
use crate::db::{ColumnDescriptor, DatabaseClient, ResultCursor, Row};
use crate::error::{QueryCsvError, Result};
use crate::output::{RecordSink, DEFAULT_NULL_LITERAL};

/// Default per-batch deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Settings applied to every batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteOptions {
    /// Time allowed from submission until the last result set is closed.
    pub timeout: Duration,
    /// Literal written for SQL NULL.
    pub null_literal: String,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            null_literal: DEFAULT_NULL_LITERAL.to_string(),
        }
    }
}

/// What a successful batch produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionSummary {
    /// Result sets seen, including those without columns.
    pub result_sets: usize,
    /// Rows written for each result set that had columns.
    pub rows: Vec<u64>,
    /// Time from submission until the cursor was closed.
    pub elapsed: Duration,
}

impl ExecutionSummary {
    /// Total rows written across all result sets.
    pub fn total_rows(&self) -> u64 {
        self.rows.iter().sum()
    }
}

/// Query executor that writes batch results to a sink.
pub struct QueryExecutor<'a> {
    db: &'a mut dyn DatabaseClient,
    options: &'a ExecuteOptions,
}

impl<'a> QueryExecutor<'a> {
    /// Creates a new query executor.
    pub fn new(db: &'a mut dyn DatabaseClient, options: &'a ExecuteOptions) -> Self {
        Self { db, options }
    }

    /// Executes one batch and writes every result set it returns.
    ///
    /// A separator record precedes the first result set and sits between every two
    /// consecutive ones; result sets without columns contribute only the separator.
    /// Errors reported while closing the cursor fail the batch.
    pub async fn execute(
        &mut self,
        sql: &str,
        sink: &mut dyn RecordSink,
    ) -> Result<ExecutionSummary> {
        let budget = self.options.timeout;
        let start = Instant::now();
        let deadline = start + budget;

        debug!(bytes = sql.len(), "Submitting batch");
        let cursor = within(deadline, budget, self.db.query(sql)).await?;
        let mut cursor = DeadlineCursor {
            inner: cursor,
            deadline,
            budget,
        };
        debug!(elapsed = ?start.elapsed(), "First response received");

        let mut summary = ExecutionSummary::default();
        loop {
            sink.write_separator()?;
            summary.result_sets += 1;

            if !cursor.columns().is_empty() {
                let rows =
                    stream_result_set(&mut cursor, sink, &self.options.null_literal).await?;
                debug!(result_set = summary.result_sets, rows, "Result set written");
                summary.rows.push(rows);
            }

            if !cursor.next_result_set().await? {
                break;
            }
        }

        cursor.close().await?;
        sink.flush()?;

        summary.elapsed = start.elapsed();
        debug!(
            result_sets = summary.result_sets,
            rows = summary.total_rows(),
            elapsed = ?summary.elapsed,
            "Batch complete"
        );
        Ok(summary)
    }
}

/// Awaits a driver call, failing with a timeout once the deadline passes.
///
/// Dropping the driver future on expiry is what cancels the in-flight call.
async fn within<T>(
    deadline: Instant,
    budget: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout_at(deadline, fut)
        .await
        .map_err(|_| QueryCsvError::Timeout(budget))?
}

/// Cursor wrapper that bounds every driver call by the batch deadline.
struct DeadlineCursor<'c> {
    inner: Box<dyn ResultCursor + 'c>,
    deadline: Instant,
    budget: Duration,
}

#[async_trait]
impl<'c> ResultCursor for DeadlineCursor<'c> {
    fn columns(&self) -> &[ColumnDescriptor] {
        self.inner.columns()
    }

    async fn next_row(&mut self) -> Result<Option<Row>> {
        within(self.deadline, self.budget, self.inner.next_row()).await
    }

    async fn next_result_set(&mut self) -> Result<bool> {
        within(self.deadline, self.budget, self.inner.next_result_set()).await
    }

    async fn close(&mut self) -> Result<()> {
        within(self.deadline, self.budget, self.inner.close()).await
    }
}
