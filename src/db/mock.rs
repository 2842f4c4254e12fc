//! Mock database client for testing.
//!
//! Replays scripted responses so the CSV engine can be exercised without a server.

use super::{CellValue, ColumnDescriptor, DatabaseClient, ResultCursor, Row};
use crate::error::{QueryCsvError, Result, ServerError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;

/// Scripted outcome of one submitted batch.
#[derive(Debug, Clone, Default)]
pub struct MockResponse {
    result_sets: Vec<(Vec<ColumnDescriptor>, Vec<Row>)>,
    submit_error: Option<ServerError>,
    close_error: Option<ServerError>,
    delay: Duration,
    row_delay: Duration,
}

impl MockResponse {
    /// Creates a response without tabular output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a result set.
    pub fn result_set(mut self, columns: Vec<ColumnDescriptor>, rows: Vec<Row>) -> Self {
        self.result_sets.push((columns, rows));
        self
    }

    /// Fails the submission itself with a server error.
    pub fn fail_on_submit(mut self, err: ServerError) -> Self {
        self.submit_error = Some(err);
        self
    }

    /// Reports a server error only once the cursor is closed.
    pub fn fail_on_close(mut self, err: ServerError) -> Self {
        self.close_error = Some(err);
        self
    }

    /// Waits before answering the submission.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Waits before delivering each row.
    pub fn row_delay(mut self, delay: Duration) -> Self {
        self.row_delay = delay;
        self
    }
}

/// A mock database client that returns predefined results.
#[derive(Debug, Default)]
pub struct MockDatabaseClient {
    responses: VecDeque<MockResponse>,
    executed: Vec<String>,
    ping_error: Option<String>,
    reconnect_error: Option<String>,
    reconnects: usize,
    closed: bool,
}

impl MockDatabaseClient {
    /// Creates a new mock database client with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response for the next submitted batch.
    pub fn with_response(mut self, response: MockResponse) -> Self {
        self.responses.push_back(response);
        self
    }

    /// Makes `ping` fail with the given message.
    pub fn with_ping_error(mut self, msg: impl Into<String>) -> Self {
        self.ping_error = Some(msg.into());
        self
    }

    /// Makes `reconnect` fail with the given message.
    pub fn with_reconnect_error(mut self, msg: impl Into<String>) -> Self {
        self.reconnect_error = Some(msg.into());
        self
    }

    /// Number of successful reconnects so far.
    pub fn reconnects(&self) -> usize {
        self.reconnects
    }

    /// Batches submitted so far, in order.
    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    /// Returns true once `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Fallback when nothing is scripted: SELECTs echo the batch, everything else is
    /// treated as a statement without tabular output.
    fn default_response(sql: &str) -> MockResponse {
        if sql.trim_start().to_uppercase().starts_with("SELECT") {
            MockResponse::new().result_set(
                vec![ColumnDescriptor::new("result", "NVARCHAR")],
                vec![vec![CellValue::Text(format!("Mock result for: {}", sql.trim()))]],
            )
        } else {
            MockResponse::new()
        }
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn ping(&mut self) -> Result<()> {
        match &self.ping_error {
            Some(msg) => Err(QueryCsvError::connectivity(msg.clone())),
            None => Ok(()),
        }
    }

    async fn query<'a>(&'a mut self, sql: &str) -> Result<Box<dyn ResultCursor + 'a>> {
        if self.closed {
            return Err(QueryCsvError::connectivity("Connection is closed"));
        }
        self.executed.push(sql.to_string());
        let response = self
            .responses
            .pop_front()
            .unwrap_or_else(|| Self::default_response(sql));

        if !response.delay.is_zero() {
            tokio::time::sleep(response.delay).await;
        }
        if let Some(err) = response.submit_error {
            return Err(QueryCsvError::Server(err));
        }

        let mut sets: VecDeque<_> = response.result_sets.into();
        let (columns, rows) = sets.pop_front().unwrap_or_default();
        Ok(Box::new(MockCursor {
            columns,
            rows: rows.into(),
            sets,
            row_delay: response.row_delay,
            close_error: response.close_error,
        }))
    }

    async fn reconnect(&mut self) -> Result<()> {
        if let Some(msg) = &self.reconnect_error {
            return Err(QueryCsvError::connectivity(msg.clone()));
        }
        self.reconnects += 1;
        self.closed = false;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

struct MockCursor {
    columns: Vec<ColumnDescriptor>,
    rows: VecDeque<Row>,
    sets: VecDeque<(Vec<ColumnDescriptor>, Vec<Row>)>,
    row_delay: Duration,
    close_error: Option<ServerError>,
}

#[async_trait]
impl ResultCursor for MockCursor {
    fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    async fn next_row(&mut self) -> Result<Option<Row>> {
        if self.rows.is_empty() {
            return Ok(None);
        }
        if !self.row_delay.is_zero() {
            tokio::time::sleep(self.row_delay).await;
        }
        Ok(self.rows.pop_front())
    }

    async fn next_result_set(&mut self) -> Result<bool> {
        match self.sets.pop_front() {
            Some((columns, rows)) => {
                self.columns = columns;
                self.rows = rows.into();
                Ok(true)
            }
            None => {
                self.rows.clear();
                Ok(false)
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self.close_error.take() {
            Some(err) => Err(QueryCsvError::Server(err)),
            None => Ok(()),
        }
    }
}
