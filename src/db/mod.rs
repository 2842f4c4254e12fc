//! Database abstraction layer for querycsv.
//!
//! Provides a trait-based interface over the database driver so the CSV engine can be
//! driven by SQL Server or by the scripted mock used in tests.

mod mock;
mod mssql;
mod result_sets;
mod types;

pub use mock::{MockDatabaseClient, MockResponse};
pub use mssql::MssqlClient;
pub use types::{CellValue, ColumnDescriptor, Row};

use crate::error::Result;
use async_trait::async_trait;

/// Trait defining the interface for database clients.
///
/// A client is owned exclusively by one caller and runs one batch at a time.
#[async_trait]
pub trait DatabaseClient: Send {
    /// Checks that the server is reachable and answering.
    async fn ping(&mut self) -> Result<()>;

    /// Submits a batch and returns a cursor positioned on its first result set.
    ///
    /// A batch without tabular output still yields one result set with zero columns.
    async fn query<'a>(&'a mut self, sql: &str) -> Result<Box<dyn ResultCursor + 'a>>;

    /// Replaces the session with a fresh one, abandoning any request still running on it.
    async fn reconnect(&mut self) -> Result<()>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<()>;
}

/// Forward-only cursor over the result sets of one batch.
#[async_trait]
pub trait ResultCursor: Send {
    /// Column metadata of the current result set.
    fn columns(&self) -> &[ColumnDescriptor];

    /// Fetches the next row of the current result set, or `None` once it is exhausted.
    async fn next_row(&mut self) -> Result<Option<Row>>;

    /// Skips any unread rows and advances to the next result set.
    ///
    /// Returns false when the batch has no further result sets.
    async fn next_result_set(&mut self) -> Result<bool>;

    /// Drains whatever the server still has to say about the batch, surfacing trailing errors.
    async fn close(&mut self) -> Result<()>;
}
