//! Result-set bookkeeping over a flat token stream.
//!
//! The driver interleaves column metadata and rows in one stream, so the start of the next
//! result set is only seen after the last row of the current one has been read.

use futures::{Stream, TryStreamExt};

use super::ColumnDescriptor;
use crate::error::{QueryCsvError, Result};

/// One item of the driver's response to a batch.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenItem<R> {
    /// Metadata opening a new result set.
    Columns(Vec<ColumnDescriptor>),
    /// A row of the current result set.
    Row(R),
}

/// Forward-only walk over the result sets in a token stream.
pub(crate) struct ResultSets<S> {
    stream: S,
    columns: Vec<ColumnDescriptor>,
    pending: Option<Vec<ColumnDescriptor>>,
    set_done: bool,
    finished: bool,
}

impl<S, R> ResultSets<S>
where
    S: Stream<Item = Result<TokenItem<R>>> + Unpin,
{
    /// Reads up to the first result set.
    ///
    /// A stream without metadata is a batch without tabular output: one result set with
    /// zero columns.
    pub(crate) async fn open(mut stream: S) -> Result<Self> {
        let (columns, finished) = match stream.try_next().await? {
            Some(TokenItem::Columns(columns)) => (columns, false),
            Some(TokenItem::Row(_)) => {
                return Err(QueryCsvError::execution(
                    "row received before result set metadata",
                ));
            }
            None => (Vec::new(), true),
        };

        Ok(Self {
            stream,
            columns,
            pending: None,
            set_done: finished,
            finished,
        })
    }

    pub(crate) fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Next row of the current result set, remembering where the set ends.
    pub(crate) async fn next_row(&mut self) -> Result<Option<R>> {
        if self.set_done {
            return Ok(None);
        }
        match self.stream.try_next().await? {
            Some(TokenItem::Row(row)) => Ok(Some(row)),
            Some(TokenItem::Columns(columns)) => {
                self.pending = Some(columns);
                self.set_done = true;
                Ok(None)
            }
            None => {
                self.set_done = true;
                self.finished = true;
                Ok(None)
            }
        }
    }

    /// Skips unread rows and moves to the next result set, if any.
    pub(crate) async fn next_result_set(&mut self) -> Result<bool> {
        while self.next_row().await?.is_some() {}

        match self.pending.take() {
            Some(columns) => {
                self.columns = columns;
                self.set_done = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drains the rest of the stream and returns how many rows were never read.
    pub(crate) async fn close(&mut self) -> Result<usize> {
        if self.finished {
            return Ok(0);
        }
        let mut skipped = 0;
        while let Some(item) = self.stream.try_next().await? {
            if let TokenItem::Row(_) = item {
                skipped += 1;
            }
        }
        self.set_done = true;
        self.finished = true;
        Ok(skipped)
    }
}
