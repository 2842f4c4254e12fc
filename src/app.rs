//! Core orchestrator for querycsv.
//!
//! Reads batches from the input, executes each one and reports per-batch failures
//! without stopping the loop.

use tokio::io::AsyncBufRead;
use tracing::{debug, error, warn};

use crate::batch::BatchReader;
use crate::connection;
use crate::db::DatabaseClient;
use crate::error::{QueryCsvError, Result};
use crate::output::RecordSink;
use crate::query::{ExecuteOptions, QueryExecutor};

/// Outcome counts for one run over the input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub succeeded: usize,
    pub failed: usize,
}

/// Executes every batch from `input` in order, writing results to `sink`.
///
/// The sink is flushed after each batch, successful or not, so partial output up to a
/// failure stays visible. Batch failures are reported and the next batch still runs.
/// A timed-out batch may still be running on the server, so the connection is reopened
/// before the next one. Input read failures and a failed reopen end the loop early.
pub async fn run_batches<R>(
    mut input: BatchReader<R>,
    db: &mut dyn DatabaseClient,
    options: &ExecuteOptions,
    sink: &mut dyn RecordSink,
) -> Result<RunStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = RunStats::default();

    while let Some(batch) = input.next_batch().await? {
        let result = QueryExecutor::new(db, options).execute(&batch, sink).await;
        let outcome = match (result, sink.flush()) {
            (Ok(summary), Ok(())) => Ok(summary),
            (Err(e), _) | (Ok(_), Err(e)) => Err(e),
        };

        match outcome {
            Ok(summary) => {
                stats.succeeded += 1;
                debug!(
                    rows = summary.total_rows(),
                    elapsed = ?summary.elapsed,
                    "Batch {} succeeded",
                    stats.succeeded + stats.failed
                );
            }
            Err(e) => {
                stats.failed += 1;
                report_batch_error(&e);
                if matches!(e, QueryCsvError::Timeout(_)) {
                    warn!("Reopening the connection to abandon the timed-out batch");
                    connection::reopen(db).await?;
                }
            }
        }
    }

    Ok(stats)
}

/// Reports a batch failure on stderr, with structured detail for server errors.
pub fn report_batch_error(err: &QueryCsvError) {
    match err {
        QueryCsvError::Server(server) => error!(
            number = server.code,
            state = server.state,
            class = server.class,
            server = %server.server,
            procedure = %server.procedure,
            line = server.line,
            "{}: {}",
            err.category(),
            server.message
        ),
        _ => error!("{}: {}", err.category(), err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{CellValue, ColumnDescriptor, MockDatabaseClient, MockResponse};
    use crate::error::ServerError;
    use crate::output::MemorySink;

    #[tokio::test]
    async fn test_failed_batch_does_not_stop_the_loop() {
        let mut client = MockDatabaseClient::new()
            .with_response(MockResponse::new().fail_on_submit(ServerError {
                code: 208,
                message: "Invalid object name 'missing'.".to_string(),
                ..Default::default()
            }))
            .with_response(MockResponse::new().result_set(
                vec![ColumnDescriptor::new("x", "INT")],
                vec![vec![CellValue::Int(1)]],
            ));
        let input = BatchReader::new("SELECT * FROM missing\nGO\nSELECT 1 AS x\nGO\n".as_bytes());
        let mut sink = MemorySink::new();

        let stats = run_batches(input, &mut client, &ExecuteOptions::default(), &mut sink)
            .await
            .unwrap();

        assert_eq!(stats, RunStats { succeeded: 1, failed: 1 });
        assert_eq!(sink.records.len(), 3);
        assert_eq!(
            client.executed(),
            ["SELECT * FROM missing\r\n", "SELECT 1 AS x\r\n"]
        );
    }

    #[tokio::test]
    async fn test_sink_flushed_after_every_batch() {
        let mut client = MockDatabaseClient::new().with_response(
            MockResponse::new().fail_on_submit(ServerError::default()),
        );
        let input = BatchReader::new("bad\nGO\nUPDATE t SET a = 1\nGO\n".as_bytes());
        let mut sink = MemorySink::new();

        run_batches(input, &mut client, &ExecuteOptions::default(), &mut sink)
            .await
            .unwrap();

        // One flush per batch from the loop plus the executor's own on success.
        assert_eq!(sink.flushes, 3);
    }

    #[tokio::test]
    async fn test_trailing_batch_is_not_executed() {
        let mut client = MockDatabaseClient::new();
        let input = BatchReader::new("SELECT 1\nGO\nSELECT 2\n".as_bytes());
        let mut sink = MemorySink::new();

        let stats = run_batches(input, &mut client, &ExecuteOptions::default(), &mut sink)
            .await
            .unwrap();

        assert_eq!(stats.succeeded, 1);
        assert_eq!(client.executed(), ["SELECT 1\r\n"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_reopens_connection_before_next_batch() {
        let mut client = MockDatabaseClient::new()
            .with_response(
                MockResponse::new()
                    .delay(std::time::Duration::from_secs(120))
                    .result_set(vec![ColumnDescriptor::new("x", "INT")], vec![]),
            )
            .with_response(MockResponse::new().result_set(
                vec![ColumnDescriptor::new("y", "INT")],
                vec![vec![CellValue::Int(2)]],
            ));
        let input = BatchReader::new("WAITFOR DELAY '00:02'\nGO\nSELECT 2 AS y\nGO\n".as_bytes());
        let mut sink = MemorySink::new();

        let stats = run_batches(input, &mut client, &ExecuteOptions::default(), &mut sink)
            .await
            .unwrap();

        assert_eq!(stats, RunStats { succeeded: 1, failed: 1 });
        assert_eq!(client.reconnects(), 1);
        assert_eq!(sink.records.len(), 3);
    }

    #[tokio::test]
    async fn test_other_failures_keep_the_connection() {
        let mut client = MockDatabaseClient::new()
            .with_response(MockResponse::new().fail_on_submit(ServerError::default()));
        let input = BatchReader::new("bad\nGO\n".as_bytes());
        let mut sink = MemorySink::new();

        run_batches(input, &mut client, &ExecuteOptions::default(), &mut sink)
            .await
            .unwrap();

        assert_eq!(client.reconnects(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_reopen_ends_the_run() {
        let mut client = MockDatabaseClient::new()
            .with_reconnect_error("connection refused")
            .with_response(MockResponse::new().delay(std::time::Duration::from_secs(120)));
        let input = BatchReader::new("WAITFOR DELAY '00:02'\nGO\nSELECT 1\nGO\n".as_bytes());
        let mut sink = MemorySink::new();

        let err = run_batches(input, &mut client, &ExecuteOptions::default(), &mut sink)
            .await
            .unwrap_err();

        assert!(err.is_fatal());
        assert_eq!(client.executed(), ["WAITFOR DELAY '00:02'\r\n"]);
    }
}
