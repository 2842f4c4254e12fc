//! End-to-end CSV output tests.
//!
//! Feeds batch text through the reader, executor and CSV sink and checks the bytes that
//! would reach standard output.

use std::time::Duration;

use pretty_assertions::assert_eq;
use querycsv::app::{run_batches, RunStats};
use querycsv::batch::BatchReader;
use querycsv::db::{CellValue, ColumnDescriptor, MockDatabaseClient, MockResponse};
use querycsv::error::ServerError;
use querycsv::output::CsvSink;
use querycsv::query::ExecuteOptions;

/// Runs `input` against `client` and returns the CSV text and run stats.
async fn run(
    client: &mut MockDatabaseClient,
    input: &str,
    options: ExecuteOptions,
) -> (String, RunStats) {
    let mut sink = CsvSink::new(Vec::new());
    let stats = run_batches(BatchReader::new(input.as_bytes()), client, &options, &mut sink)
        .await
        .unwrap();
    let out = String::from_utf8(sink.into_inner().unwrap()).unwrap();
    (out, stats)
}

/// Scenario: constant SELECT
/// Given the input "SELECT 1 AS x" followed by GO
/// Then a blank line, the typed header and one data row are written
#[tokio::test]
async fn test_constant_select() {
    let mut client = MockDatabaseClient::new().with_response(MockResponse::new().result_set(
        vec![ColumnDescriptor::new("x", "INT").with_nullable(false)],
        vec![vec![CellValue::Int(1)]],
    ));

    let (out, stats) = run(&mut client, "SELECT 1 AS x\nGO\n", ExecuteOptions::default()).await;

    assert_eq!(out, "\n[x] INT NOT NULL\n1\n");
    assert_eq!(stats, RunStats { succeeded: 1, failed: 0 });
    assert_eq!(client.executed(), ["SELECT 1 AS x\r\n"]);
}

/// Scenario: batch with two result sets
/// Then each gets its own header block, separated by exactly one blank line
#[tokio::test]
async fn test_two_result_sets() {
    let mut client = MockDatabaseClient::new().with_response(
        MockResponse::new()
            .result_set(
                vec![ColumnDescriptor::new("a", "INT")],
                vec![vec![CellValue::Int(1)]],
            )
            .result_set(
                vec![
                    ColumnDescriptor::new("b", "NVARCHAR").with_length(10),
                    ColumnDescriptor::new("c", "FLOAT"),
                ],
                vec![vec![CellValue::Text("two".to_string()), CellValue::Float(2.5)]],
            ),
    );

    let (out, _) = run(
        &mut client,
        "SELECT 1 AS a\nSELECT N'two' AS b, 2.5e0 AS c\nGO\n",
        ExecuteOptions::default(),
    )
    .await;

    assert_eq!(out, "\n[a] INT\n1\n\n[b] NVARCHAR(10),[c] FLOAT\ntwo,2.5\n");
}

/// Scenario: statement without tabular output
/// Then only the separator line is written
#[tokio::test]
async fn test_update_writes_blank_line_only() {
    let mut client = MockDatabaseClient::new();

    let (out, stats) = run(
        &mut client,
        "UPDATE t SET a = 1\nGO\n",
        ExecuteOptions::default(),
    )
    .await;

    assert_eq!(out, "\n");
    assert_eq!(stats.succeeded, 1);
}

/// Scenario: NULL in a nullable VARCHAR column
/// Then the configured literal, or NULL by default, fills the field
#[tokio::test]
async fn test_null_literal() {
    let response = MockResponse::new().result_set(
        vec![
            ColumnDescriptor::new("id", "INT").with_nullable(false),
            ColumnDescriptor::new("note", "VARCHAR")
                .with_length(20)
                .with_nullable(true),
        ],
        vec![vec![CellValue::Int(7), CellValue::Null]],
    );

    let mut client = MockDatabaseClient::new().with_response(response.clone());
    let (out, _) = run(&mut client, "SELECT id, note FROM t\nGO\n", ExecuteOptions::default()).await;
    assert_eq!(out, "\n[id] INT NOT NULL,[note] VARCHAR(20) NULL\n7,NULL\n");

    let mut client = MockDatabaseClient::new().with_response(response);
    let options = ExecuteOptions {
        null_literal: "\\N".to_string(),
        ..Default::default()
    };
    let (out, _) = run(&mut client, "SELECT id, note FROM t\nGO\n", options).await;
    assert_eq!(out, "\n[id] INT NOT NULL,[note] VARCHAR(20) NULL\n7,\\N\n");
}

/// Scenario: deadline passes while rows are still arriving
/// Then rows written before the deadline stay in the output
/// And the connection is reopened so the server drops the abandoned request
/// And the next batch still runs
#[tokio::test(start_paused = true)]
async fn test_timeout_keeps_flushed_rows() {
    let rows = (1..=5).map(|i| vec![CellValue::Int(i)]).collect();
    let mut client = MockDatabaseClient::new()
        .with_response(
            MockResponse::new()
                .row_delay(Duration::from_secs(4))
                .result_set(vec![ColumnDescriptor::new("n", "INT")], rows),
        )
        .with_response(MockResponse::new().result_set(
            vec![ColumnDescriptor::new("ok", "BIT")],
            vec![vec![CellValue::Bool(true)]],
        ));
    let options = ExecuteOptions {
        timeout: Duration::from_secs(10),
        ..Default::default()
    };

    let (out, stats) = run(&mut client, "SELECT n FROM slow\nGO\nSELECT 1 AS ok\nGO\n", options).await;

    assert_eq!(out, "\n[n] INT\n1\n2\n\n[ok] BIT\n1\n");
    assert_eq!(stats, RunStats { succeeded: 1, failed: 1 });
    assert_eq!(client.reconnects(), 1);
}

/// Scenario: server error in the first batch
/// Then nothing is written for it and the second batch runs normally
#[tokio::test]
async fn test_server_error_then_success() {
    let mut client = MockDatabaseClient::new()
        .with_response(MockResponse::new().fail_on_submit(ServerError {
            code: 102,
            state: 1,
            class: 15,
            message: "Incorrect syntax near 'FORM'.".to_string(),
            ..Default::default()
        }))
        .with_response(MockResponse::new().result_set(
            vec![ColumnDescriptor::new("x", "INT")],
            vec![vec![CellValue::Int(1)]],
        ));

    let (out, stats) = run(
        &mut client,
        "SELECT * FORM t\nGO\nSELECT 1 AS x\nGO\n",
        ExecuteOptions::default(),
    )
    .await;

    assert_eq!(out, "\n[x] INT\n1\n");
    assert_eq!(stats, RunStats { succeeded: 1, failed: 1 });
}

/// Scenario: special type tags and CSV quoting
#[tokio::test]
async fn test_type_rendering_and_quoting() {
    let guid = uuid::Uuid::parse_str("6f9619ff-8b86-d011-b42d-00c04fc964ff").unwrap();
    let mut client = MockDatabaseClient::new().with_response(MockResponse::new().result_set(
        vec![
            ColumnDescriptor::new("id", "UNIQUEIDENTIFIER"),
            ColumnDescriptor::new("price", "MONEY"),
            ColumnDescriptor::new("amount", "DECIMAL").with_decimal_size(10, 2),
            ColumnDescriptor::new("active", "BIT"),
            ColumnDescriptor::new("blob", "VARBINARY").with_length(2147483645),
            ColumnDescriptor::new("say \"hi\"]", "NVARCHAR"),
        ],
        vec![vec![
            CellValue::Bytes(guid.to_bytes_le().to_vec()),
            CellValue::Bytes(b"19.9900".to_vec()),
            CellValue::Bytes(b"-3.50".to_vec()),
            CellValue::Bool(false),
            CellValue::Bytes(vec![0xca, 0xfe]),
            CellValue::Text("a, b".to_string()),
        ]],
    ));

    let (out, _) = run(&mut client, "SELECT ...\nGO\n", ExecuteOptions::default()).await;

    assert_eq!(
        out,
        "\n[id] UNIQUEIDENTIFIER,[price] MONEY,[amount] DECIMAL(10,2),[active] BIT,\
[blob] VARBINARY(max),\"[say \"\"hi\"\"]]] NVARCHAR\"\n\
6f9619ff-8b86-d011-b42d-00c04fc964ff,19.9900,-3.50,0,0xcafe,\"a, b\"\n"
    );
}

/// Scenario: malformed GUID in the second row
/// Then the first row stays in the output and the batch counts as failed
#[tokio::test]
async fn test_row_error_keeps_earlier_rows() {
    let mut client = MockDatabaseClient::new().with_response(MockResponse::new().result_set(
        vec![ColumnDescriptor::new("g", "UNIQUEIDENTIFIER")],
        vec![
            vec![CellValue::Bytes(uuid::Uuid::nil().to_bytes_le().to_vec())],
            vec![CellValue::Bytes(vec![1, 2, 3])],
        ],
    ));

    let (out, stats) = run(&mut client, "SELECT g FROM t\nGO\n", ExecuteOptions::default()).await;

    assert_eq!(out, "\n[g] UNIQUEIDENTIFIER\n00000000-0000-0000-0000-000000000000\n");
    assert_eq!(stats.failed, 1);
}
