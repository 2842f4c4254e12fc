//! Live SQL Server tests.
//!
//! Skipped unless QUERYCSV_TEST_CONNECTION holds a connection string.

use pretty_assertions::assert_eq;
use querycsv::connection::ConnectionManager;
use querycsv::error::QueryCsvError;
use querycsv::output::CsvSink;
use querycsv::query::{ExecuteOptions, QueryExecutor};

/// Helper to get the test connection string from the environment.
fn get_test_connection_string() -> Option<String> {
    std::env::var("QUERYCSV_TEST_CONNECTION").ok()
}

/// Helper to open a verified connection.
async fn get_test_connection() -> Option<ConnectionManager> {
    let cs = get_test_connection_string()?;
    ConnectionManager::open(&cs).await.ok()
}

async fn execute(connection: &mut ConnectionManager, sql: &str) -> (Result<(), QueryCsvError>, String) {
    let options = ExecuteOptions::default();
    let mut sink = CsvSink::new(Vec::new());
    let result = QueryExecutor::new(connection.db(), &options)
        .execute(sql, &mut sink)
        .await
        .map(|_| ());
    let out = String::from_utf8(sink.into_inner().unwrap()).unwrap();
    (result, out)
}

#[tokio::test]
async fn test_live_constant_select() {
    let Some(mut connection) = get_test_connection().await else {
        eprintln!("Skipping test: QUERYCSV_TEST_CONNECTION not set");
        return;
    };

    let (result, out) = execute(&mut connection, "SELECT 1 AS x\r\n").await;

    result.unwrap();
    assert_eq!(out, "\n[x] INT\n1\n");
    connection.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_live_multiple_result_sets() {
    let Some(mut connection) = get_test_connection().await else {
        eprintln!("Skipping test: QUERYCSV_TEST_CONNECTION not set");
        return;
    };

    let (result, out) = execute(
        &mut connection,
        "SELECT CAST(1 AS BIT) AS a\r\nSELECT CAST(NULL AS VARCHAR(5)) AS b\r\n",
    )
    .await;

    result.unwrap();
    assert_eq!(out, "\n[a] BIT\n1\n\n[b] VARCHAR\nNULL\n");
    connection.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_live_guid_and_money() {
    let Some(mut connection) = get_test_connection().await else {
        eprintln!("Skipping test: QUERYCSV_TEST_CONNECTION not set");
        return;
    };

    let (result, out) = execute(
        &mut connection,
        "SELECT CAST('6F9619FF-8B86-D011-B42D-00C04FC964FF' AS UNIQUEIDENTIFIER) AS g, \
         CAST(12.5 AS MONEY) AS m\r\n",
    )
    .await;

    result.unwrap();
    assert_eq!(
        out,
        "\n[g] UNIQUEIDENTIFIER,[m] MONEY\n6f9619ff-8b86-d011-b42d-00c04fc964ff,12.5000\n"
    );
    connection.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_live_server_error_is_structured() {
    let Some(mut connection) = get_test_connection().await else {
        eprintln!("Skipping test: QUERYCSV_TEST_CONNECTION not set");
        return;
    };

    let (result, _) = execute(&mut connection, "SELECT * FROM no_such_table_querycsv\r\n").await;

    match result.unwrap_err() {
        QueryCsvError::Server(err) => assert_eq!(err.code, 208),
        other => panic!("expected server error, got {other:?}"),
    }
    connection.shutdown().await.unwrap();
}
