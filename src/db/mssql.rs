//! SQL Server database client implementation.
//!
//! Provides the `MssqlClient` struct that implements the `DatabaseClient` trait
//! for SQL Server using tiberius.

use super::result_sets::{ResultSets, TokenItem};
use crate::db::{CellValue, ColumnDescriptor, DatabaseClient, ResultCursor, Row};
use crate::error::{QueryCsvError, Result};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use tiberius::{Client, ColumnData, ColumnType, Config, FromSql, QueryItem};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, warn};

type TdsClient = Client<Compat<TcpStream>>;

/// SQL Server database client.
pub struct MssqlClient {
    config: Config,
    client: Option<TdsClient>,
}

impl MssqlClient {
    /// Opens a connection using an ADO.NET (`server=...;user=...`) or JDBC
    /// (`jdbc:sqlserver://...`) connection string.
    pub async fn connect(connection_string: &str) -> Result<Self> {
        let config = parse_connection_string(connection_string)?;
        let (config, client) = establish(config).await?;

        debug!("Successfully connected to SQL Server");
        Ok(Self {
            config,
            client: Some(client),
        })
    }

    fn client(&mut self) -> Result<&mut TdsClient> {
        self.client
            .as_mut()
            .ok_or_else(|| QueryCsvError::connectivity("Connection is closed"))
    }
}

/// Opens a session, following a gateway redirect once.
///
/// Returns the config that reached the server so a later reconnect skips the gateway.
async fn establish(config: Config) -> Result<(Config, TdsClient)> {
    match open(config.clone()).await {
        Ok(client) => Ok((config, client)),
        // Azure gateways answer the login with a redirect to the actual node.
        Err(tiberius::error::Error::Routing { host, port }) => {
            debug!("Server redirected connection to {}:{}", host, port);
            let mut config = config;
            config.host(&host);
            config.port(port);
            let client = open(config.clone()).await.map_err(map_connection_error)?;
            Ok((config, client))
        }
        Err(e) => Err(map_connection_error(e)),
    }
}

async fn open(config: Config) -> tiberius::Result<TdsClient> {
    let tcp = TcpStream::connect(config.get_addr()).await?;
    tcp.set_nodelay(true)?;
    Client::connect(config, tcp.compat_write()).await
}

fn parse_connection_string(connection_string: &str) -> Result<Config> {
    let parsed = if connection_string
        .trim_start()
        .to_ascii_lowercase()
        .starts_with("jdbc:")
    {
        Config::from_jdbc_string(connection_string)
    } else {
        Config::from_ado_string(connection_string)
    };
    parsed.map_err(|e| QueryCsvError::config(format!("Invalid connection string: {e}")))
}

fn map_connection_error(err: tiberius::error::Error) -> QueryCsvError {
    match err {
        tiberius::error::Error::Server(token) => {
            QueryCsvError::connectivity(format!("{}", crate::error::ServerError::from(token)))
        }
        other => QueryCsvError::connectivity(other.to_string()),
    }
}

#[async_trait]
impl DatabaseClient for MssqlClient {
    async fn ping(&mut self) -> Result<()> {
        self.client()?
            .simple_query("SELECT 1")
            .await
            .map_err(map_connection_error)?
            .into_results()
            .await
            .map_err(map_connection_error)?;
        Ok(())
    }

    async fn query<'a>(&'a mut self, sql: &str) -> Result<Box<dyn ResultCursor + 'a>> {
        let stream = self.client()?.simple_query(sql.to_owned()).await?;
        let tokens = stream
            .map_ok(token_item)
            .map_err(QueryCsvError::from)
            .boxed();
        let sets = ResultSets::open(tokens).await?;
        Ok(Box::new(MssqlCursor { sets }))
    }

    async fn reconnect(&mut self) -> Result<()> {
        // tiberius has no attention signal; dropping the socket is what makes the server
        // abort a request that is still running.
        self.client = None;
        let (config, client) = establish(self.config.clone()).await?;
        self.config = config;
        self.client = Some(client);
        debug!("SQL Server connection reopened");
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(client) = self.client.take() {
            client.close().await.map_err(map_connection_error)?;
            debug!("SQL Server connection closed");
        }
        Ok(())
    }
}

fn token_item(item: QueryItem) -> TokenItem<tiberius::Row> {
    match item {
        QueryItem::Metadata(meta) => {
            TokenItem::Columns(meta.columns().iter().map(describe_column).collect())
        }
        QueryItem::Row(row) => TokenItem::Row(row),
    }
}

/// Cursor over the decoded result sets of one tiberius query.
struct MssqlCursor<'a> {
    sets: ResultSets<BoxStream<'a, Result<TokenItem<tiberius::Row>>>>,
}

#[async_trait]
impl<'a> ResultCursor for MssqlCursor<'a> {
    fn columns(&self) -> &[ColumnDescriptor] {
        self.sets.columns()
    }

    async fn next_row(&mut self) -> Result<Option<Row>> {
        match self.sets.next_row().await? {
            Some(row) => decode_row(self.sets.columns(), row).map(Some),
            None => Ok(None),
        }
    }

    async fn next_result_set(&mut self) -> Result<bool> {
        self.sets.next_result_set().await
    }

    async fn close(&mut self) -> Result<()> {
        let skipped = self.sets.close().await?;
        if skipped > 0 {
            warn!("Discarded {} unread rows while closing the result cursor", skipped);
        }
        Ok(())
    }
}

/// Maps tiberius metadata onto a column descriptor.
///
/// The TDS column metadata exposed by tiberius carries no length, nullability or
/// precision, so those stay unknown.
fn describe_column(col: &tiberius::Column) -> ColumnDescriptor {
    ColumnDescriptor::new(col.name(), type_name(col.column_type()))
}

/// Returns the SQL Server type name for a TDS column type.
pub(crate) fn type_name(ty: ColumnType) -> String {
    let name = match ty {
        ColumnType::Null => "NULL",
        ColumnType::Bit | ColumnType::Bitn => "BIT",
        ColumnType::Int1 => "TINYINT",
        ColumnType::Int2 => "SMALLINT",
        ColumnType::Int4 | ColumnType::Intn => "INT",
        ColumnType::Int8 => "BIGINT",
        ColumnType::Float4 => "REAL",
        ColumnType::Float8 | ColumnType::Floatn => "FLOAT",
        ColumnType::Money => "MONEY",
        ColumnType::Money4 => "SMALLMONEY",
        ColumnType::Datetime | ColumnType::Datetimen => "DATETIME",
        ColumnType::Datetime4 => "SMALLDATETIME",
        ColumnType::Datetime2 => "DATETIME2",
        ColumnType::DatetimeOffsetn => "DATETIMEOFFSET",
        ColumnType::Daten => "DATE",
        ColumnType::Timen => "TIME",
        ColumnType::Guid => "UNIQUEIDENTIFIER",
        // The driver reports NUMERIC columns under the DECIMAL tag as well.
        ColumnType::Decimaln | ColumnType::Numericn => "DECIMAL",
        ColumnType::BigVarChar => "VARCHAR",
        ColumnType::BigChar => "CHAR",
        ColumnType::NVarchar => "NVARCHAR",
        ColumnType::NChar => "NCHAR",
        ColumnType::Text => "TEXT",
        ColumnType::NText => "NTEXT",
        ColumnType::BigVarBin => "VARBINARY",
        ColumnType::BigBinary => "BINARY",
        ColumnType::Image => "IMAGE",
        ColumnType::Xml => "XML",
        ColumnType::Udt => "UDT",
        ColumnType::SSVariant => "SQL_VARIANT",
    };
    name.to_string()
}

fn decode_row(columns: &[ColumnDescriptor], row: tiberius::Row) -> Result<Row> {
    columns
        .iter()
        .zip(row)
        .map(|(col, data)| decode_cell(&col.type_name, data))
        .collect()
}

/// Converts tiberius column data to a cell value.
///
/// GUIDs go back to their mixed-endian wire bytes, DECIMAL and MONEY to ASCII digits and
/// temporal values to text, which is the shape the CSV formatter expects from a driver.
pub(crate) fn decode_cell(type_name: &str, data: ColumnData<'static>) -> Result<CellValue> {
    let value = match data {
        ColumnData::Bit(v) => v.into(),
        ColumnData::U8(v) => v.map(i64::from).into(),
        ColumnData::I16(v) => v.map(i64::from).into(),
        ColumnData::I32(v) => v.map(i64::from).into(),
        ColumnData::I64(v) => v.into(),
        ColumnData::F32(v) => v.map(widen_f32).into(),
        // tiberius hands MONEY over as f64, exact only up to about 9e11.
        ColumnData::F64(Some(v)) if matches!(type_name, "MONEY" | "SMALLMONEY") => {
            CellValue::Bytes(format!("{v:.4}").into_bytes())
        }
        ColumnData::F64(v) => v.into(),
        ColumnData::String(v) => v.map(|s| s.into_owned()).into(),
        ColumnData::Guid(v) => v.map(|g| g.to_bytes_le().to_vec()).into(),
        ColumnData::Binary(v) => v.map(|b| b.into_owned()).into(),
        ColumnData::Numeric(v) => v
            .map(|n| numeric_text(n.value(), n.scale()).into_bytes())
            .into(),
        ColumnData::Xml(v) => v.map(|x| x.into_owned().into_string()).into(),
        data @ (ColumnData::DateTime(_)
        | ColumnData::SmallDateTime(_)
        | ColumnData::DateTime2(_)) => {
            chrono::NaiveDateTime::from_sql(&data)
                .map_err(|e| QueryCsvError::decode(e.to_string()))?
                .map(|dt| dt.to_string())
                .into()
        }
        data @ ColumnData::Date(_) => chrono::NaiveDate::from_sql(&data)
            .map_err(|e| QueryCsvError::decode(e.to_string()))?
            .map(|d| d.to_string())
            .into(),
        data @ ColumnData::Time(_) => chrono::NaiveTime::from_sql(&data)
            .map_err(|e| QueryCsvError::decode(e.to_string()))?
            .map(|t| t.to_string())
            .into(),
        data @ ColumnData::DateTimeOffset(_) => {
            chrono::DateTime::<chrono::FixedOffset>::from_sql(&data)
                .map_err(|e| QueryCsvError::decode(e.to_string()))?
                .map(|dt| dt.to_string())
                .into()
        }
    };
    Ok(value)
}

/// Renders a scaled integer as plain decimal digits, e.g. `-15` at scale 1 as `-1.5`.
fn numeric_text(value: i128, scale: u8) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let digits = value.unsigned_abs().to_string();
    let scale = usize::from(scale);
    if scale == 0 {
        return format!("{sign}{digits}");
    }

    let padded = format!("{digits:0>width$}", width = scale + 1);
    let (int_part, fraction) = padded.split_at(padded.len() - scale);
    format!("{sign}{int_part}.{fraction}")
}

/// Widens a REAL without exposing binary noise (0.1f32 stays 0.1).
fn widen_f32(v: f32) -> f64 {
    v.to_string().parse().unwrap_or(v as f64)
}
