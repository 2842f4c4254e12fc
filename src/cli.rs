//! Command-line argument parsing for querycsv.

use clap::Parser;
use std::path::PathBuf;

/// Run SQL batches read from stdin and write their results to stdout as CSV.
///
/// Batches are separated by lines containing only `GO`.
#[derive(Parser, Debug)]
#[command(name = "querycsv")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// SQL Server connection string (ADO.NET `server=...;user=...` or `jdbc:sqlserver://...`)
    #[arg(
        long = "cs",
        value_name = "CONNECTION_STRING",
        env = "QUERYCSV_CONNECTION_STRING",
        hide_env_values = true
    )]
    pub connection_string: Option<String>,

    /// Read the connection string from this environment variable
    #[arg(long = "csenv", value_name = "VAR")]
    pub connection_env: Option<String>,

    /// Literal written to the CSV output for SQL NULL [default: NULL]
    #[arg(long = "null", value_name = "LITERAL")]
    pub null_literal: Option<String>,

    /// Query timeout per batch, in seconds [default: 60]
    #[arg(short = 't', long = "timeout", value_name = "SECONDS")]
    pub timeout_secs: Option<u64>,

    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log debug details to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::Config::default_path)
    }
}
