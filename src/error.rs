//! Error types for querycsv.
//!
//! Defines the main error enum used throughout the application.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Main error type for querycsv operations.
#[derive(Error, Debug)]
pub enum QueryCsvError {
    /// Missing or invalid configuration (no connection string, bad config file, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Opening or pinging the database failed.
    #[error("Connection error: {0}")]
    Connectivity(String),

    /// Reading statement text from the input stream failed.
    #[error("Input error: {0}")]
    InputRead(String),

    /// Query submission or result iteration failed.
    #[error("Execution error: {0}")]
    Execution(String),

    /// Error reported by the server itself (syntax errors, constraint violations, etc.)
    #[error("Server error: {0}")]
    Server(ServerError),

    /// The batch did not finish before its deadline.
    #[error("Query timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),

    /// Decoding or formatting a specific row failed.
    #[error("error in row {row}: {source}")]
    Row {
        /// 1-based index of the failing row within its result set.
        row: u64,
        #[source]
        source: Box<QueryCsvError>,
    },

    /// A cell could not be decoded from its wire representation.
    #[error("decode error: {0}")]
    Decode(String),

    /// A UNIQUEIDENTIFIER value could not be decoded.
    #[error("malformed uniqueidentifier: {0}")]
    MalformedIdentifier(String),

    /// Writing to the output stream failed.
    #[error("Output error: {0}")]
    SinkWrite(String),
}

impl QueryCsvError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a connectivity error with the given message.
    pub fn connectivity(msg: impl Into<String>) -> Self {
        Self::Connectivity(msg.into())
    }

    /// Creates an input error with the given message.
    pub fn input(msg: impl Into<String>) -> Self {
        Self::InputRead(msg.into())
    }

    /// Creates an execution error with the given message.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Creates a decode error with the given message.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Creates a sink error with the given message.
    pub fn sink(msg: impl Into<String>) -> Self {
        Self::SinkWrite(msg.into())
    }

    /// Wraps an error with the 1-based row index it occurred at.
    pub fn in_row(self, row: u64) -> Self {
        Self::Row {
            row,
            source: Box::new(self),
        }
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "Configuration Error",
            Self::Connectivity(_) => "Connection Error",
            Self::InputRead(_) => "Input Error",
            Self::Execution(_) => "Execution Error",
            Self::Server(_) => "Server Error",
            Self::Timeout(_) => "Query Timeout",
            Self::Row { .. } => "Row Error",
            Self::Decode(_) | Self::MalformedIdentifier(_) => "Row Error",
            Self::SinkWrite(_) => "Output Error",
        }
    }

    /// Returns true for errors that terminate the process instead of the current batch.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::Connectivity(_) | Self::InputRead(_)
        )
    }

    /// Returns true for query submission and iteration failures, timeouts included.
    pub fn is_execution(&self) -> bool {
        matches!(
            self,
            Self::Execution(_) | Self::Server(_) | Self::Timeout(_)
        )
    }
}

/// Structured error reported by the database server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerError {
    pub code: u32,
    pub state: u8,
    pub class: u8,
    pub message: String,
    pub server: String,
    pub procedure: String,
    pub line: u32,
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (number: {}, state: {}, class: {}",
            self.message, self.code, self.state, self.class
        )?;
        if !self.server.is_empty() {
            write!(f, ", server: {}", self.server)?;
        }
        if !self.procedure.is_empty() {
            write!(f, ", procedure: {}", self.procedure)?;
        }
        write!(f, ", line: {})", self.line)
    }
}

impl From<tiberius::error::TokenError> for ServerError {
    fn from(err: tiberius::error::TokenError) -> Self {
        Self {
            code: err.code(),
            state: err.state(),
            class: err.class(),
            message: err.message().to_string(),
            server: err.server().to_string(),
            procedure: err.procedure().to_string(),
            line: err.line(),
        }
    }
}

impl From<tiberius::error::Error> for QueryCsvError {
    fn from(err: tiberius::error::Error) -> Self {
        match err {
            tiberius::error::Error::Server(token) => Self::Server(token.into()),
            other => Self::Execution(other.to_string()),
        }
    }
}

impl From<csv::Error> for QueryCsvError {
    fn from(err: csv::Error) -> Self {
        Self::SinkWrite(err.to_string())
    }
}

/// Result type alias using QueryCsvError.
pub type Result<T> = std::result::Result<T, QueryCsvError>;
