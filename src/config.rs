//! Configuration management for querycsv.
//!
//! Settings come from the command line, an optional TOML file and the environment, with
//! the command line taking precedence over the file and the file over built-in defaults.

use crate::cli::Cli;
use crate::error::{QueryCsvError, Result};
use crate::output::DEFAULT_NULL_LITERAL;
use crate::query::{ExecuteOptions, DEFAULT_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Contents of the optional config file. Every key may be omitted.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Literal connection string.
    pub connection_string: Option<String>,

    /// Name of an environment variable holding the connection string.
    pub connection_env: Option<String>,

    /// Literal written for SQL NULL.
    pub null: Option<String>,

    /// Per-batch timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("querycsv")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file. A missing file yields defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| QueryCsvError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            QueryCsvError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }
}

/// Effective settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub connection_string: String,
    pub null_literal: String,
    pub timeout: Duration,
}

impl Settings {
    /// Resolves settings from the command line, the config file and the process environment.
    pub fn resolve(cli: &Cli, file: &Config) -> Result<Self> {
        Self::resolve_with(cli, file, |name| std::env::var(name).ok())
    }

    /// Resolves settings using `lookup` to read environment variables.
    pub fn resolve_with(
        cli: &Cli,
        file: &Config,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let connection_string = resolve_connection_string(
            cli.connection_string
                .as_deref()
                .or(file.connection_string.as_deref()),
            cli.connection_env
                .as_deref()
                .or(file.connection_env.as_deref()),
            cli.connection_string.is_none() && cli.connection_env.is_some(),
            &lookup,
        )?;

        let timeout = match cli.timeout_secs.or(file.timeout_secs) {
            Some(0) => return Err(QueryCsvError::config("query timeout must be at least 1 second")),
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_TIMEOUT,
        };

        let null_literal = cli
            .null_literal
            .clone()
            .or_else(|| file.null.clone())
            .unwrap_or_else(|| DEFAULT_NULL_LITERAL.to_string());

        Ok(Self {
            connection_string,
            null_literal,
            timeout,
        })
    }

    /// Options applied to every batch.
    pub fn execute_options(&self) -> ExecuteOptions {
        ExecuteOptions {
            timeout: self.timeout,
            null_literal: self.null_literal.clone(),
        }
    }
}

/// Picks the connection string: a literal wins; otherwise the named variable must be set.
///
/// An environment variable named on the command line outranks a literal from the file.
fn resolve_connection_string(
    literal: Option<&str>,
    env_name: Option<&str>,
    env_from_cli: bool,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<String> {
    let literal = literal.filter(|cs| !cs.is_empty());

    match (literal, env_name) {
        (Some(cs), _) if !env_from_cli => Ok(cs.to_string()),
        (_, Some(name)) if !name.is_empty() => lookup(name).filter(|cs| !cs.is_empty()).ok_or_else(|| {
            QueryCsvError::config(format!(
                "missing required sql connection string from environment variable '{name}' (via --csenv flag)"
            ))
        }),
        (Some(cs), _) => Ok(cs.to_string()),
        _ => Err(QueryCsvError::config(
            "missing required sql connection string via --cs or --csenv flag",
        )),
    }
}
