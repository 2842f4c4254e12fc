//! querycsv - run SQL batches from stdin and stream the results as CSV.
//!
//! This library exposes the core modules for use in integration tests.

pub mod app;
pub mod batch;
pub mod cli;
pub mod config;
pub mod connection;
pub mod db;
pub mod error;
pub mod logging;
pub mod output;
pub mod query;
