//! Connection management for querycsv.
//!
//! Centralizes the connection lifecycle.

pub mod manager;

pub use manager::{reopen, ConnectionManager, CONNECT_TIMEOUT};
