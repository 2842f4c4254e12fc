//! Integration tests for querycsv.

pub mod csv_output_test;
pub mod live_test;
