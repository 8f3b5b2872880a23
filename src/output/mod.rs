//! Output module for extracted records and run reporting
//!
//! This module handles:
//! - Writing records to a delimited text file
//! - Collecting and printing run statistics

mod csv_sink;
pub mod stats;
mod traits;

pub use csv_sink::CsvSink;
pub use stats::{print_statistics, RunStats};
pub use traits::{OutputError, OutputResult, RecordSink};
