//! Record sink trait and output errors

use crate::extract::ExtractedRecord;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Record from {url} has no value for required column {field}")]
    IncompleteRecord { url: String, field: &'static str },
}

impl OutputError {
    /// Returns true if the output can no longer be trusted
    ///
    /// An incomplete record is rejected before anything is written, so only
    /// that record is lost.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::IncompleteRecord { .. })
    }
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Destination for extracted records
///
/// Implementations write the header when opened, then one row per record.
/// A record is either written whole or not at all.
pub trait RecordSink: Send {
    /// Writes one record as a row
    ///
    /// # Arguments
    ///
    /// * `record` - The sanitized record to write
    fn write_record(&mut self, record: &ExtractedRecord) -> OutputResult<()>;

    /// Number of data rows written so far (header excluded)
    fn rows_written(&self) -> u64;

    /// Flushes and releases the output
    fn close(&mut self) -> OutputResult<()>;
}
