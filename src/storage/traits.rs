//! Submission store trait and error types

use crate::storage::{Submission, SubmissionRequest, SubmissionView};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// A validation problem with one request field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Errors that can occur during submission operations
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("Invalid submission: {}", join_errors(.0))]
    Validation(Vec<FieldError>),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn join_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for submission operations
pub type SubmissionResult<T> = Result<T, SubmissionError>;

/// Create-and-list store for user submissions
pub trait SubmissionStore {
    /// Validates and stores a submission
    ///
    /// # Arguments
    ///
    /// * `request` - Plain text and uploaded file
    ///
    /// # Returns
    ///
    /// * `Ok(Submission)` - The stored representation
    /// * `Err(SubmissionError::Validation)` - Field errors; nothing was stored
    fn create(&mut self, request: SubmissionRequest) -> SubmissionResult<Submission>;

    /// Returns every stored submission, oldest first
    fn list(&self) -> SubmissionResult<Vec<SubmissionView>>;
}
