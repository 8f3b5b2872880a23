//! Storage for user-submitted text
//!
//! A create-and-list store: each submission pairs a short plain text with an
//! uploaded file. Files are written under `requests/` in the upload directory
//! and the database keeps their relative path.

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteSubmissionStore;
pub use traits::{FieldError, SubmissionError, SubmissionResult, SubmissionStore};

use crate::config::SubmissionsConfig;
use serde::Serialize;

/// Maximum length of `plain_text`, in characters
pub const PLAIN_TEXT_MAX_CHARS: usize = 3000;

/// Directory, relative to the upload root, that holds uploaded files
pub const UPLOAD_SUBDIR: &str = "requests";

/// An uploaded file
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content: Vec<u8>,
}

/// Input to `SubmissionStore::create`
#[derive(Debug, Clone, Default)]
pub struct SubmissionRequest {
    pub plain_text: Option<String>,
    pub text_file: Option<UploadedFile>,
}

/// A stored submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
    pub id: i64,
    pub plain_text: String,

    /// Path of the stored file relative to the upload directory
    pub text_file: String,

    pub created_at: String,
}

/// Listing representation of a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionView {
    pub user_plain_text: String,
    pub user_file_text: String,
}

impl From<Submission> for SubmissionView {
    fn from(submission: Submission) -> Self {
        Self {
            user_plain_text: submission.plain_text,
            user_file_text: submission.text_file,
        }
    }
}

/// Checks a request, returning every field problem found
pub fn validate_request(request: &SubmissionRequest) -> Vec<FieldError> {
    let mut errors = Vec::new();

    match &request.plain_text {
        None => errors.push(FieldError::new("plain_text", "This field is required.")),
        Some(text) if text.trim().is_empty() => {
            errors.push(FieldError::new("plain_text", "This field may not be blank."))
        }
        Some(text) if text.chars().count() > PLAIN_TEXT_MAX_CHARS => {
            errors.push(FieldError::new(
                "plain_text",
                format!(
                    "Ensure this field has no more than {} characters.",
                    PLAIN_TEXT_MAX_CHARS
                ),
            ))
        }
        Some(_) => {}
    }

    match &request.text_file {
        None => errors.push(FieldError::new("text_file", "No file was submitted.")),
        Some(file) if stored_name(&file.filename).is_none() => errors.push(FieldError::new(
            "text_file",
            "The submitted file has no file name.",
        )),
        Some(file) if file.content.is_empty() => {
            errors.push(FieldError::new("text_file", "The submitted file is empty."))
        }
        Some(_) => {}
    }

    errors
}

/// Final path component of an uploaded file name, if it has one
pub(crate) fn stored_name(filename: &str) -> Option<&str> {
    filename
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
}

/// Opens the store described by the `[submissions]` section
pub fn open_store(config: &SubmissionsConfig) -> SubmissionResult<SqliteSubmissionStore> {
    SqliteSubmissionStore::new(&config.database_path, &config.upload_dir)
}
