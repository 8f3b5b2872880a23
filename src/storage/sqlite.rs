//! SQLite submission store
//!
//! Rows live in SQLite; uploaded files are written to disk under
//! `<upload-dir>/requests/`. A name that is already taken gets a numeric
//! suffix (`note_1.txt`) so earlier uploads are never overwritten.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{SubmissionError, SubmissionResult, SubmissionStore};
use crate::storage::{
    stored_name, validate_request, Submission, SubmissionRequest, SubmissionView, UPLOAD_SUBDIR,
};
use chrono::Utc;
use rusqlite::{params, Connection};
use std::fs;
use std::path::{Path, PathBuf};

/// SQLite-backed submission store
pub struct SqliteSubmissionStore {
    conn: Connection,
    upload_dir: PathBuf,
}

impl SqliteSubmissionStore {
    /// Opens (or creates) the database and upload directory
    ///
    /// # Arguments
    ///
    /// * `database_path` - Path to the SQLite database file
    /// * `upload_dir` - Root directory for uploaded files
    pub fn new(
        database_path: impl AsRef<Path>,
        upload_dir: impl AsRef<Path>,
    ) -> SubmissionResult<Self> {
        let conn = Connection::open(database_path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;
        initialize_schema(&conn)?;

        Ok(Self {
            conn,
            upload_dir: upload_dir.as_ref().to_path_buf(),
        })
    }

    /// Creates a store with an in-memory database
    pub fn new_in_memory(upload_dir: impl AsRef<Path>) -> SubmissionResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn,
            upload_dir: upload_dir.as_ref().to_path_buf(),
        })
    }

    /// Number of stored submissions
    pub fn count(&self) -> SubmissionResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM submissions", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Picks a free path for `name` under the upload subdirectory
    ///
    /// Returns the absolute target and the path stored in the database.
    fn free_path(&self, name: &str) -> (PathBuf, String) {
        let dir = self.upload_dir.join(UPLOAD_SUBDIR);
        let (stem, extension) = match name.rfind('.') {
            Some(dot) if dot > 0 => (&name[..dot], &name[dot..]),
            _ => (name, ""),
        };

        let mut candidate = name.to_string();
        let mut counter = 1;
        while dir.join(&candidate).exists() {
            candidate = format!("{}_{}{}", stem, counter, extension);
            counter += 1;
        }

        (
            dir.join(&candidate),
            format!("{}/{}", UPLOAD_SUBDIR, candidate),
        )
    }
}

impl SubmissionStore for SqliteSubmissionStore {
    fn create(&mut self, request: SubmissionRequest) -> SubmissionResult<Submission> {
        let errors = validate_request(&request);
        if !errors.is_empty() {
            return Err(SubmissionError::Validation(errors));
        }

        let (Some(plain_text), Some(file)) = (request.plain_text, request.text_file) else {
            return Err(SubmissionError::Validation(validate_request(
                &SubmissionRequest::default(),
            )));
        };
        let name = stored_name(&file.filename).unwrap_or("upload");

        fs::create_dir_all(self.upload_dir.join(UPLOAD_SUBDIR))?;
        let (target, relative) = self.free_path(name);
        fs::write(&target, &file.content)?;

        let created_at = Utc::now().to_rfc3339();
        let inserted = self.conn.execute(
            "INSERT INTO submissions (plain_text, file_path, created_at) VALUES (?1, ?2, ?3)",
            params![plain_text, relative, created_at],
        );
        if let Err(e) = inserted {
            // Keep disk and database in step
            let _ = fs::remove_file(&target);
            return Err(e.into());
        }

        let submission = Submission {
            id: self.conn.last_insert_rowid(),
            plain_text,
            text_file: relative,
            created_at,
        };
        tracing::info!(
            "Stored submission {} with file {}",
            submission.id,
            submission.text_file
        );

        Ok(submission)
    }

    fn list(&self) -> SubmissionResult<Vec<SubmissionView>> {
        let mut stmt = self
            .conn
            .prepare("SELECT plain_text, file_path FROM submissions ORDER BY id")?;

        let views = stmt
            .query_map([], |row| {
                Ok(SubmissionView {
                    user_plain_text: row.get(0)?,
                    user_file_text: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(views)
    }
}
