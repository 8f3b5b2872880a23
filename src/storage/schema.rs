//! Database schema for the submission store

use rusqlite::Connection;

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS submissions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    plain_text TEXT NOT NULL CHECK (length(plain_text) <= 3000),
    file_path TEXT NOT NULL,
    created_at TEXT NOT NULL
);
"#;

/// Creates the schema if it does not exist yet
pub fn initialize_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)
}
