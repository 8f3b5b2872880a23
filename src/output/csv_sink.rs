//! Delimited-text record sink
//!
//! Rows go through `csv::Writer`, which handles quoting of values that contain
//! the delimiter, quotes or line breaks. The writer is flushed after every row
//! so an interrupted run leaves only complete rows behind.

use super::traits::{OutputError, OutputResult, RecordSink};
use crate::config::{ColumnSpec, Field, OutputConfig};
use crate::extract::ExtractedRecord;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Writes records as delimited rows with a fixed header
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
    fields: Vec<Field>,
    rows: u64,
}

impl CsvSink<File> {
    /// Creates (or truncates) the output file and writes the header
    ///
    /// # Arguments
    ///
    /// * `path` - Output file path; missing parent directories are created
    /// * `columns` - Columns in output order
    /// * `delimiter` - Single ASCII field delimiter
    /// * `bom` - Prefix the file with a UTF-8 byte-order mark
    pub fn create(
        path: impl AsRef<Path>,
        columns: &[ColumnSpec],
        delimiter: char,
        bom: bool,
    ) -> OutputResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = File::create(path)?;
        if bom {
            file.write_all(UTF8_BOM)?;
        }

        tracing::debug!("Opened output file {}", path.display());
        Self::from_writer(file, columns, delimiter)
    }

    /// Opens the sink described by the `[output]` section
    pub fn from_config(config: &OutputConfig) -> OutputResult<Self> {
        Self::create(
            &config.path,
            &config.columns,
            config.delimiter,
            config.byte_order_mark,
        )
    }
}

impl<W: Write> CsvSink<W> {
    /// Wraps any writer and writes the header row
    pub fn from_writer(writer: W, columns: &[ColumnSpec], delimiter: char) -> OutputResult<Self> {
        let delimiter = u8::try_from(delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| OutputError::Write(format!("delimiter {:?} is not ASCII", delimiter)))?;

        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(writer);

        writer.write_record(columns.iter().map(ColumnSpec::header_label))?;
        writer.flush()?;

        Ok(Self {
            writer,
            fields: columns.iter().map(|c| c.field).collect(),
            rows: 0,
        })
    }

    /// Flushes and returns the underlying writer
    pub fn into_inner(self) -> OutputResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| OutputError::Write(e.error().to_string()))
    }
}

impl<W: Write + Send> RecordSink for CsvSink<W> {
    fn write_record(&mut self, record: &ExtractedRecord) -> OutputResult<()> {
        if let Some(missing) = self
            .fields
            .iter()
            .find(|field| !field.is_optional() && record.field(**field).is_empty())
        {
            return Err(OutputError::IncompleteRecord {
                url: record.source_url.clone(),
                field: missing.default_header(),
            });
        }

        self.writer
            .write_record(self.fields.iter().map(|field| record.field(*field)))?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    fn rows_written(&self) -> u64 {
        self.rows
    }

    fn close(&mut self) -> OutputResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}
