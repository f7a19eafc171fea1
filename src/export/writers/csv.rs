//! CSV writer for export operations
//!
//! Produces one file per entity: an optional `#`-prefixed metadata preamble,
//! then a header row with the sorted union of every row's keys, then the
//! rows themselves. Keys missing from a row render as empty cells.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Result, WriteError};
use crate::model::Row;

use super::{TableWriter, ensure_parent_dir};

/// Marker starting every preamble line
const COMMENT_MARKER: &str = "#";

/// Writer for CSV format
#[derive(Debug, Default)]
pub struct CsvWriter {
    /// Lowercased paths written during this run, for collision detection
    written_paths: HashSet<String>,
    /// Number of files written
    files_written: usize,
}

impl CsvWriter {
    /// Create a new CSV writer
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files_written(&self) -> usize {
        self.files_written
    }

    /// Sorted union of keys across all rows
    ///
    /// # Arguments
    /// * `rows` - Rows to scan for field names
    pub fn columns(rows: &[Row]) -> Vec<String> {
        rows.iter()
            .flat_map(|row| row.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Text of one cell
    ///
    /// Strings are written verbatim, null as an empty cell, anything else as
    /// its JSON text.
    pub fn cell_text(value: Option<&Value>) -> String {
        match value {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// Remember `destination`, returning false if it was already written
    ///
    /// Paths are compared case-insensitively since `Run.csv` and `run.csv`
    /// are the same file on case-insensitive filesystems.
    fn record_destination(&mut self, destination: &Path) -> bool {
        self.written_paths
            .insert(destination.to_string_lossy().to_lowercase())
    }

    /// Render the metadata preamble
    ///
    /// Fields absent from `metadata` are skipped. Line breaks inside values
    /// are escaped so each field stays on one line.
    fn preamble(metadata: &Row, fields: Option<&[&str]>) -> String {
        let keys: Vec<&str> = match fields {
            Some(fields) => fields.to_vec(),
            None => metadata.keys().map(String::as_str).collect(),
        };

        let mut out = String::new();
        for key in keys {
            let Some(value) = metadata.get(key) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            let text = Self::cell_text(Some(value))
                .replace('\r', "\\r")
                .replace('\n', "\\n");
            out.push_str(&format!("{} {}: {}\n", COMMENT_MARKER, key, text));
        }
        out.push('\n');
        out.push_str(COMMENT_MARKER);
        out.push('\n');
        out
    }

    /// Encode the whole file in memory
    ///
    /// # Returns
    /// * `Result<Vec<u8>>` - File contents or encoding error
    pub fn encode(rows: &[Row], metadata: Option<&Row>, metadata_fields: Option<&[&str]>) -> Result<Vec<u8>> {
        let columns = Self::columns(rows);
        let mut buffer = Vec::new();

        if let Some(metadata) = metadata {
            buffer.extend_from_slice(Self::preamble(metadata, metadata_fields).as_bytes());
        }

        {
            let mut wtr = csv::WriterBuilder::new()
                .terminator(csv::Terminator::Any(b'\n'))
                .from_writer(&mut buffer);
            wtr.write_record(&columns)
                .map_err(|e| WriteError::Encode(e.to_string()))?;
            for row in rows {
                let record = columns.iter().map(|column| Self::cell_text(row.get(column)));
                wtr.write_record(record)
                    .map_err(|e| WriteError::Encode(e.to_string()))?;
            }
            wtr.flush()
                .map_err(|e| WriteError::Encode(e.to_string()))?;
        }

        Ok(buffer)
    }
}

#[async_trait]
impl TableWriter for CsvWriter {
    async fn write(
        &mut self,
        rows: &[Row],
        destination: &Path,
        metadata: Option<&Row>,
        metadata_fields: Option<&[&str]>,
    ) -> Result<usize> {
        if rows.is_empty() || rows.iter().all(|row| row.is_empty()) {
            info!("No data to write for {}", destination.display());
            return Ok(0);
        }

        let contents = Self::encode(rows, metadata, metadata_fields)?;
        ensure_parent_dir(destination).await?;

        if !self.record_destination(destination) {
            warn!(
                "{} was already written during this export and will be overwritten",
                destination.display()
            );
        }

        tokio::fs::write(destination, &contents)
            .await
            .map_err(|source| WriteError::WriteFile {
                path: destination.display().to_string(),
                source,
            })?;

        self.files_written += 1;
        debug!("Wrote {} bytes to {}", contents.len(), destination.display());
        info!("Saved {} rows to {}", rows.len(), destination.display());
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map.into_iter().collect(),
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn test_csv_writer_basic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut writer = CsvWriter::new();

        let rows = vec![row(json!({"v": 1, "id": "a"})), row(json!({"id": "b", "v": 2}))];
        let written = writer.write(&rows, &path, None, None).await.unwrap();
        assert_eq!(written, 2);

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content, "id,v\na,1\nb,2\n");
    }

    #[tokio::test]
    async fn test_heterogeneous_rows_use_key_union() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.csv");
        let mut writer = CsvWriter::new();

        let rows = vec![
            row(json!({"id": "a", "input": "x"})),
            row(json!({"id": "b", "output": "y", "flag": true})),
        ];
        writer.write(&rows, &path, None, None).await.unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "flag,id,input,output");
        assert_eq!(lines[1], ",a,x,");
        assert_eq!(lines[2], "true,b,,y");
    }

    #[tokio::test]
    async fn test_special_characters_are_quoted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("special.csv");
        let mut writer = CsvWriter::new();

        let rows = vec![
            row(json!({"text": "Hello, world!"})),
            row(json!({"text": "Quote: \"test\""})),
            row(json!({"text": "Newline\ntest"})),
        ];
        writer.write(&rows, &path, None, None).await.unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(content.contains("\"Hello, world!\""));
        assert!(content.contains("\"Quote: \"\"test\"\"\""));
        assert!(content.contains("\"Newline\ntest\""));
    }

    #[tokio::test]
    async fn test_metadata_preamble() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("meta.csv");
        let mut writer = CsvWriter::new();

        let metadata = row(json!({
            "id": "ds1",
            "name": "set",
            "description": "two\nlines",
            "internal": "hidden"
        }));
        let rows = vec![row(json!({"id": "r1"}))];
        writer
            .write(&rows, &path, Some(&metadata), Some(&["name", "id", "description", "created"][..]))
            .await
            .unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(
            content,
            "# name: set\n# id: ds1\n# description: two\\nlines\n\n#\nid\nr1\n"
        );
    }

    #[test]
    fn test_preamble_without_field_list_uses_all_keys() {
        let metadata = row(json!({"b": 2, "a": "x", "n": null}));
        let rows = vec![row(json!({"id": "r"}))];
        let bytes = CsvWriter::encode(&rows, Some(&metadata), None).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "# a: x\n# b: 2\n\n#\nid\nr\n");
    }

    #[tokio::test]
    async fn test_empty_rows_create_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("empty.csv");
        let mut writer = CsvWriter::new();

        let written = writer.write(&[], &path, None, None).await.unwrap();
        assert_eq!(written, 0);
        assert!(!path.exists());
        assert!(!dir.path().join("sub").exists());
        assert_eq!(writer.files_written(), 0);
    }

    #[tokio::test]
    async fn test_same_path_twice_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dup.csv");
        let mut writer = CsvWriter::new();

        writer.write(&[row(json!({"id": "first"}))], &path, None, None).await.unwrap();
        writer.write(&[row(json!({"id": "second"}))], &path, None, None).await.unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content, "id\nsecond\n");
        assert_eq!(writer.files_written(), 2);
    }

    #[test]
    fn test_collisions_ignore_case() {
        let mut writer = CsvWriter::new();
        let dir = Path::new("exports/p/experiments");
        assert!(writer.record_destination(&dir.join("Run.csv")));
        assert!(!writer.record_destination(&dir.join("run.csv")));
        assert!(!writer.record_destination(&dir.join("RUN.csv")));
        assert!(writer.record_destination(&dir.join("run-2.csv")));
    }

    #[tokio::test]
    async fn test_unwritable_destination_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        tokio::fs::write(&blocker, b"x").await.unwrap();
        let mut writer = CsvWriter::new();

        let result = writer
            .write(&[row(json!({"id": "a"}))], &blocker.join("out.csv"), None, None)
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(CsvWriter::cell_text(None), "");
        assert_eq!(CsvWriter::cell_text(Some(&json!(null))), "");
        assert_eq!(CsvWriter::cell_text(Some(&json!("s"))), "s");
        assert_eq!(CsvWriter::cell_text(Some(&json!(1.5))), "1.5");
        assert_eq!(CsvWriter::cell_text(Some(&json!(false))), "false");
    }
}
