//! Table writers for export operations
//!
//! A writer receives one complete batch of flattened rows per entity, so it
//! can compute the full column set before writing anything.

use std::path::Path;

use async_trait::async_trait;

use crate::error::{Result, WriteError};
use crate::model::Row;

pub mod csv;

pub use self::csv::CsvWriter;

/// Trait for writing one table per exported entity
#[async_trait]
pub trait TableWriter: Send {
    /// Write `rows` to `destination`, replacing any existing file
    ///
    /// # Arguments
    /// * `rows` - Flattened rows, possibly with differing keys
    /// * `destination` - Output file path; parent directories are created
    /// * `metadata` - Optional entity metadata written as a preamble
    /// * `metadata_fields` - Restricts the preamble to these fields, in order
    ///
    /// # Returns
    /// * `Result<usize>` - Number of rows written; 0 means no file was created
    async fn write(
        &mut self,
        rows: &[Row],
        destination: &Path,
        metadata: Option<&Row>,
        metadata_fields: Option<&[&str]>,
    ) -> Result<usize>;
}

/// Create the parent directory of `path` if it does not exist
///
/// # Arguments
/// * `path` - File path whose parent is created
///
/// # Returns
/// * `Result<()>` - Success or error
pub(crate) async fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| WriteError::CreateDir {
                    path: parent.display().to_string(),
                    source,
                })?;
        }
    }
    Ok(())
}
