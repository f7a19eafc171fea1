//! Export coordinator for orchestrating a project export
//!
//! Entities are processed one at a time, datasets first, in listing order.
//! For each entity the coordinator picks the first source that yields rows:
//!
//! 1. BTQL rows (dataset rows or experiment logs)
//! 2. Experiments only: the record endpoint
//! 3. A single row holding the entity's own metadata

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tabled::builder::Builder;
use tabled::settings::Style;
use tracing::{debug, error, info, warn};

use crate::client::ApiTransport;
use crate::config::ExportConfig;
use crate::error::{ApiError, Result, WriteError};
use crate::model::{Entity, EntityKind, Record, Row};
use crate::utils::fs::sanitize_filename;

use super::flatten::{flatten_entity, flatten_row};
use super::lister::{list_entities, list_records};
use super::progress::ProgressTracker;
use super::streaming::fetch_all;
use super::writers::TableWriter;

/// Where the rows of an exported file came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSource {
    /// BTQL query against the entity
    Btql,
    /// Record endpoint fallback (experiments only)
    Records,
    /// No rows anywhere; the entity's metadata was written as the only row
    MetadataOnly,
}

impl fmt::Display for RowSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowSource::Btql => write!(f, "btql"),
            RowSource::Records => write!(f, "records"),
            RowSource::MetadataOnly => write!(f, "metadata"),
        }
    }
}

/// Outcome of exporting one entity
#[derive(Debug, Clone)]
pub struct EntityReport {
    pub kind: EntityKind,
    /// Display name (or the kind's fallback name)
    pub name: String,
    /// Destination file
    pub path: PathBuf,
    pub source: RowSource,
    /// Rows written; 0 if the write failed
    pub rows: usize,
    /// Non-fatal problems met along the way
    pub error: Option<String>,
}

/// Result of a whole export run
#[derive(Debug)]
pub struct ExportSummary {
    /// `{output_dir}/{sanitized_project_id}`
    pub project_dir: PathBuf,
    /// One report per processed entity
    pub reports: Vec<EntityReport>,
    /// Entities skipped for lacking both id and name
    pub skipped: usize,
    /// Time taken for export
    pub elapsed_ms: u64,
}

impl ExportSummary {
    pub fn dir_for(&self, kind: EntityKind) -> PathBuf {
        self.project_dir.join(kind.dir_name())
    }

    /// Number of files actually written
    pub fn files_written(&self) -> usize {
        self.reports.iter().filter(|r| r.rows > 0).count()
    }

    /// Reports that carry an error
    pub fn failures(&self) -> impl Iterator<Item = &EntityReport> {
        self.reports.iter().filter(|r| r.error.is_some())
    }

    /// Render the per-entity reports as a table
    pub fn render_table(&self) -> String {
        if self.reports.is_empty() {
            return "(no entities exported)".to_string();
        }

        let mut builder = Builder::default();
        builder.push_record(["kind", "name", "source", "rows", "file", "error"]);
        for report in &self.reports {
            let file = report
                .path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default();
            builder.push_record([
                report.kind.to_string(),
                report.name.clone(),
                report.source.to_string(),
                report.rows.to_string(),
                file,
                report.error.clone().unwrap_or_default(),
            ]);
        }

        let mut table = builder.build();
        table.with(Style::modern());
        table.to_string()
    }
}

/// Coordinator for export operations
pub struct ExportCoordinator {
    config: ExportConfig,
    transport: Arc<dyn ApiTransport>,
    writer: Box<dyn TableWriter>,
    show_progress: bool,
}

impl ExportCoordinator {
    /// Create a new export coordinator
    pub fn new(
        config: ExportConfig,
        transport: Arc<dyn ApiTransport>,
        writer: Box<dyn TableWriter>,
    ) -> Self {
        Self {
            config,
            transport,
            writer,
            show_progress: false,
        }
    }

    /// Enable or disable the progress bar
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Execute the export
    ///
    /// Only failing to create the output directories is an error; every
    /// per-entity problem is logged and recorded in the summary.
    ///
    /// # Returns
    /// * `Result<ExportSummary>` - Export statistics or error
    pub async fn execute(&mut self) -> Result<ExportSummary> {
        let start_time = Instant::now();
        let project_dir = self
            .config
            .output_dir
            .join(sanitize_filename(&self.config.project_id));

        for kind in [EntityKind::Dataset, EntityKind::Experiment] {
            let dir = project_dir.join(kind.dir_name());
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|source| WriteError::CreateDir {
                    path: dir.display().to_string(),
                    source,
                })?;
        }

        let mut summary = ExportSummary {
            project_dir,
            reports: Vec::new(),
            skipped: 0,
            elapsed_ms: 0,
        };

        for kind in [EntityKind::Dataset, EntityKind::Experiment] {
            self.export_kind(kind, &mut summary).await;
        }

        summary.elapsed_ms = start_time.elapsed().as_millis() as u64;
        info!(
            "Export completed: {} files, {} failures, {} ms",
            summary.files_written(),
            summary.failures().count(),
            summary.elapsed_ms
        );
        Ok(summary)
    }

    /// Export every entity of one kind
    async fn export_kind(&mut self, kind: EntityKind, summary: &mut ExportSummary) {
        let project_id = self.config.project_id.clone();
        info!("Fetching {}s for project '{}'...", kind, project_id);

        let entities = list_entities(self.transport.as_ref(), kind, &project_id).await;
        if entities.is_empty() {
            info!("No {}s found in project {}", kind, project_id);
            return;
        }
        info!("Found {} {}s", entities.len(), kind);

        let dir = summary.dir_for(kind);
        let tracker = ProgressTracker::new(entities.len() as u64, kind.dir_name(), self.show_progress);
        for entity in &entities {
            match self.export_entity(kind, entity, &dir, &tracker).await {
                Some(report) => summary.reports.push(report),
                None => summary.skipped += 1,
            }
            tracker.entity_done();
        }
        tracker.finish();
    }

    /// Export a single entity, returning `None` if it was skipped
    async fn export_entity(
        &mut self,
        kind: EntityKind,
        entity: &Entity,
        dir: &Path,
        tracker: &ProgressTracker,
    ) -> Option<EntityReport> {
        let id = entity.id();
        let name = entity.name();
        if id.is_none() && name.is_none() {
            warn!("Skipping {} with neither id nor name", kind);
            return None;
        }

        let name = name.unwrap_or_else(|| kind.fallback_name().to_string());
        tracker.start_entity(&name);
        info!(
            "Processing {} '{}' (ID: {})",
            kind,
            name,
            id.as_deref().unwrap_or("none")
        );

        let path = dir.join(format!("{}.csv", sanitize_filename(&name)));
        let metadata = flatten_entity(&entity.fields);
        let mut problems = Vec::new();

        let (rows, source) = self.collect_rows(kind, id.as_deref(), &name, &mut problems).await;
        let written = match source {
            RowSource::MetadataOnly => {
                self.writer
                    .write(std::slice::from_ref(&metadata), &path, None, None)
                    .await
            }
            RowSource::Btql | RowSource::Records => {
                self.writer
                    .write(&rows, &path, Some(&metadata), Some(kind.metadata_fields()))
                    .await
            }
        };

        let rows = match written {
            Ok(count) => count,
            Err(e) => {
                error!("Failed to write {} '{}': {}", kind, name, e);
                problems.push(e.to_string());
                0
            }
        };

        Some(EntityReport {
            kind,
            name,
            path,
            source,
            rows,
            error: (!problems.is_empty()).then(|| problems.join("; ")),
        })
    }

    /// Walk the source chain until one yields rows
    async fn collect_rows(
        &self,
        kind: EntityKind,
        id: Option<&str>,
        name: &str,
        problems: &mut Vec<String>,
    ) -> (Vec<Row>, RowSource) {
        let Some(id) = id else {
            debug!("{} '{}' has no id, exporting metadata only", kind, name);
            return (Vec::new(), RowSource::MetadataOnly);
        };

        let outcome = fetch_all(self.transport.as_ref(), kind, id, self.config.page_size).await;
        if let Some(ref e) = outcome.error {
            problems.push(describe_fetch_error(e, outcome.rows.len()));
        }
        let rows = non_empty_rows(&outcome.rows);
        if !rows.is_empty() {
            return (rows, RowSource::Btql);
        }
        info!("No data found for {} '{}'", kind, name);

        if kind == EntityKind::Experiment {
            match list_records(self.transport.as_ref(), id).await {
                Ok(records) => {
                    let rows = non_empty_rows(&records);
                    if !rows.is_empty() {
                        info!("Using {} records for experiment '{}'", rows.len(), name);
                        return (rows, RowSource::Records);
                    }
                    debug!("No records found for experiment '{}'", name);
                }
                Err(e) => {
                    warn!("Record fallback failed for experiment '{}': {}", name, e);
                    problems.push(format!("record fallback: {}", e));
                }
            }
        }

        (Vec::new(), RowSource::MetadataOnly)
    }
}

/// Flatten records, dropping those with no columns left
fn non_empty_rows(records: &[Record]) -> Vec<Row> {
    records
        .iter()
        .map(flatten_row)
        .filter(|row| !row.is_empty())
        .collect()
}

/// Short description of why a paginated fetch stopped early
fn describe_fetch_error(err: &ApiError, rows_kept: usize) -> String {
    let reason = match err {
        ApiError::Timeout => "timed out".to_string(),
        ApiError::Connect(_) => "could not connect".to_string(),
        ApiError::Status { code, .. } => format!("HTTP {}", code),
        ApiError::Decode(msg) => format!("unreadable response ({})", msg),
        ApiError::Request(msg) => msg.clone(),
    };
    if rows_kept > 0 {
        format!("btql fetch {} after {} rows", reason, rows_kept)
    } else {
        format!("btql fetch {}", reason)
    }
}
