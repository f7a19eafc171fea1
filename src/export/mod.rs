//! Project export pipeline
//!
//! The export system is built from a few small pieces:
//!
//! 1. **lister**: lists datasets and experiments of a project
//! 2. **streaming**: pages through the rows of one entity via BTQL
//! 3. **flatten**: turns nested records into scalar rows
//! 4. **writers**: writes one CSV table per entity
//!
//! These components are orchestrated by the **ExportCoordinator**, which
//! walks every entity and picks the best available row source for it.

pub mod coordinator;
pub mod flatten;
pub mod lister;
pub mod progress;
pub mod streaming;
pub mod writers;

#[cfg(test)]
pub(crate) mod test_support;

pub use coordinator::{EntityReport, ExportCoordinator, ExportSummary, RowSource};
pub use flatten::{flatten_entity, flatten_row};
pub use lister::{list_entities, list_records};
pub use progress::ProgressTracker;
pub use streaming::{BtqlPager, FetchOutcome, StreamingQuery, fetch_all};
pub use writers::{CsvWriter, TableWriter};
