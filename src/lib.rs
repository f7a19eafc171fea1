//! Braintrust project export library
//!
//! Exports every dataset and experiment of a Braintrust project to CSV files.
//! The binary in `main.rs` is a thin wrapper around these modules.
//!
//! # Modules
//!
//! - `cli`: Command-line interface and argument parsing
//! - `client`: HTTP transport, BTQL queries and network diagnostics
//! - `config`: Configuration management
//! - `error`: Error types and handling
//! - `export`: Listing, pagination, flattening and CSV writing
//! - `model`: Entity kinds and raw API records
//! - `utils`: Utility functions and helpers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use bt_export::{Config, CsvWriter, ExportCoordinator, HttpTransport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let api_key = config.read_api_key()?;
//!     let export_config = config.export_config("my-project-id".to_string(), api_key);
//!
//!     let transport = HttpTransport::new(&export_config)?;
//!     let mut coordinator =
//!         ExportCoordinator::new(export_config, Arc::new(transport), Box::new(CsvWriter::new()));
//!
//!     let summary = coordinator.execute().await?;
//!     println!("{}", summary.render_table());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod utils;

// Re-export commonly used types
pub use client::{ApiTransport, HttpTransport};
pub use config::{Config, ExportConfig};
pub use error::{ApiError, ExportError, Result};
pub use export::{CsvWriter, ExportCoordinator, ExportSummary, TableWriter};
pub use model::EntityKind;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
///
/// # Returns
/// * `&str` - Version string
pub fn version() -> &'static str {
    VERSION
}
