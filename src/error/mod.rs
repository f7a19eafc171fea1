//! Error handling for export operations.
//!
//! Errors are split by concern:
//! - [`ConfigError`]: startup problems, the only fatal class
//! - [`ApiError`]: classified transport failures, recovered per entity
//! - [`WriteError`]: output file failures, recovered per entity

pub mod kinds;

pub use kinds::{ApiError, ApiResult, ConfigError, ExportError, Result, WriteError};
