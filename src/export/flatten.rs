//! Record flattening for tabular output
//!
//! Two strategies exist because the API returns two record shapes:
//! - entity objects from list endpoints ([`flatten_entity`])
//! - query-result rows from BTQL and the record endpoint ([`flatten_row`])
//!
//! Both produce a [`Row`] whose values are JSON scalars, and both are
//! idempotent.

use serde_json::Value;

use crate::model::{Record, Row};

/// Nested field whose sub-fields are hoisted into top-level columns
pub const METADATA_FIELD: &str = "metadata";

/// Prefix given to hoisted metadata columns
pub const METADATA_PREFIX: &str = "metadata_";

/// Replace nested values by their compact JSON text
fn scalarize(value: &Value) -> Value {
    match value {
        Value::Object(_) | Value::Array(_) => Value::String(value.to_string()),
        scalar => scalar.clone(),
    }
}

/// Flatten an entity object
///
/// Null fields are dropped, objects and arrays become JSON text, scalars
/// pass through.
pub fn flatten_entity(record: &Record) -> Row {
    record
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| (key.clone(), scalarize(value)))
        .collect()
}

/// Flatten a query-result row
///
/// A `metadata` object is replaced by one `metadata_<key>` column per
/// sub-field. A top-level column that already has that name wins over the
/// hoisted one. A null `metadata` is removed. Every other nested value
/// becomes JSON text; scalars, including null, pass through.
pub fn flatten_row(record: &Record) -> Row {
    let mut row: Row = record
        .iter()
        .filter(|(key, value)| !(key.as_str() == METADATA_FIELD && is_hoistable(value)))
        .map(|(key, value)| (key.clone(), scalarize(value)))
        .collect();

    if let Some(Value::Object(metadata)) = record.get(METADATA_FIELD) {
        for (key, value) in metadata {
            row.entry(format!("{}{}", METADATA_PREFIX, key))
                .or_insert_with(|| scalarize(value));
        }
    }

    row
}

fn is_hoistable(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Null)
}

/// Convert a flattened row back into a record, for re-flattening
pub fn row_to_record(row: &Row) -> Record {
    row.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}
