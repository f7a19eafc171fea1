//! Data model shared by the client and export layers

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};

/// A raw record as returned by the API: a JSON object of arbitrary shape.
pub type Record = Map<String, Value>;

/// A flattened row: every value is a JSON scalar (string, number, bool or null).
///
/// Ordered by key so that column computation is deterministic.
pub type Row = BTreeMap<String, Value>;

/// Kind of exportable project entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Dataset,
    Experiment,
}

impl EntityKind {
    /// Name used in BTQL `from` clauses
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Dataset => "dataset",
            EntityKind::Experiment => "experiment",
        }
    }

    /// Path of the list endpoint for this kind
    pub fn list_path(&self) -> &'static str {
        match self {
            EntityKind::Dataset => "/v1/dataset",
            EntityKind::Experiment => "/v1/experiment",
        }
    }

    /// Output sub-directory for this kind
    pub fn dir_name(&self) -> &'static str {
        match self {
            EntityKind::Dataset => "datasets",
            EntityKind::Experiment => "experiments",
        }
    }

    /// Name used when the entity carries no display name
    pub fn fallback_name(&self) -> &'static str {
        match self {
            EntityKind::Dataset => "unknown_dataset",
            EntityKind::Experiment => "unknown_experiment",
        }
    }

    /// Fields written to the metadata preamble of an exported file
    pub fn metadata_fields(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Dataset => &[
                "id",
                "name",
                "description",
                "project_id",
                "created",
                "user_id",
                "metadata",
            ],
            EntityKind::Experiment => &[
                "id",
                "name",
                "description",
                "project_id",
                "created",
                "commit",
                "base_exp_id",
                "dataset_id",
                "dataset_version",
                "public",
                "user_id",
                "metadata",
            ],
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Render a JSON value as a string identifier.
///
/// Strings are taken verbatim and numbers use their JSON text; anything else
/// (including empty strings) is not an identifier.
pub fn value_as_id(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A project entity (dataset or experiment) as listed by the API
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// Raw fields as returned by the list endpoint
    pub fields: Record,
}

impl Entity {
    pub fn new(fields: Record) -> Self {
        Self { fields }
    }

    /// Entity identifier, if present
    pub fn id(&self) -> Option<String> {
        value_as_id(self.fields.get("id"))
    }

    /// Display name, if present
    pub fn name(&self) -> Option<String> {
        match self.fields.get("name") {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity(value: Value) -> Entity {
        match value {
            Value::Object(map) => Entity::new(map),
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_entity_accessors() {
        let e = entity(json!({"id": "abc", "name": "My set"}));
        assert_eq!(e.id().as_deref(), Some("abc"));
        assert_eq!(e.name().as_deref(), Some("My set"));

        let e = entity(json!({"id": 42, "name": ""}));
        assert_eq!(e.id().as_deref(), Some("42"));
        assert_eq!(e.name(), None);
    }

    #[test]
    fn test_value_as_id_rejects_non_scalars() {
        assert_eq!(value_as_id(Some(&json!(null))), None);
        assert_eq!(value_as_id(Some(&json!({"a": 1}))), None);
        assert_eq!(value_as_id(Some(&json!(""))), None);
        assert_eq!(value_as_id(None), None);
    }

    #[test]
    fn test_kind_paths() {
        assert_eq!(EntityKind::Dataset.list_path(), "/v1/dataset");
        assert_eq!(EntityKind::Experiment.dir_name(), "experiments");
        assert_eq!(EntityKind::Experiment.to_string(), "experiment");
    }
}
