//! Entity and record listing through the conventional list endpoints
//!
//! Both endpoints answer with `{"objects": [...]}` and are read as a single
//! page.

use serde_json::Value;
use tracing::{debug, warn};

use crate::client::ApiTransport;
use crate::error::{ApiError, ApiResult};
use crate::model::{Entity, EntityKind, Record};

/// Path of the record list endpoint, used as the experiment fallback
pub const RECORD_PATH: &str = "/v1/record";

/// Fetch all entities of `kind` in a project
///
/// A failed call or a response without `objects` yields an empty list; the
/// caller decides how to report that.
pub async fn list_entities(
    transport: &dyn ApiTransport,
    kind: EntityKind,
    project_id: &str,
) -> Vec<Entity> {
    match fetch_objects(transport, kind.list_path(), &[("project_id", project_id)]).await {
        Ok(Some(objects)) => objects.into_iter().map(Entity::new).collect(),
        Ok(None) => {
            debug!("{} listing for project {} has no objects field", kind, project_id);
            Vec::new()
        }
        Err(e) => {
            warn!("Failed to list {}s for project {}: {}", kind, project_id, e);
            Vec::new()
        }
    }
}

/// Fetch the records stored for an experiment
///
/// A response without `objects` is an empty list; transport failures are
/// returned to the caller.
pub async fn list_records(transport: &dyn ApiTransport, experiment_id: &str) -> ApiResult<Vec<Record>> {
    let objects = fetch_objects(transport, RECORD_PATH, &[("experiment_id", experiment_id)]).await?;
    Ok(objects.unwrap_or_default())
}

/// GET a list endpoint and extract its `objects` array
///
/// Returns `Ok(None)` when the field is absent or not an array. Elements
/// that are not objects are skipped.
async fn fetch_objects(
    transport: &dyn ApiTransport,
    path: &str,
    query: &[(&str, &str)],
) -> ApiResult<Option<Vec<Record>>> {
    let response = transport.get_json(path, query).await?;

    let objects = match response {
        Value::Object(mut body) => match body.remove("objects") {
            Some(Value::Array(items)) => items,
            _ => return Ok(None),
        },
        _ => {
            return Err(ApiError::Decode(format!(
                "{} did not return a JSON object",
                path
            )));
        }
    };

    let total = objects.len();
    let records: Vec<Record> = objects
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(record) => Some(record),
            _ => None,
        })
        .collect();

    if records.len() < total {
        warn!("Skipped {} non-object entries from {}", total - records.len(), path);
    }

    Ok(Some(records))
}
