//! In-memory API used by the export tests

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::client::{ApiTransport, BTQL_PATH};
use crate::error::{ApiError, ApiResult};
use crate::model::Record;

pub(crate) fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

/// `count` rows with ids `row-0`, `row-1`, ...
pub(crate) fn numbered_rows(count: usize) -> Vec<Record> {
    (0..count)
        .map(|i| record(json!({"id": format!("row-{i}"), "n": i})))
        .collect()
}

/// Fake server that honors BTQL cursors and serves canned GET responses
#[derive(Default)]
pub(crate) struct FakeApi {
    get_routes: HashMap<String, ApiResult<Value>>,
    rows: HashMap<String, Vec<Record>>,
    raw_pages: Mutex<HashMap<String, VecDeque<String>>>,
    failures: HashMap<String, (usize, ApiError)>,
    btql_bodies: Mutex<Vec<Value>>,
    gets: Mutex<Vec<String>>,
}

impl FakeApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Answer `GET path?key=value` with `response`
    pub(crate) fn with_get(mut self, path: &str, key: &str, value: &str, response: ApiResult<Value>) -> Self {
        self.get_routes.insert(route(path, &[(key, value)]), response);
        self
    }

    /// Answer `GET path?key=value` with `{"objects": [...]}`
    pub(crate) fn with_objects(self, path: &str, key: &str, value: &str, objects: Vec<Value>) -> Self {
        self.with_get(path, key, value, Ok(json!({ "objects": objects })))
    }

    /// Serve `rows` through BTQL for entity `id`
    pub(crate) fn with_rows(mut self, id: &str, rows: Vec<Record>) -> Self {
        self.rows.insert(id.to_string(), rows);
        self
    }

    /// Serve these literal bodies, in order, for entity `id`
    pub(crate) fn with_raw_pages(self, id: &str, pages: Vec<&str>) -> Self {
        self.raw_pages
            .lock()
            .unwrap()
            .insert(id.to_string(), pages.into_iter().map(String::from).collect());
        self
    }

    /// Fail BTQL calls for `id` once `after` calls have succeeded
    pub(crate) fn failing_after(mut self, id: &str, after: usize, err: ApiError) -> Self {
        self.failures.insert(id.to_string(), (after, err));
        self
    }

    /// BTQL bodies received for `id`, in order
    pub(crate) fn btql_requests_for(&self, id: &str) -> Vec<Value> {
        self.btql_bodies
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b["query"]["from"]["args"][0]["value"] == json!(id))
            .cloned()
            .collect()
    }

    pub(crate) fn btql_request_count(&self) -> usize {
        self.btql_bodies.lock().unwrap().len()
    }

    pub(crate) fn get_requests(&self) -> Vec<String> {
        self.gets.lock().unwrap().clone()
    }
}

fn route(path: &str, query: &[(&str, &str)]) -> String {
    let params: Vec<String> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{}?{}", path, params.join("&"))
}

#[async_trait]
impl ApiTransport for FakeApi {
    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> ApiResult<Value> {
        let key = route(path, query);
        self.gets.lock().unwrap().push(key.clone());
        self.get_routes.get(&key).cloned().unwrap_or(Err(ApiError::Status {
            code: 404,
            body: String::new(),
        }))
    }

    async fn post_text(&self, path: &str, body: &Value) -> ApiResult<String> {
        assert_eq!(path, BTQL_PATH);
        let id = body["query"]["from"]["args"][0]["value"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        let previous = self.btql_requests_for(&id).len();
        self.btql_bodies.lock().unwrap().push(body.clone());

        if let Some((after, err)) = self.failures.get(&id) {
            if previous >= *after {
                return Err(err.clone());
            }
        }

        if let Some(pages) = self.raw_pages.lock().unwrap().get_mut(&id) {
            return Ok(pages.pop_front().unwrap_or_default());
        }

        let rows = self.rows.get(&id).cloned().unwrap_or_default();
        let limit = body["query"]["limit"].as_u64().unwrap_or(0) as usize;
        let start = match body["query"]["cursor"].as_str() {
            Some(cursor) => rows
                .iter()
                .position(|r| r.get("id") == Some(&json!(cursor)))
                .map(|i| i + 1)
                .unwrap_or(0),
            None => 0,
        };
        let end = (start + limit).min(rows.len());
        let lines: Vec<String> = rows[start.min(end)..end]
            .iter()
            .map(|r| Value::Object(r.clone()).to_string())
            .collect();
        Ok(lines.join("\n"))
    }
}
