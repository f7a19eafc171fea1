//! Typed BTQL requests and JSON Lines response parsing
//!
//! Only one query shape is supported: select every field from a single
//! dataset or experiment, one page at a time.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::model::{EntityKind, Record};

/// Path of the BTQL endpoint
pub const BTQL_PATH: &str = "/btql";

/// A `select * from <kind>('<id>')` query with paging parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BtqlQuery {
    kind: EntityKind,
    entity_id: String,
    limit: usize,
    cursor: Option<String>,
}

impl BtqlQuery {
    /// Create a query for one entity with the given page size
    pub fn new(kind: EntityKind, entity_id: impl Into<String>, limit: usize) -> Self {
        Self {
            kind,
            entity_id: entity_id.into(),
            limit,
            cursor: None,
        }
    }

    /// Continue after the row identified by `cursor`
    pub fn with_cursor(mut self, cursor: Option<String>) -> Self {
        self.cursor = cursor;
        self
    }

    /// Wire representation of this query
    pub fn request(&self) -> BtqlRequest<'_> {
        BtqlRequest {
            query: QueryBody {
                from: Expr::Function {
                    name: Box::new(Expr::Ident {
                        name: vec![self.kind.as_str()],
                    }),
                    args: vec![Expr::Literal {
                        value: &self.entity_id,
                    }],
                },
                select: vec![Expr::Star],
                limit: self.limit,
                cursor: self.cursor.as_deref(),
            },
            fmt: "jsonl",
        }
    }

    /// Request body as a JSON value
    pub fn to_json(&self) -> ApiResult<Value> {
        serde_json::to_value(self.request()).map_err(|e| ApiError::Request(e.to_string()))
    }
}

/// Top-level BTQL request body
#[derive(Debug, Serialize)]
pub struct BtqlRequest<'a> {
    query: QueryBody<'a>,
    fmt: &'static str,
}

#[derive(Debug, Serialize)]
struct QueryBody<'a> {
    from: Expr<'a>,
    select: Vec<Expr<'a>>,
    limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    cursor: Option<&'a str>,
}

/// BTQL expression nodes, tagged by `op`
#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum Expr<'a> {
    Function { name: Box<Expr<'a>>, args: Vec<Expr<'a>> },
    Ident { name: Vec<&'a str> },
    Literal { value: &'a str },
    Star,
}

/// Rows decoded from one JSON Lines payload
#[derive(Debug, Default, Clone, PartialEq)]
pub struct JsonlPage {
    /// Decoded rows, in payload order
    pub rows: Vec<Record>,
    /// Number of non-blank lines that could not be decoded as an object
    pub skipped: usize,
}

/// Decode a newline-delimited JSON payload.
///
/// Blank lines are ignored. A line that is not valid JSON, or is valid JSON
/// but not an object, is skipped with a warning.
pub fn parse_jsonl(body: &str) -> JsonlPage {
    let mut page = JsonlPage::default();

    for (index, line) in body.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(record)) => page.rows.push(record),
            Ok(other) => {
                warn!(
                    "Skipping line {}: expected a JSON object, got {}",
                    index + 1,
                    json_type_name(&other)
                );
                page.skipped += 1;
            }
            Err(e) => {
                warn!("Skipping malformed line {}: {}", index + 1, e);
                page.skipped += 1;
            }
        }
    }

    page
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
