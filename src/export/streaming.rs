//! Cursor-paginated BTQL fetching
//!
//! Pages are requested strictly in sequence: each request carries the id of
//! the last row of the previous page as its cursor.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::client::{ApiTransport, BTQL_PATH, BtqlQuery, parse_jsonl};
use crate::error::{ApiError, ApiResult};
use crate::model::{EntityKind, Record, value_as_id};

/// Trait for streaming query results in batches
#[async_trait]
pub trait StreamingQuery: Send {
    /// Fetch the next batch of rows
    ///
    /// # Returns
    /// * `ApiResult<Option<Vec<Record>>>` - Next batch, or None once exhausted
    async fn next_batch(&mut self) -> ApiResult<Option<Vec<Record>>>;
}

/// Pages through every row of one dataset or experiment
pub struct BtqlPager<'a> {
    transport: &'a dyn ApiTransport,
    kind: EntityKind,
    entity_id: String,
    page_size: usize,
    cursor: Option<String>,
    requests: usize,
    pages: usize,
    total_fetched: usize,
    exhausted: bool,
}

impl<'a> BtqlPager<'a> {
    pub fn new(
        transport: &'a dyn ApiTransport,
        kind: EntityKind,
        entity_id: impl Into<String>,
        page_size: usize,
    ) -> Self {
        Self {
            transport,
            kind,
            entity_id: entity_id.into(),
            page_size,
            cursor: None,
            requests: 0,
            pages: 0,
            total_fetched: 0,
            exhausted: false,
        }
    }

    /// Number of BTQL calls issued so far
    pub fn requests(&self) -> usize {
        self.requests
    }

    /// Number of non-empty pages received so far
    pub fn pages(&self) -> usize {
        self.pages
    }
}

#[async_trait]
impl StreamingQuery for BtqlPager<'_> {
    async fn next_batch(&mut self) -> ApiResult<Option<Vec<Record>>> {
        if self.exhausted {
            return Ok(None);
        }

        let query = BtqlQuery::new(self.kind, self.entity_id.clone(), self.page_size)
            .with_cursor(self.cursor.clone());
        let body = query.to_json()?;
        debug!(
            "BTQL query for {} {} (cursor: {:?})",
            self.kind, self.entity_id, self.cursor
        );

        self.requests += 1;
        let text = match self.transport.post_text(BTQL_PATH, &body).await {
            Ok(text) => text,
            Err(e) => {
                self.exhausted = true;
                return Err(e);
            }
        };

        let page = parse_jsonl(&text);
        if page.rows.is_empty() {
            debug!(
                "{} {} exhausted after {} rows",
                self.kind, self.entity_id, self.total_fetched
            );
            self.exhausted = true;
            return Ok(None);
        }

        self.pages += 1;
        self.total_fetched += page.rows.len();
        info!(
            "Fetched {} rows for {} {} (Total: {})",
            page.rows.len(),
            self.kind,
            self.entity_id,
            self.total_fetched
        );

        // Skipped lines still count towards the server's page size
        if page.rows.len() + page.skipped < self.page_size {
            self.exhausted = true;
        } else {
            self.cursor = page.rows.last().and_then(|row| value_as_id(row.get("id")));
            if self.cursor.is_none() {
                warn!(
                    "Last row of page {} for {} {} has no id; stopping pagination",
                    self.pages, self.kind, self.entity_id
                );
                self.exhausted = true;
            }
        }

        Ok(Some(page.rows))
    }
}

/// Everything one paginated fetch produced
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Rows from every page received, in order
    pub rows: Vec<Record>,
    /// Number of BTQL calls issued
    pub requests: usize,
    /// Number of non-empty pages received
    pub pages: usize,
    /// Transport failure that ended the fetch early, if any
    pub error: Option<ApiError>,
}

/// Fetch every row of an entity
///
/// A transport failure ends the fetch but keeps the rows accumulated so far.
pub async fn fetch_all(
    transport: &dyn ApiTransport,
    kind: EntityKind,
    entity_id: &str,
    page_size: usize,
) -> FetchOutcome {
    let mut pager = BtqlPager::new(transport, kind, entity_id, page_size);
    let mut outcome = FetchOutcome::default();

    loop {
        match pager.next_batch().await {
            Ok(Some(rows)) => outcome.rows.extend(rows),
            Ok(None) => break,
            Err(e) => {
                warn!(
                    "Fetching {} {} stopped after {} rows: {}",
                    kind,
                    entity_id,
                    outcome.rows.len(),
                    e
                );
                outcome.error = Some(e);
                break;
            }
        }
    }

    outcome.requests = pager.requests();
    outcome.pages = pager.pages();
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::test_support::{FakeApi, numbered_rows, record};
    use serde_json::json;

    #[tokio::test]
    async fn test_page_counts_follow_row_totals() {
        for page_size in [1usize, 3, 10] {
            for total in [0usize, 1, 2, 9, 10, 11, 25] {
                let api = FakeApi::new().with_rows("ds", numbered_rows(total));
                let outcome = fetch_all(&api, EntityKind::Dataset, "ds", page_size).await;

                assert_eq!(outcome.rows.len(), total);
                assert!(outcome.error.is_none());
                assert_eq!(outcome.pages, total.div_ceil(page_size));
                // A final full page needs one more call to see the empty page
                let expected_requests = if total % page_size == 0 {
                    total / page_size + 1
                } else {
                    total.div_ceil(page_size)
                };
                assert_eq!(
                    outcome.requests, expected_requests,
                    "page_size={page_size} total={total}"
                );
            }
        }
    }

    #[tokio::test]
    async fn test_empty_first_page_is_one_request() {
        let api = FakeApi::new().with_rows("ds", Vec::new());
        let outcome = fetch_all(&api, EntityKind::Dataset, "ds", 100).await;
        assert!(outcome.rows.is_empty());
        assert_eq!(api.btql_request_count(), 1);
    }

    #[tokio::test]
    async fn test_cursor_is_last_row_id() {
        let api = FakeApi::new().with_rows("exp", numbered_rows(5));
        let outcome = fetch_all(&api, EntityKind::Experiment, "exp", 2).await;
        assert_eq!(outcome.rows.len(), 5);

        let requests = api.btql_requests_for("exp");
        assert_eq!(requests.len(), 3);
        assert!(requests[0]["query"].get("cursor").is_none());
        assert_eq!(requests[1]["query"]["cursor"], json!("row-1"));
        assert_eq!(requests[2]["query"]["cursor"], json!("row-3"));
        assert_eq!(requests[0]["query"]["from"]["name"]["name"], json!(["experiment"]));
    }

    #[tokio::test]
    async fn test_row_order_is_preserved() {
        let api = FakeApi::new().with_rows("ds", numbered_rows(7));
        let outcome = fetch_all(&api, EntityKind::Dataset, "ds", 3).await;
        let ids: Vec<_> = outcome.rows.iter().map(|r| r["id"].clone()).collect();
        let expected: Vec<_> = (0..7).map(|i| json!(format!("row-{i}"))).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_failure_keeps_accumulated_rows() {
        let api = FakeApi::new()
            .with_rows("ds", numbered_rows(10))
            .failing_after("ds", 2, ApiError::Timeout);
        let outcome = fetch_all(&api, EntityKind::Dataset, "ds", 3).await;

        assert_eq!(outcome.rows.len(), 6);
        assert_eq!(outcome.error, Some(ApiError::Timeout));
        assert_eq!(outcome.requests, 3);
    }

    #[tokio::test]
    async fn test_malformed_lines_are_skipped() {
        let api = FakeApi::new().with_raw_pages(
            "ds",
            vec!["{\"id\":\"a\"}\n{oops\n{\"id\":\"b\"}", "{\"id\":\"c\"}"],
        );
        let outcome = fetch_all(&api, EntityKind::Dataset, "ds", 3).await;

        let ids: Vec<_> = outcome.rows.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!("a"), json!("b"), json!("c")]);
        assert_eq!(api.btql_requests_for("ds")[1]["query"]["cursor"], json!("b"));
    }

    #[tokio::test]
    async fn test_missing_id_stops_instead_of_restarting() {
        let rows = vec![record(json!({"id": "a"})), record(json!({"value": 1}))];
        let api = FakeApi::new().with_rows("ds", rows);
        let outcome = fetch_all(&api, EntityKind::Dataset, "ds", 2).await;

        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(api.btql_request_count(), 1);
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn test_numeric_ids_become_cursors() {
        let api = FakeApi::new().with_raw_pages("ds", vec!["{\"id\":1}", ""]);
        let outcome = fetch_all(&api, EntityKind::Dataset, "ds", 1).await;
        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(api.btql_requests_for("ds")[1]["query"]["cursor"], json!("1"));
    }
}
