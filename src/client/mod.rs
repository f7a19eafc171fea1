//! HTTP access to the remote API
//!
//! This module provides:
//! - [`ApiTransport`]: the seam the export layer talks to
//! - [`HttpTransport`]: the reqwest-backed implementation
//! - Typed BTQL requests ([`btql`])
//! - A best-effort network probe run after timeouts ([`diagnostics`])

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::config::ExportConfig;
use crate::error::{ApiError, ApiResult, ConfigError, Result};
use crate::utils::string::truncate;

pub mod btql;
pub mod diagnostics;

pub use btql::{BTQL_PATH, BtqlQuery, JsonlPage, parse_jsonl};
pub use diagnostics::NetworkProbe;

/// Maximum number of response body characters kept in logs and errors
const BODY_PREVIEW_CHARS: usize = 200;

/// Minimal request surface needed by the exporter
///
/// Every call either succeeds or returns a classified [`ApiError`]; nothing
/// is retried at this layer.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// Issue a GET and decode the body as JSON
    ///
    /// # Arguments
    /// * `path` - Path relative to the base URL, starting with `/`
    /// * `query` - Query string parameters
    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> ApiResult<Value>;

    /// Issue a POST with a JSON body and return the raw response text
    ///
    /// # Arguments
    /// * `path` - Path relative to the base URL, starting with `/`
    /// * `body` - JSON request body
    async fn post_text(&self, path: &str, body: &Value) -> ApiResult<String>;
}

/// reqwest-backed transport with bearer authentication and a fixed timeout
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    probe: Option<NetworkProbe>,
}

impl HttpTransport {
    /// Build a transport from the resolved export configuration
    ///
    /// # Returns
    /// * `Result<Self>` - Transport, or a configuration error if the client cannot be built
    pub fn new(config: &ExportConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key)).map_err(|_| {
            ConfigError::InvalidValue {
                field: "api key".into(),
                value: "<contains invalid header characters>".into(),
            }
        })?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ConfigError::Generic(format!("Failed to build HTTP client: {}", e)))?;

        let probe = if config.diagnostics.traceroute {
            NetworkProbe::for_base_url(&config.base_url, &config.diagnostics)
        } else {
            None
        };

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            probe,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Classify a send failure, running the probe when it was a timeout
    async fn classify(&self, err: reqwest::Error) -> ApiError {
        let api_err = ApiError::from_reqwest(&err);
        warn!("API request error: {}", err);
        if api_err.is_timeout() {
            if let Some(ref probe) = self.probe {
                probe.run().await;
            }
        }
        api_err
    }

    /// Turn a response into its body text, failing on non-2xx status
    async fn checked_text(&self, response: reqwest::Response) -> ApiResult<String> {
        let status = response.status();
        debug!("API response status: {}", status);

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return Err(self.classify(e).await),
        };
        trace!("API response preview: {}", truncate(&text, BODY_PREVIEW_CHARS));

        if !status.is_success() {
            let err = ApiError::Status {
                code: status.as_u16(),
                body: truncate(&text, BODY_PREVIEW_CHARS),
            };
            warn!("API request error: {}", err);
            return Err(err);
        }
        Ok(text)
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> ApiResult<Value> {
        let url = self.url(path);
        debug!("GET {}", url);

        let response = match self.client.get(&url).query(query).send().await {
            Ok(response) => response,
            Err(e) => return Err(self.classify(e).await),
        };
        let text = self.checked_text(response).await?;

        serde_json::from_str(&text).map_err(|e| {
            warn!("JSON parsing error: {}", e);
            ApiError::Decode(e.to_string())
        })
    }

    async fn post_text(&self, path: &str, body: &Value) -> ApiResult<String> {
        let url = self.url(path);
        debug!("POST {}", url);
        trace!("Request body: {}", body);

        let response = match self.client.post(&url).json(body).send().await {
            Ok(response) => response,
            Err(e) => return Err(self.classify(e).await),
        };
        self.checked_text(response).await
    }
}
