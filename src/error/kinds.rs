use std::{fmt, io};

/// Crate-wide `Result` type using [`ExportError`] as the error.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Result type returned by every call against the remote API.
///
/// Transport failures are never fatal to a run, so callers match on the
/// [`ApiError`] kind instead of propagating it with `?`.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Top-level error type for export operations.
#[derive(Debug)]
pub enum ExportError {
    /// Configuration and startup errors.
    Config(ConfigError),

    /// Output file errors.
    Write(WriteError),

    /// I/O errors.
    Io(io::Error),
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// The API credential environment variable is unset or empty.
    MissingCredential(String),

    /// Config file could not be read.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Missing required field.
    MissingField(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },

    /// Generic configuration error.
    Generic(String),
}

/// Transport-level failures, classified so the orchestrator can react to
/// each kind separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request did not complete within the configured timeout.
    Timeout,

    /// Connection could not be established.
    Connect(String),

    /// The server answered with a non-2xx status.
    Status { code: u16, body: String },

    /// The response body could not be decoded.
    Decode(String),

    /// Any other request failure (building the request, redirects, ...).
    Request(String),
}

/// Output file errors.
#[derive(Debug)]
pub enum WriteError {
    /// Failed to create the destination directory.
    CreateDir { path: String, source: io::Error },

    /// Failed to encode rows as CSV.
    Encode(String),

    /// Failed to write the file.
    WriteFile { path: String, source: io::Error },
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Config(e) => write!(f, "Configuration error: {e}"),
            ExportError::Write(e) => write!(f, "Write error: {e}"),
            ExportError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingCredential(var) => write!(
                f,
                "API key not found. Set the {var} environment variable."
            ),
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::MissingField(field) => write!(f, "Missing required field: {field}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
            ConfigError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Timeout => write!(f, "Request timed out"),
            ApiError::Connect(msg) => write!(f, "Connection failed: {msg}"),
            ApiError::Status { code, body } => {
                if body.is_empty() {
                    write!(f, "HTTP {code}")
                } else {
                    write!(f, "HTTP {code}: {body}")
                }
            }
            ApiError::Decode(msg) => write!(f, "Failed to decode response: {msg}"),
            ApiError::Request(msg) => write!(f, "Request failed: {msg}"),
        }
    }
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteError::CreateDir { path, source } => {
                write!(f, "Failed to create directory {path}: {source}")
            }
            WriteError::Encode(msg) => write!(f, "Failed to encode CSV: {msg}"),
            WriteError::WriteFile { path, source } => {
                write!(f, "Failed to write {path}: {source}")
            }
        }
    }
}

impl std::error::Error for ExportError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for ApiError {}
impl std::error::Error for WriteError {}

impl ApiError {
    /// Classify a reqwest failure into an [`ApiError`] kind.
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_connect() {
            ApiError::Connect(err.to_string())
        } else if let Some(status) = err.status() {
            ApiError::Status {
                code: status.as_u16(),
                body: String::new(),
            }
        } else if err.is_decode() || err.is_body() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Request(err.to_string())
        }
    }

    /// Whether this failure should trigger the network diagnostic probe.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Timeout)
    }
}

/* ========================= Conversions to ExportError ========================= */

impl From<io::Error> for ExportError {
    fn from(err: io::Error) -> Self {
        ExportError::Io(err)
    }
}

impl From<ConfigError> for ExportError {
    fn from(err: ConfigError) -> Self {
        ExportError::Config(err)
    }
}

impl From<WriteError> for ExportError {
    fn from(err: WriteError) -> Self {
        ExportError::Write(err)
    }
}
