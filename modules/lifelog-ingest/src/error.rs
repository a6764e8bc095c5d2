//! Error types for the ingestion pipeline.
//!
//! Per-item errors (`ParseError`, `WriteError`) are logged and counted by the
//! driver. Run-level errors (`IngestError`) end the run.

use std::fmt;
use std::path::{Path, PathBuf};

/// A single input file could not be turned into a record.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub path: PathBuf,
    pub message: String,
}

impl ParseError {
    pub fn new(path: &Path, message: impl Into<String>) -> Self {
        ParseError {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.path.display(), self.message)
    }
}

impl std::error::Error for ParseError {}

/// A single record could not be persisted.
#[derive(Debug, Clone)]
pub struct WriteError {
    pub path: PathBuf,
    pub message: String,
}

impl WriteError {
    pub fn new(path: &Path, message: impl Into<String>) -> Self {
        WriteError {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to write {}: {}", self.path.display(), self.message)
    }
}

impl std::error::Error for WriteError {}

/// Outcome of a failed page request.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// HTTP 429. The only transient kind.
    RateLimited,
    /// HTTP 401.
    Unauthorized,
    Status { code: u16, body: String },
    Transport(String),
    Decode(String),
}

impl ApiError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::RateLimited)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::RateLimited => write!(f, "received 429 Too Many Requests"),
            ApiError::Unauthorized => write!(f, "unauthorized: check API token"),
            ApiError::Status { code, body } => write!(f, "[HTTP {}] {}", code, body),
            ApiError::Transport(msg) => write!(f, "request failed: {}", msg),
            ApiError::Decode(msg) => write!(f, "invalid response body: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

/// Configuration could not be resolved.
#[derive(Debug, Clone)]
pub struct ConfigError(pub String);

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "configuration error: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

/// Conditions that abort a whole run.
#[derive(Debug)]
pub enum IngestError {
    SourceUnreadable { path: PathBuf, message: String },
    /// A page was rate limited again after the single backoff retry.
    RateLimitExhausted { page: u32 },
    Api { page: u32, error: ApiError },
    Config(ConfigError),
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::SourceUnreadable { path, message } => {
                write!(f, "cannot read source directory {}: {}", path.display(), message)
            }
            IngestError::RateLimitExhausted { page } => {
                write!(f, "page {} rate limited again after backoff, aborting", page)
            }
            IngestError::Api { page, error } => write!(f, "page {}: {}", page, error),
            IngestError::Config(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for IngestError {}

impl From<ConfigError> for IngestError {
    fn from(e: ConfigError) -> Self {
        IngestError::Config(e)
    }
}
