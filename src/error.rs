//! Error types for fetching, persisting and running a scrape.
//!
//! Each concern gets its own enum so callers can tell a per-page failure
//! (which the scheduler logs and skips) from a run-level failure (which ends
//! the process with a non-zero status).

use reqwest::StatusCode;
use std::path::PathBuf;

/// Failure of a single page fetch.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Transport-level failure: connect error, timeout, broken body.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a status outside 2xx.
    ///
    /// `body` holds whatever could be read from the response.
    #[error("unexpected HTTP status {status}")]
    Status { status: StatusCode, body: String },

    /// Every attempt failed with a retryable condition.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: usize,
        last: Box<FetchError>,
    },

    /// The run's cancellation token fired.
    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    /// HTTP status carried by this error, looking through `RetriesExhausted`.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::RetriesExhausted { last, .. } => last.status(),
            FetchError::Request(e) => e.status(),
            FetchError::Cancelled => None,
        }
    }
}

/// Failure while writing the dataset file.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failure while loading the optional YAML configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Run-level failure. Anything here aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("run cancelled")]
    Cancelled,

    #[error("invalid base URL '{url}': {source}")]
    BaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error(transparent)]
    Sink(#[from] SinkError),
}
