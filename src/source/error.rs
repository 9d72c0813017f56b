//! Errors raised while loading officer and target data.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to obtain or decode rollup input.
#[derive(Error, Debug)]
pub enum SourceError {
    // ===== Local files =====
    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ===== Payload decoding =====
    #[error("Invalid JSON from {origin}: {source}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unexpected payload from {origin}: {message}")]
    Shape { origin: String, message: String },

    // ===== Backend =====
    #[error("Request to {url} timed out after {seconds}s")]
    Timeout { url: String, seconds: u64 },

    #[error("Cannot connect to backend at {url}")]
    Connect { url: String },

    #[error("Request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Backend error {status} from {url}: {body}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },

    // ===== Configuration =====
    #[error("No officer data source configured (use --leaves or --base-url)")]
    NoSource,
}
