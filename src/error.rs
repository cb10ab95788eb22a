//! Error types for each layer of the sync run.
//!
//! - `GithubError`: HTTP client and response classification
//! - `StoreError`: reading and writing the JSON state files
//! - `ReportError`: rendering and writing the Markdown reports
//! - `SyncError`: startup and settings failures surfaced to `main`

use std::path::PathBuf;
use thiserror::Error;

/// GitHub API client errors
#[derive(Debug, Error)]
pub enum GithubError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Rate limited")]
    RateLimited,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl GithubError {
    /// Failures that only concern the resource being looked up. Rate limits
    /// are retried by the paginator; bad credentials (401) abort the run.
    pub fn is_item_local(&self) -> bool {
        match self {
            GithubError::Forbidden(_) | GithubError::NotFound(_) => true,
            GithubError::Api { status, .. } => matches!(status, 410 | 422),
            _ => false,
        }
    }
}

/// Persistent store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not replace {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },
}

/// Markdown report errors
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Could not write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Table rendering failed: {0}")]
    Table(String),
}

/// Startup and configuration errors
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("GITHUB_TOKEN is not set")]
    MissingCredential,

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("GitHub error: {0}")]
    Github(#[from] GithubError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),
}
