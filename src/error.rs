use std::io;

use thiserror::Error;

/// Failure to retrieve a remote document.
///
/// Callers treat every variant as "skip this item"; none of them ends a run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed after {attempts} attempts: {last_error}")]
    Exhausted {
        url: String,
        attempts: usize,
        last_error: String,
    },
    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Failure to turn a fetched document into a table.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("failed to launch converter '{program}': {reason}")]
    ConverterSpawn { program: String, reason: String },
    #[error("converter exited with {status}: {stderr}")]
    ConverterFailed { status: String, stderr: String },
    #[error("converter output is not a tagged table: {0}")]
    Malformed(String),
    #[error("profile table has only {rows} rows")]
    Incomplete { rows: usize },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NameError {
    #[error("unrecognized name format: '{0}'")]
    Unrecognized(String),
}

/// Identity store failures. Every variant is fatal for the run.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database query failed: {0}")]
    Query(#[from] sqlx::Error),
    #[error("people table is missing columns: {}", .missing.join(", "))]
    SchemaMismatch { missing: Vec<String> },
    #[error("constraint violated: {0}")]
    Constraint(String),
    #[error("identity store unavailable: {0}")]
    Unavailable(String),
}

/// Errors that terminate a whole run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to read work source: {0}")]
    Input(#[from] io::Error),
    #[error("failed to write {path}: {source}")]
    Output { path: String, source: io::Error },
    #[error("worker task failed: {0}")]
    Worker(String),
    #[error("failed to set up run: {0}")]
    Setup(String),
}
