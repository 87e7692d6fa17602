// src/error.rs
//! Error taxonomy for the ingest pipeline.
//!
//! Each layer recovers its own failures: a [`Rejection`] drops one record, a
//! [`FetchError`] ends pagination with a partial result, a [`StreamError`] turns
//! into failed-record counts. Only [`ConfigError`] is fatal, and only at startup.

use thiserror::Error;

/// Why the normalizer refused a raw record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("missing url")]
    MissingUrl,
    #[error("missing title")]
    MissingTitle,
    #[error("field `{field}` has an unexpected type")]
    InvalidField { field: &'static str },
    #[error("required field `{field}` is empty after cleaning")]
    EmptyAfterCleaning { field: &'static str },
}

/// One search API page request failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("search api transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("search api returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("search api error ({code}): {message}")]
    Api { code: String, message: String },
    #[error("search api response could not be decoded: {0}")]
    Decode(String),
}

/// The stream service refused or never received a request.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("stream `{0}` not found")]
    NotFound(String),
    #[error("stream service error ({code}): {message}")]
    Service { code: String, message: String },
    #[error("stream transport error: {0}")]
    Transport(String),
    #[error("record could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Startup precondition failed; the process must not start the scheduler.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),
    #[error("{key} has invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("reading config file {path}: {reason}")]
    File { path: String, reason: String },
}
