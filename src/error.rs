// src/error.rs
//! Error taxonomy for the monitoring engine.
//!
//! - `ExtractionFailure` and `StorageFailure` are source-local: the change
//!   detector records them into the source's `last_error` and the cycle moves on.
//! - `ConfigurationError` is fatal at startup only.

use thiserror::Error;

use crate::model::SourceKind;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionFailure {
    #[error("timeout")]
    Timeout,

    #[error("source unreachable: {0}")]
    Unreachable(String),

    #[error("unexpected HTTP status {status}")]
    HttpStatus { status: u16 },

    #[error("no {kind} posts found on page")]
    NoContent { kind: SourceKind },

    #[error("render runtime unavailable: {0}")]
    RuntimeUnavailable(String),
}

impl From<reqwest::Error> for ExtractionFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExtractionFailure::Timeout
        } else {
            ExtractionFailure::Unreachable(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageFailure {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("store connection mutex poisoned")]
    Poisoned,

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("reading config from {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("no sources configured")]
    NoSources,

    #[error("unknown source kind: {0}")]
    UnknownKind(String),

    #[error("source {0} configured more than once")]
    DuplicateSource(SourceKind),

    #[error("invalid url for {kind}: {url}")]
    InvalidUrl { kind: SourceKind, url: String },

    #[error("invalid value for {name}: {value:?}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("check interval must be at least one second")]
    InvalidInterval,

    #[error("building HTTP client: {0}")]
    HttpClient(String),
}
