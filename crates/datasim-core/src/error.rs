use thiserror::Error;

use crate::http_client::HttpError;

/// Validation and contract errors exposed by `datasim-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("schema must define at least one field")]
    EmptyFields,

    #[error("record_count {value} is out of range, expected 1..={max}")]
    RecordCountOutOfRange { value: u64, max: u64 },

    #[error("a storage option must be selected before submitting")]
    StorageNotSelected,

    #[error("invalid output format '{value}', expected one of csv, json, both")]
    InvalidOutputFormat { value: String },
    #[error("invalid storage option '{value}', expected one of azure_sql, blob_storage, both")]
    InvalidStorageOption { value: String },
    #[error("invalid stream format '{value}', expected one of csv, json")]
    InvalidStreamFormat { value: String },

    #[error("table name '{value}' must start with 'synthetic_' and contain only [A-Za-z0-9_]")]
    InvalidTableName { value: String },
}

/// Failure to create a generation job.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("job submission rejected with HTTP status {status_code}")]
    Status { status_code: u16, body: String },

    #[error("job submission transport error: {0}")]
    Transport(#[source] HttpError),

    #[error("job submission response is malformed: {message}")]
    MalformedResponse { message: String },

    #[error("failed to encode generation request: {message}")]
    Encode { message: String },
}

impl SubmissionError {
    /// HTTP status returned by the job-creation endpoint, when there was one.
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

/// Failure of a single status query. Terminal for the job being polled.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PollError {
    #[error("status query failed: {0}")]
    Transport(#[source] HttpError),

    #[error("status query returned HTTP status {status_code}")]
    Status { status_code: u16 },

    #[error("status response is malformed: {message}")]
    Malformed { message: String },

    #[error("polling deadline of {deadline_ms}ms exceeded")]
    DeadlineExceeded { deadline_ms: u64 },
}

/// Streaming read failures. Surfaced to readers as a terminal error chunk.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("HTTP error! status: {status_code}")]
    Open { status_code: u16 },

    #[error("{0}")]
    Connect(#[source] HttpError),

    #[error("stream interrupted: {0}")]
    Interrupted(#[source] HttpError),
}

/// Errors from the table catalog client and the local catalog store.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("catalog request failed: {0}")]
    Transport(#[source] HttpError),

    #[error("catalog endpoint returned HTTP status {status_code}: {body}")]
    Status { status_code: u16, body: String },

    #[error("catalog response is malformed: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("catalog store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("catalog store document is malformed: {0}")]
    Document(#[source] serde_json::Error),
}

/// Invalid configuration values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {name} must be an integer number of milliseconds: '{value}'")]
    InvalidDuration { name: &'static str, value: String },

    #[error("base url must start with http:// or https://: '{value}'")]
    InvalidBaseUrl { value: String },
}
