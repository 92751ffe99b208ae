//! Core client for the datasim synthetic data backend.
//!
//! This crate contains:
//! - Schema and generation request models with validation
//! - Job submission and asynchronous status polling
//! - Incremental reading of live-streamed artifacts
//! - Delimited-text rendering of tabular records
//! - The generated-table browser and the local schema catalog
//! - The HTTP transport seam, with reqwest and scripted implementations

pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod format;
pub mod http_client;
pub mod job;
pub mod job_controller;
pub mod scripted;
pub mod stream;

pub use catalog::{
    entry_name_for, validate_table_name, CatalogClient, CatalogEntry, CatalogStore, ColumnInfo,
    TableRef, TableSchema,
};
pub use config::{stream_format_for, ApiConfig, ApiEndpoints, PollConfig};
pub use domain::{
    FieldMode, FieldSpec, FieldType, GenerationRequest, OutputFormat, SchemaDescription,
    StorageOption, MAX_RECORD_COUNT,
};
pub use error::{
    CatalogError, ConfigError, PollError, StreamError, SubmissionError,
    ValidationError,
};
pub use format::{to_delimited_text, to_delimited_text_value, NO_DATA_SENTINEL};
pub use http_client::{
    ByteStream, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse,
    HttpStreamResponse, ReqwestHttpClient,
};
pub use job::{Job, JobStatus, Progress};
pub use job_controller::{JobController, JobHandle, StatusListener};
pub use scripted::{ScriptedChunk, ScriptedHttpClient, ScriptedReply};
pub use stream::{
    ChunkReader, StreamChunk, StreamFormat, StreamHandle, StreamReader, StreamSelector,
    Utf8Decoder,
};
