//! # Domain Models
//!
//! Schema and request types sent to the generation backend.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SchemaDescription`] | Named table definition with ordered fields |
//! | [`FieldSpec`] | One column: name, type label, mode, constraints |
//! | [`GenerationRequest`] | Validated body of a generation job submission |
//! | [`OutputFormat`] | `csv`, `json` or `both` |
//! | [`StorageOption`] | Backend persistence target |
//!
//! Construction validates the invariants the backend relies on (non-empty
//! fields, record count within `1..=100000`). Whether a storage option has
//! been selected is checked separately by the caller before submitting.

mod request;
mod schema;

pub use request::{GenerationRequest, OutputFormat, StorageOption, MAX_RECORD_COUNT};
pub use schema::{FieldMode, FieldSpec, FieldType, SchemaDescription};
