use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::SchemaDescription;
use crate::error::ValidationError;

/// Largest record count the backend accepts in one job.
pub const MAX_RECORD_COUNT: u32 = 100_000;

/// File encodings the backend writes generated records to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
    Both,
}

impl OutputFormat {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Both => "both",
        }
    }
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "both" => Ok(Self::Both),
            _ => Err(ValidationError::InvalidOutputFormat {
                value: value.to_owned(),
            }),
        }
    }
}

/// Where the backend persists the generated records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageOption {
    /// Nothing selected yet. Not submittable.
    #[default]
    #[serde(rename = "")]
    None,
    #[serde(rename = "azure_sql")]
    SqlTarget,
    #[serde(rename = "blob_storage")]
    BlobTarget,
    #[serde(rename = "both")]
    Both,
}

impl StorageOption {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "",
            Self::SqlTarget => "azure_sql",
            Self::BlobTarget => "blob_storage",
            Self::Both => "both",
        }
    }

    pub const fn is_selected(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl FromStr for StorageOption {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "azure_sql" | "azure-sql" | "sql" => Ok(Self::SqlTarget),
            "blob_storage" | "blob-storage" | "blob" => Ok(Self::BlobTarget),
            "both" => Ok(Self::Both),
            _ => Err(ValidationError::InvalidStorageOption {
                value: value.to_owned(),
            }),
        }
    }
}

/// Body of `POST /generate-data-async/`.
///
/// Deserialization goes through [`GenerationRequest::new`], so a decoded
/// request satisfies the same bounds as a constructed one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawGenerationRequest")]
pub struct GenerationRequest {
    schema: SchemaDescription,
    record_count: u32,
    output_format: OutputFormat,
    storage_option: StorageOption,
}

impl GenerationRequest {
    pub fn new(
        schema: SchemaDescription,
        record_count: u32,
        output_format: OutputFormat,
        storage_option: StorageOption,
    ) -> Result<Self, ValidationError> {
        schema.validate_for_generation()?;
        if record_count == 0 || record_count > MAX_RECORD_COUNT {
            return Err(ValidationError::RecordCountOutOfRange {
                value: u64::from(record_count),
                max: u64::from(MAX_RECORD_COUNT),
            });
        }

        Ok(Self {
            schema,
            record_count,
            output_format,
            storage_option,
        })
    }

    /// Callers gate submission on this; the job controller does not.
    pub fn ensure_storage_selected(&self) -> Result<(), ValidationError> {
        if self.storage_option.is_selected() {
            Ok(())
        } else {
            Err(ValidationError::StorageNotSelected)
        }
    }

    pub fn schema(&self) -> &SchemaDescription {
        &self.schema
    }

    pub const fn record_count(&self) -> u32 {
        self.record_count
    }

    pub const fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    pub const fn storage_option(&self) -> StorageOption {
        self.storage_option
    }
}

#[derive(Deserialize)]
struct RawGenerationRequest {
    schema: SchemaDescription,
    record_count: u32,
    #[serde(default)]
    output_format: OutputFormat,
    #[serde(default)]
    storage_option: StorageOption,
}

impl TryFrom<RawGenerationRequest> for GenerationRequest {
    type Error = ValidationError;

    fn try_from(raw: RawGenerationRequest) -> Result<Self, Self::Error> {
        Self::new(
            raw.schema,
            raw.record_count,
            raw.output_format,
            raw.storage_option,
        )
    }
}
