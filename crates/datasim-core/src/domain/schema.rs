use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Column type label. Editor labels are named; anything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    Select,
    Text,
    Number,
    Date,
    Other(String),
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Select => "select",
            Self::Text => "text",
            Self::Number => "number",
            Self::Date => "date",
            Self::Other(label) => label,
        }
    }
}

impl From<String> for FieldType {
    fn from(label: String) -> Self {
        match label.as_str() {
            "select" => Self::Select,
            "text" => Self::Text,
            "number" => Self::Number,
            "date" => Self::Date,
            _ => Self::Other(label),
        }
    }
}

impl From<FieldType> for String {
    fn from(value: FieldType) -> Self {
        match value {
            FieldType::Other(label) => label,
            known => known.as_str().to_owned(),
        }
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a field's values are chosen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldMode {
    /// Pick from the built-in generators.
    #[default]
    Select,
    /// User-supplied constraints drive generation.
    Custom,
    Other(String),
}

impl FieldMode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Select => "select",
            Self::Custom => "custom",
            Self::Other(label) => label,
        }
    }
}

impl From<String> for FieldMode {
    fn from(label: String) -> Self {
        match label.as_str() {
            "select" => Self::Select,
            "custom" => Self::Custom,
            _ => Self::Other(label),
        }
    }
}

impl From<FieldMode> for String {
    fn from(value: FieldMode) -> Self {
        match value {
            FieldMode::Other(label) => label,
            known => known.as_str().to_owned(),
        }
    }
}

/// One column of a [`SchemaDescription`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub mode: FieldMode,
    #[serde(default)]
    pub constraints: BTreeMap<String, String>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            mode: FieldMode::default(),
            constraints: BTreeMap::new(),
        }
    }

    pub fn with_mode(mut self, mode: FieldMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_constraint(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.constraints.insert(key.into(), value.into());
        self
    }
}

/// Named table definition submitted for generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescription {
    #[serde(default)]
    pub table_name: String,
    pub fields: Vec<FieldSpec>,
}

impl SchemaDescription {
    pub fn new(table_name: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            table_name: table_name.into(),
            fields,
        }
    }

    /// Generation needs at least one field; the table name may stay blank.
    pub fn validate_for_generation(&self) -> Result<(), ValidationError> {
        if self.fields.is_empty() {
            return Err(ValidationError::EmptyFields);
        }
        Ok(())
    }

    /// Table name usable for relational persistence, if one was given.
    pub fn relational_table_name(&self) -> Option<&str> {
        let trimmed = self.table_name.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}
