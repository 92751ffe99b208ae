use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::{ApiConfig, ApiEndpoints, DEFAULT_REQUEST_TIMEOUT};
use crate::error::{CatalogError, ValidationError};
use crate::http_client::{HttpClient, HttpRequest};

/// Prefix the backend gives every generated table.
pub const TABLE_PREFIX: &str = "synthetic_";
pub const DEFAULT_CONTENT_LIMIT: u32 = 100;
pub const MAX_CONTENT_LIMIT: u32 = 1000;

/// A generated table as listed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    pub id: String,
    /// Table name without the generated-table prefix.
    pub name: String,
    pub table_name: String,
}

impl TableRef {
    pub fn from_table_name(table_name: impl Into<String>) -> Self {
        let table_name = table_name.into();
        let name = table_name.replacen(TABLE_PREFIX, "", 1);
        Self {
            id: table_name.clone(),
            name,
            table_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default)]
    pub max_length: Option<i64>,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub table_name: String,
    pub columns: Vec<ColumnInfo>,
}

/// Checks a table name against the backend's rules.
pub fn validate_table_name(name: &str) -> Result<(), ValidationError> {
    let valid = name.starts_with(TABLE_PREFIX)
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidTableName {
            value: name.to_owned(),
        })
    }
}

/// Typed client for the generated-table endpoints.
#[derive(Clone)]
pub struct CatalogClient {
    client: Arc<dyn HttpClient>,
    endpoints: ApiEndpoints,
    request_timeout: Duration,
}

impl CatalogClient {
    pub fn new(client: Arc<dyn HttpClient>, config: &ApiConfig) -> Self {
        Self {
            client,
            endpoints: config.endpoints(),
            request_timeout: config.request_timeout,
        }
    }

    pub fn with_endpoints(client: Arc<dyn HttpClient>, endpoints: ApiEndpoints) -> Self {
        Self {
            client,
            endpoints,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub async fn list_tables(&self) -> Result<Vec<TableRef>, CatalogError> {
        let names: Vec<String> = self.get_json(self.endpoints.tables()).await?;
        Ok(names.into_iter().map(TableRef::from_table_name).collect())
    }

    /// Up to `limit` rows of `table_name`; the limit is clamped to `1..=1000`.
    pub async fn table_content(
        &self,
        table_name: &str,
        limit: u32,
    ) -> Result<Vec<Map<String, Value>>, CatalogError> {
        validate_table_name(table_name)?;
        let limit = limit.clamp(1, MAX_CONTENT_LIMIT);
        self.get_json(self.endpoints.table_content(table_name, limit))
            .await
    }

    pub async fn table_schema(&self, table_name: &str) -> Result<TableSchema, CatalogError> {
        validate_table_name(table_name)?;
        self.get_json(self.endpoints.table_schema(table_name)).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, CatalogError> {
        let request = HttpRequest::get(url).with_timeout(self.request_timeout);
        let response = self
            .client
            .execute(request)
            .await
            .map_err(CatalogError::Transport)?;

        if !response.is_success() {
            return Err(CatalogError::Status {
                status_code: response.status,
                body: response.body,
            });
        }

        serde_json::from_str(&response.body).map_err(CatalogError::Malformed)
    }
}
