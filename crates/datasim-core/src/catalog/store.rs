use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::error::CatalogError;

/// Key the saved schemas are stored under; also the document's file stem.
pub const CATALOG_KEY: &str = "chat_history";

/// One saved schema document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl CatalogEntry {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            content: content.into(),
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

/// Display name for saved content: its `table_name` when the content is a
/// JSON schema that has one, otherwise `Dataset <n>`.
pub fn entry_name_for(content: &str, existing: usize) -> String {
    serde_json::from_str::<Value>(content)
        .ok()
        .and_then(|value| {
            value
                .get("table_name")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_owned)
        })
        .unwrap_or_else(|| format!("Dataset {}", existing + 1))
}

/// File-backed collection of [`CatalogEntry`] values.
///
/// The collection is always read and written whole.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    path: PathBuf,
}

impl CatalogStore {
    /// Store rooted at `data_dir`, using `chat_history.json` inside it.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(format!("{CATALOG_KEY}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All entries; a store that was never written is empty.
    pub fn load_all(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(error.into()),
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&raw).map_err(CatalogError::Document)
    }

    /// Replaces the stored collection. Written to a sibling temp file first,
    /// then renamed over the document.
    pub fn save_all(&self, entries: &[CatalogEntry]) -> Result<(), CatalogError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let document = serde_json::to_string_pretty(entries).map_err(CatalogError::Document)?;
        let staging = self.path.with_extension("json.tmp");
        std::fs::write(&staging, document)?;
        if let Err(error) = std::fs::rename(&staging, &self.path) {
            let _ = std::fs::remove_file(&staging);
            return Err(error.into());
        }

        debug!(path = %self.path.display(), entries = entries.len(), "catalog saved");
        Ok(())
    }

    /// Appends a new entry with a fresh id and the current time.
    pub fn add(
        &self,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<CatalogEntry, CatalogError> {
        let mut entries = self.load_all()?;
        let entry = CatalogEntry::new(name, content);
        entries.push(entry.clone());
        self.save_all(&entries)?;
        Ok(entry)
    }

    /// Removes the entry with `id`. Returns whether anything was removed.
    pub fn remove(&self, id: &str) -> Result<bool, CatalogError> {
        let mut entries = self.load_all()?;
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        if entries.len() == before {
            return Ok(false);
        }
        self.save_all(&entries)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_names_prefer_the_schema_table_name() {
        assert_eq!(
            entry_name_for(r#"{"table_name":"orders","fields":[]}"#, 3),
            "orders"
        );
        assert_eq!(entry_name_for(r#"{"table_name":"  ","fields":[]}"#, 3), "Dataset 4");
        assert_eq!(entry_name_for("not json", 0), "Dataset 1");
    }

    #[test]
    fn entries_serialize_with_rfc3339_timestamps() {
        let entry = CatalogEntry {
            id: String::from("00000000-0000-4000-8000-000000000000"),
            name: String::from("orders"),
            content: String::from("{}"),
            timestamp: OffsetDateTime::UNIX_EPOCH,
        };

        let value = serde_json::to_value(&entry).expect("encode");

        assert_eq!(value["timestamp"], "1970-01-01T00:00:00Z");
        let decoded: CatalogEntry = serde_json::from_value(value).expect("decode");
        assert_eq!(decoded, entry);
    }

    #[test]
    fn new_entries_get_distinct_v4_ids() {
        let first = CatalogEntry::new("a", "{}");
        let second = CatalogEntry::new("b", "{}");

        assert_ne!(first.id, second.id);
        let parsed = Uuid::parse_str(&first.id).expect("uuid");
        assert_eq!(parsed.get_version_num(), 4);
    }
}
