//! # Catalog
//!
//! | Type | Description |
//! |------|-------------|
//! | [`CatalogStore`] | Local file of saved schema documents |
//! | [`CatalogClient`] | Read-only client for generated tables on the backend |
//!
//! The store keeps one JSON array under the fixed `chat_history` key and is
//! only ever read or replaced whole. The client validates table names the
//! same way the backend does before sending anything.

mod browser;
mod store;

pub use browser::{
    validate_table_name, CatalogClient, ColumnInfo, TableRef, TableSchema, DEFAULT_CONTENT_LIMIT,
    MAX_CONTENT_LIMIT, TABLE_PREFIX,
};
pub use store::{entry_name_for, CatalogEntry, CatalogStore, CATALOG_KEY};
