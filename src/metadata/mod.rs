//! Relational metadata for users, videos and their association.
//!
//! The [`RecordStore`] trait is a minimal select/insert contract over the
//! three known tables; [`MetadataRegistrar`] builds the idempotent
//! registration on top of it.

mod postgrest;
mod registrar;
mod sqlite;

pub use postgrest::PostgrestRecordStore;
pub use registrar::{MetadataRegistrar, Registration};
pub use sqlite::SqliteRecordStore;

use crate::error::{Result, TldwError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A row as column name to JSON value.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Tables the pipeline writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Users,
    Videos,
    UserVideos,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::Videos => "videos",
            Table::UserVideos => "user_videos",
        }
    }

    /// Columns a row of this table may carry.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Table::Users => &["userId", "email"],
            Table::Videos => &["videoId"],
            Table::UserVideos => &["videoId", "userId"],
        }
    }

    /// Fail unless `column` belongs to this table.
    pub fn check_column(&self, column: &str) -> Result<()> {
        if self.columns().contains(&column) {
            Ok(())
        } else {
            Err(TldwError::RecordStore(format!(
                "Unknown column {} for table {}",
                column,
                self.name()
            )))
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Equality filter: every `(column, value)` pair must match.
pub type Filter<'a> = [(&'a str, &'a str)];

/// Trait for relational store implementations.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Rows of `table` matching every equality in `filter`.
    async fn select(&self, table: Table, filter: &Filter<'_>) -> Result<Vec<Record>>;

    /// Insert one row.
    async fn insert(&self, table: Table, row: Record) -> Result<()>;
}

/// Build a record from column/value pairs.
pub fn record<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Record {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
        .collect()
}
