//! SQLite-based record store.
//!
//! Tables carry no uniqueness constraints; duplicate prevention is the
//! registrar's existence check, as with the hosted store.

use super::{Filter, Record, RecordStore, Table};
use crate::error::{Result, TldwError};
use async_trait::async_trait;
use rusqlite::{params_from_iter, Connection};
use serde_json::Value;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        "userId" TEXT NOT NULL,
        "email" TEXT
    );

    CREATE TABLE IF NOT EXISTS videos (
        "videoId" TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS user_videos (
        "videoId" TEXT NOT NULL,
        "userId" TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_users_user_id ON users("userId");
    CREATE INDEX IF NOT EXISTS idx_videos_video_id ON videos("videoId");
    CREATE INDEX IF NOT EXISTS idx_user_videos_pair ON user_videos("videoId", "userId");
"#;

/// SQLite record store.
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    /// Open (or create) a database file.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite record store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Total rows in a table.
    pub fn count(&self, table: Table) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table.name()),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| TldwError::RecordStore(format!("Failed to acquire lock: {}", e)))
    }
}

fn value_to_sql(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    #[instrument(skip(self))]
    async fn select(&self, table: Table, filter: &Filter<'_>) -> Result<Vec<Record>> {
        for (column, _) in filter {
            table.check_column(column)?;
        }

        let columns = table.columns();
        let projection = columns
            .iter()
            .map(|c| format!("\"{}\"", c))
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!("SELECT {} FROM {}", projection, table.name());
        if !filter.is_empty() {
            let clauses = filter
                .iter()
                .enumerate()
                .map(|(i, (column, _))| format!("\"{}\" = ?{}", column, i + 1))
                .collect::<Vec<_>>()
                .join(" AND ");
            sql.push_str(" WHERE ");
            sql.push_str(&clauses);
        }

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(filter.iter().map(|(_, v)| *v)), |row| {
            let mut record = Record::new();
            for (i, column) in columns.iter().enumerate() {
                let value: Option<String> = row.get(i)?;
                record.insert(
                    column.to_string(),
                    value.map(Value::String).unwrap_or(Value::Null),
                );
            }
            Ok(record)
        })?;

        let records = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        debug!("Selected {} rows from {}", records.len(), table);
        Ok(records)
    }

    #[instrument(skip(self, row))]
    async fn insert(&self, table: Table, row: Record) -> Result<()> {
        if row.is_empty() {
            return Err(TldwError::RecordStore(format!("Empty row for {}", table)));
        }
        for column in row.keys() {
            table.check_column(column)?;
        }

        let columns = row
            .keys()
            .map(|c| format!("\"{}\"", c))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=row.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.name(),
            columns,
            placeholders
        );

        let conn = self.lock()?;
        conn.execute(&sql, params_from_iter(row.values().map(value_to_sql)))?;

        debug!("Inserted row into {}", table);
        Ok(())
    }
}
