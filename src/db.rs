//! Database module
//!
//! Durable storage for lab presets. Presets are the only state that outlives
//! a session.

mod schema;

#[allow(unused_imports)] // Public API re-exports
pub use schema::{PresetRow, SCHEMA};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Failed to create database directory: {0}")]
    Io(#[from] std::io::Error),
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Preset Operations ====================

    /// Append a preset row. Names are not unique.
    pub fn insert_preset(
        &self,
        name: &str,
        params_json: &str,
        created_at: DateTime<Utc>,
    ) -> DbResult<PresetRow> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO presets (name, params, created_at) VALUES (?1, ?2, ?3)",
            params![name, params_json, created_at.to_rfc3339()],
        )?;

        Ok(PresetRow {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            params: params_json.to_string(),
            created_at,
        })
    }

    /// All preset rows in save order
    pub fn list_presets(&self) -> DbResult<Vec<PresetRow>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT id, name, params, created_at FROM presets ORDER BY id ASC")?;

        let rows = stmt.query_map([], |row| {
            Ok(PresetRow {
                id: row.get(0)?,
                name: row.get(1)?,
                params: row.get(2)?,
                created_at: parse_datetime(&row.get::<_, String>(3)?),
            })
        })?;

        let presets = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(presets)
    }

    /// Delete every row with this name, returning how many were removed
    pub fn delete_presets(&self, name: &str) -> DbResult<usize> {
        let conn = self.conn.lock().unwrap();
        let removed = conn.execute("DELETE FROM presets WHERE name = ?1", params![name])?;
        Ok(removed)
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
