//! Database schema and row types

use chrono::{DateTime, Utc};

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS presets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    params TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_presets_name ON presets(name, id);
";

/// A stored preset row. `params` is raw JSON; decoding happens in the lab,
/// where unknown values can be rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetRow {
    pub id: i64,
    pub name: String,
    pub params: String,
    pub created_at: DateTime<Utc>,
}
