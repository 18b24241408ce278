//! Preset store
//!
//! Whole-collection storage for named parameter tuples. Names may repeat; a
//! lookup resolves to the most recently saved preset with that name.

use super::params::VariantParams;
use crate::db::Database;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named, saved parameter tuple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub params: VariantParams,
    pub created_at: DateTime<Utc>,
}

impl Preset {
    pub fn new(name: impl Into<String>, params: VariantParams) -> Self {
        Self {
            name: name.into(),
            params,
            created_at: Utc::now(),
        }
    }
}

/// Durable preset collection
#[async_trait]
pub trait PresetStore: Send + Sync {
    /// Every preset, oldest first
    async fn read_all(&self) -> Result<Vec<Preset>, String>;

    async fn append(&self, preset: Preset) -> Result<(), String>;

    /// Delete every preset with this name, returning how many were removed
    async fn delete(&self, name: &str) -> Result<usize, String>;
}

/// Latest preset saved under `name`
pub fn resolve<'a>(presets: &'a [Preset], name: &str) -> Option<&'a Preset> {
    presets.iter().rev().find(|preset| preset.name == name)
}

/// Adapter to use Database as a preset store
#[derive(Clone)]
pub struct DatabasePresetStore {
    db: Database,
}

impl DatabasePresetStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PresetStore for DatabasePresetStore {
    async fn read_all(&self) -> Result<Vec<Preset>, String> {
        let rows = self.db.list_presets().map_err(|e| e.to_string())?;
        let presets = rows
            .into_iter()
            .filter_map(|row| match serde_json::from_str::<VariantParams>(&row.params) {
                Ok(params) => Some(Preset {
                    name: row.name,
                    params,
                    created_at: row.created_at,
                }),
                Err(e) => {
                    tracing::warn!(preset_id = row.id, name = %row.name, error = %e, "Skipping unreadable preset");
                    None
                }
            })
            .collect();
        Ok(presets)
    }

    async fn append(&self, preset: Preset) -> Result<(), String> {
        let params = serde_json::to_string(&preset.params).map_err(|e| e.to_string())?;
        self.db
            .insert_preset(&preset.name, &params, preset.created_at)
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<usize, String> {
        self.db.delete_presets(name).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lab::params::RiskTolerance;

    fn store() -> DatabasePresetStore {
        DatabasePresetStore::new(Database::open_in_memory().unwrap())
    }

    #[tokio::test]
    async fn test_round_trip_through_sqlite() {
        let store = store();
        store
            .append(Preset::new("careful", VariantParams::cautious()))
            .await
            .unwrap();

        let presets = store.read_all().await.unwrap();
        assert_eq!(presets.len(), 1);
        assert_eq!(presets[0].params, VariantParams::cautious());
    }

    #[tokio::test]
    async fn test_duplicate_names_resolve_to_latest() {
        let store = store();
        store
            .append(Preset::new("mine", VariantParams::default()))
            .await
            .unwrap();
        let mut bold = VariantParams::default();
        bold.risk_tolerance = RiskTolerance::Adventurous;
        store.append(Preset::new("mine", bold)).await.unwrap();

        let presets = store.read_all().await.unwrap();
        assert_eq!(presets.len(), 2);
        assert_eq!(resolve(&presets, "mine").unwrap().params, bold);
        assert!(resolve(&presets, "other").is_none());
    }

    #[tokio::test]
    async fn test_unreadable_rows_are_skipped() {
        let db = Database::open_in_memory().unwrap();
        db.insert_preset("broken", r#"{"confidence_range":"Wild"}"#, Utc::now())
            .unwrap();
        let store = DatabasePresetStore::new(db);
        store
            .append(Preset::new("fine", VariantParams::default()))
            .await
            .unwrap();

        let presets = store.read_all().await.unwrap();
        assert_eq!(presets.len(), 1);
        assert_eq!(presets[0].name, "fine");
    }

    #[tokio::test]
    async fn test_delete_counts_rows() {
        let store = store();
        store.append(Preset::new("x", VariantParams::default())).await.unwrap();
        store.append(Preset::new("x", VariantParams::cautious())).await.unwrap();

        assert_eq!(store.delete("x").await.unwrap(), 2);
        assert!(store.read_all().await.unwrap().is_empty());
    }
}
