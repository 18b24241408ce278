//! Environment-driven configuration

use crate::guide::state::DEFAULT_MAX_INPUT_CHARS;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    pub db_path: PathBuf,
    /// Base URL of the suggestion service. Unset means scripted mode.
    pub api_base: Option<String>,
    pub remote_timeout: Duration,
    pub max_input_chars: usize,
    /// Where draft exports are written
    pub output_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            db_path: default_db_path(None),
            api_base: None,
            remote_timeout: Duration::from_secs(DEFAULT_REMOTE_TIMEOUT_SECS),
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            output_dir: PathBuf::from("./output"),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unparsable numbers fall back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let number = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        Self {
            port: lookup("BLUEPRINT_PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.port),
            db_path: lookup("BLUEPRINT_DB_PATH")
                .map_or_else(|| default_db_path(lookup("HOME")), PathBuf::from),
            api_base: lookup("BLUEPRINT_API_BASE")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .filter(|v| !v.is_empty()),
            remote_timeout: number("BLUEPRINT_REMOTE_TIMEOUT_SECS")
                .filter(|secs| *secs > 0)
                .map_or(defaults.remote_timeout, Duration::from_secs),
            max_input_chars: number("BLUEPRINT_MAX_INPUT")
                .and_then(|n| usize::try_from(n).ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_input_chars),
            output_dir: lookup("BLUEPRINT_OUTPUT_DIR")
                .map_or(defaults.output_dir, PathBuf::from),
        }
    }
}

fn default_db_path(home: Option<String>) -> PathBuf {
    let home = home
        .or_else(|| std::env::var("HOME").ok())
        .unwrap_or_else(|| ".".to_string());
    PathBuf::from(home).join(".blueprint-guide").join("presets.db")
}
