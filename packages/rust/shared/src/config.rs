//! Application configuration for collegecms.
//!
//! User config lives at `~/.collegecms/collegecms.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CollegeCmsError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "collegecms.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".collegecms";

/// Default database file name inside the config directory.
const DATABASE_FILE_NAME: &str = "collegecms.db";

// ---------------------------------------------------------------------------
// Config structs (matching collegecms.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Canonical store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Migration run defaults.
    #[serde(default)]
    pub migration: MigrationDefaults,
}

/// `[storage]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the libSQL database file. Empty means `~/.collegecms/collegecms.db`.
    #[serde(default)]
    pub database_path: String,
}

/// `[migration]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationDefaults {
    /// Number of records processed concurrently. 1 runs the batch sequentially.
    #[serde(default = "default_workers")]
    pub workers: u32,

    /// Keys removed recursively from the raw document before it is embedded
    /// as `rawScraped`.
    #[serde(default = "default_strip_keys")]
    pub strip_keys: Vec<String>,
}

impl Default for MigrationDefaults {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            strip_keys: default_strip_keys(),
        }
    }
}

fn default_workers() -> u32 {
    1
}
fn default_strip_keys() -> Vec<String> {
    vec!["_id".into(), "__v".into()]
}

// ---------------------------------------------------------------------------
// Migration config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime migration configuration — merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Maximum records in flight at once.
    pub workers: usize,
    /// Identity keys stripped from the embedded raw backup.
    pub strip_keys: Vec<String>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for MigrationConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            workers: config.migration.workers.max(1) as usize,
            strip_keys: config.migration.strip_keys.clone(),
        }
    }
}

impl AppConfig {
    /// Resolve the database path, falling back to the config directory.
    pub fn database_path(&self) -> Result<PathBuf> {
        if self.storage.database_path.is_empty() {
            return Ok(config_dir()?.join(DATABASE_FILE_NAME));
        }
        Ok(expand_home(&self.storage.database_path))
    }
}

/// Expand a leading `~/` against the user's home directory.
fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.collegecms/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CollegeCmsError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.collegecms/collegecms.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CollegeCmsError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        CollegeCmsError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CollegeCmsError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CollegeCmsError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CollegeCmsError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
