//! Configuration storage
//!
//! Loads and saves the storage layer's [`StoreConfig`], with environment
//! variables taking precedence over the file on disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::storage::{get_data_dir, Result};
use crate::types::StoreConfig;

pub const ENV_PROJECT_ID: &str = "MEDSHEETS_PROJECT_ID";
pub const ENV_API_KEY: &str = "MEDSHEETS_API_KEY";
pub const ENV_STORAGE_BUCKET: &str = "MEDSHEETS_STORAGE_BUCKET";
pub const ENV_FIRESTORE_URL: &str = "MEDSHEETS_FIRESTORE_URL";
pub const ENV_STORAGE_URL: &str = "MEDSHEETS_STORAGE_URL";

/// Get the config file path
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("config.json"))
}

/// Load the configuration from the data directory
///
/// Returns defaults (plus environment overrides) if the file doesn't exist or is corrupted
pub fn load_config() -> StoreConfig {
    let mut config = match get_config_path() {
        Ok(path) => load_config_from(&path),
        Err(e) => {
            tracing::warn!("No data directory, using default config: {}", e);
            StoreConfig::default()
        }
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    config.validate();
    config
}

/// Load a config file, falling back to defaults on any failure
pub fn load_config_from(path: &Path) -> StoreConfig {
    match load_config_internal(path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            StoreConfig::default()
        }
    }
}

fn load_config_internal(path: &Path) -> Result<StoreConfig> {
    if !path.exists() {
        tracing::info!("Config file not found, using defaults");
        return Ok(StoreConfig::default());
    }

    let json = fs::read_to_string(path)?;
    let mut config: StoreConfig = serde_json::from_str(&json)?;
    config.validate();

    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Save the configuration to the data directory
pub fn save_config(config: &StoreConfig) -> Result<()> {
    save_config_to(&get_config_path()?, config)
}

pub fn save_config_to(path: &Path, config: &StoreConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json)?;

    tracing::debug!("Saved config to {}", path.display());
    Ok(())
}

/// Overwrite fields from `lookup`, which maps a variable name to its value
pub fn apply_env_overrides(config: &mut StoreConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup(ENV_PROJECT_ID) {
        config.project_id = v;
    }
    if let Some(v) = lookup(ENV_API_KEY) {
        config.api_key = Some(v);
    }
    if let Some(v) = lookup(ENV_STORAGE_BUCKET) {
        config.storage_bucket = v;
    }
    if let Some(v) = lookup(ENV_FIRESTORE_URL) {
        config.firestore_base_url = v;
    }
    if let Some(v) = lookup(ENV_STORAGE_URL) {
        config.storage_base_url = v;
    }
}
