//! Configuration module for unisearch
//!
//! Handles loading settings from YAML files and environment variables.
//! Settings are read once at startup and then passed around explicitly.

mod settings;

pub use settings::*;

use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

/// Env var pointing at a settings file
pub const SETTINGS_PATH_ENV: &str = "UNISEARCH_SETTINGS_PATH";

/// Load settings from the first settings file found, or defaults, then
/// apply environment overrides
pub fn load() -> Result<Settings> {
    let mut settings = match find_settings_file() {
        Some(path) => {
            info!("Loading settings from: {}", path.display());
            Settings::from_file(&path)?
        }
        None => {
            info!("No settings file found, using defaults");
            Settings::default()
        }
    };
    settings.merge_env();
    Ok(settings)
}

/// Candidate settings locations, in lookup order
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Ok(path) = std::env::var(SETTINGS_PATH_ENV) {
        paths.push(PathBuf::from(path));
    }
    paths.push(PathBuf::from("settings.yml"));
    paths.push(PathBuf::from("config/settings.yml"));
    paths.push(PathBuf::from("/etc/unisearch/settings.yml"));
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("unisearch/settings.yml"));
    }
    paths
}

fn find_settings_file() -> Option<PathBuf> {
    candidate_paths().into_iter().find(|p| p.exists())
}
