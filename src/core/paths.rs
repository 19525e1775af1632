// src/core/paths.rs

use crate::constants::{DATA_DIR_ENV, DATA_DIR_NAME, SETTINGS_FILENAME};
use lazy_static::lazy_static;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

lazy_static! {
    static ref DATA_DIR: Mutex<Option<PathBuf>> = Mutex::new(None);
}

#[derive(Error, Debug)]
pub enum PathError {
    #[error("Could not find the home directory.")]
    HomeDirNotFound,
    #[error("Could not create data directory at '{path}': {source}")]
    DataDirCreation {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to expand path template '{template}': {reason}")]
    Expansion { template: String, reason: String },
}

/// Returns the path to the data directory (`~/.q`, or `$Q_HOME` when set).
/// Creates it if it doesn't exist.
///
/// This function is memoized: the first call computes and caches the path,
/// subsequent calls return the cached value instantly.
pub fn get_data_dir() -> Result<PathBuf, PathError> {
    let mut cached_path_guard = DATA_DIR.lock().unwrap_or_else(PoisonError::into_inner);

    if let Some(path) = &*cached_path_guard {
        return Ok(path.clone());
    }

    let data_path = resolve_data_dir(std::env::var(DATA_DIR_ENV).ok(), dirs::home_dir())?;
    ensure_dir(&data_path)?;

    *cached_path_guard = Some(data_path.clone());
    Ok(data_path)
}

/// Picks the data directory from an explicit override or the home directory.
fn resolve_data_dir(
    override_dir: Option<String>,
    home_dir: Option<PathBuf>,
) -> Result<PathBuf, PathError> {
    match override_dir.filter(|dir| !dir.trim().is_empty()) {
        Some(dir) => expand_path_template(&dir),
        None => home_dir
            .map(|home| home.join(DATA_DIR_NAME))
            .ok_or(PathError::HomeDirNotFound),
    }
}

fn ensure_dir(path: &Path) -> Result<(), PathError> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| PathError::DataDirCreation {
            path: path.display().to_string(),
            source: e,
        })?;
    }
    Ok(())
}

/// Returns the path to `config.toml` inside the data directory.
pub fn get_settings_path() -> Result<PathBuf, PathError> {
    get_data_dir().map(|dir| dir.join(SETTINGS_FILENAME))
}

/// Expands the home directory (`~`) and environment variables (`$VAR`) in a path template.
pub fn expand_path_template(template: &str) -> Result<PathBuf, PathError> {
    let expanded = shellexpand::full(template).map_err(|e| PathError::Expansion {
        template: template.to_string(),
        reason: e.to_string(),
    })?;
    Ok(PathBuf::from(expanded.into_owned()))
}
