// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::Settings;
use crate::config::validate::validate_settings;
use crate::errors::Result;

/// Load settings from a given path.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation (ranges, extension shape, etc.). Use [`load_and_validate`] for
/// that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Settings> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let settings: Settings = toml::from_str(&contents)?;

    Ok(settings)
}

/// Load settings from path and run basic validation.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks for:
///   - an empty or malformed extension allow-list,
///   - zero worker width / zero retry budget.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Settings> {
    let settings = load_from_path(&path)?;
    validate_settings(&settings)?;
    Ok(settings)
}

/// Helper to resolve a default config path.
///
/// Currently this just returns `Cvsync.toml` in the current working
/// directory, but this function exists so you can later:
///
/// - Respect an env var (e.g. `CVSYNC_CONFIG`).
/// - Look for multiple default locations.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Cvsync.toml")
}
