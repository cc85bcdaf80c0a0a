// src/config/mod.rs

//! Configuration for the sync/orchestration core.
//!
//! Settings are plain serde structs loadable from TOML; `loader` reads a
//! file, `validate` runs the semantic checks that serde cannot express.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::Settings;
pub use validate::validate_settings;
