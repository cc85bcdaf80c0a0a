// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum CvSyncError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Source not found: {0}")]
    SourceNotFound(Uuid),

    #[error("Source directory unavailable: {0}")]
    SourceUnavailable(String),

    #[error("batch contains no items")]
    EmptyBatch,

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, CvSyncError>;
