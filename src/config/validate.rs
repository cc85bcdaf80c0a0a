// src/config/validate.rs

use crate::config::model::Settings;
use crate::errors::{CvSyncError, Result};

pub fn validate_settings(settings: &Settings) -> Result<()> {
    ensure_has_extensions(settings)?;
    validate_limits(settings)?;
    Ok(())
}

fn ensure_has_extensions(settings: &Settings) -> Result<()> {
    if settings.allowed_extensions.is_empty() {
        return Err(CvSyncError::ConfigError(
            "allowed_extensions must contain at least one extension".to_string(),
        ));
    }

    for ext in &settings.allowed_extensions {
        if !ext.starts_with('.') || ext.len() < 2 {
            return Err(CvSyncError::ConfigError(format!(
                "invalid extension '{ext}' in allowed_extensions (expected e.g. \".pdf\")"
            )));
        }
    }

    Ok(())
}

fn validate_limits(settings: &Settings) -> Result<()> {
    if settings.max_parallel == 0 {
        return Err(CvSyncError::ConfigError(
            "max_parallel must be >= 1 (got 0)".to_string(),
        ));
    }

    if settings.max_retries == 0 {
        return Err(CvSyncError::ConfigError(
            "max_retries must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}
