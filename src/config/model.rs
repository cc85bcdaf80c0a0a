// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

/// Tunables for the orchestration core.
///
/// Every field has a default, so an empty TOML file (or no file at all) is a
/// valid configuration:
///
/// ```toml
/// allowed_extensions = [".pdf", ".docx"]
/// max_parallel = 5
/// min_call_interval_ms = 300
/// max_retries = 5
/// error_message_limit = 500
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// File extensions considered résumé candidates, matched
    /// case-insensitively. Each entry must start with a dot.
    pub allowed_extensions: Vec<String>,

    /// Maximum number of item operations in flight at once. Each item
    /// operation performs a rate-limited external model call, so this cap is
    /// the primary backpressure mechanism.
    pub max_parallel: usize,

    /// Minimum spacing between external call *starts*, shared across all
    /// workers in the process.
    pub min_call_interval_ms: u64,

    /// Total attempts (first call + retries) per item before its failure is
    /// treated as permanent.
    pub max_retries: u32,

    /// Per-item error messages are truncated to this many characters before
    /// being recorded.
    pub error_message_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            allowed_extensions: vec![".pdf".to_string(), ".docx".to_string()],
            max_parallel: 5,
            min_call_interval_ms: 300,
            max_retries: 5,
            error_message_limit: 500,
        }
    }
}

impl Settings {
    pub fn min_call_interval(&self) -> Duration {
        Duration::from_millis(self.min_call_interval_ms)
    }
}
