//! Marker metadata stored in marker files.

use crate::error::{Result, WardenError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Metadata written into a marker file by the caller that created it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerMetadata {
    /// Creator of the marker (e.g., `user@HOST`).
    pub owner: String,

    /// Process id of the creator.
    pub pid: u32,

    /// When the marker was created.
    pub created_at: DateTime<Utc>,

    /// Run id of the monitored job, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,

    /// Process id of the monitored job, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitored_pid: Option<u32>,
}

impl MarkerMetadata {
    /// Create metadata for the monitored run identified by `run_id`/`monitored_pid`.
    pub fn new(run_id: Option<&str>, monitored_pid: Option<u32>) -> Self {
        Self {
            owner: owner_string(),
            pid: std::process::id(),
            created_at: Utc::now(),
            run_id: run_id.map(str::to_string),
            monitored_pid,
        }
    }

    /// Parse marker metadata from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            WardenError::LedgerError(format!(
                "failed to read marker '{}': {}",
                path.display(),
                e
            ))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            WardenError::LedgerError(format!(
                "failed to parse marker '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Serialize marker metadata to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            WardenError::LedgerError(format!("failed to serialize marker metadata: {}", e))
        })
    }
}

/// `user@host` for the current process.
pub fn owner_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}
