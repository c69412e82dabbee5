//! Scheduler checkpoint.

use crate::error::Result;
use crate::fs::atomic_write_json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Persisted between ticks in `memory/orchestrator.state.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OrchestratorState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_hourly_tick_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_daily_tick_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_incident_mtime_ms: Option<i64>,

    /// Byte offset into the incident log already dispatched.
    pub last_incident_offset: u64,
}

impl OrchestratorState {
    /// Load the checkpoint. Missing or unreadable state starts from scratch.
    pub fn load(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "scheduler state unparsable, starting fresh");
            Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        atomic_write_json(path, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_and_corrupt_state_default() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("orchestrator.state.json");
        assert_eq!(OrchestratorState::load(&path), OrchestratorState::default());

        std::fs::write(&path, "{oops").unwrap();
        assert_eq!(OrchestratorState::load(&path), OrchestratorState::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("memory").join("orchestrator.state.json");
        let state = OrchestratorState {
            last_hourly_tick_at: Some(Utc::now()),
            last_incident_mtime_ms: Some(1_700_000_000_000),
            last_incident_offset: 512,
            ..OrchestratorState::default()
        };

        state.save(&path).unwrap();

        assert_eq!(OrchestratorState::load(&path), state);
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("lastIncidentOffset"));
    }
}
