//! Registry of spawned sub-agent runs.
//!
//! Each accepted spawn appends one entry to `memory/subagent-runs.jsonl` so
//! the gateway's supervisor can find the run, its child session and the
//! session that asked for it.

use crate::error::Result;
use crate::fs::{append_record, read_records};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Cleanup policy recorded for every run; this crate never deletes sessions.
pub const CLEANUP_KEEP: &str = "keep";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubagentRun {
    pub run_id: String,
    pub child_session_key: String,
    pub requester_session_key: String,
    pub agent_id: String,
    pub task: String,
    pub label: String,
    pub cleanup: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SupervisionRegistry {
    path: PathBuf,
}

impl SupervisionRegistry {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn register(&self, run: &SubagentRun) -> Result<()> {
        append_record(&self.path, run)
    }

    pub fn runs(&self) -> Result<Vec<SubagentRun>> {
        read_records(&self.path)
    }
}
