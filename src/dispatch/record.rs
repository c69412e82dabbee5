//! Dispatch outcome records.

use crate::fs::append_record;
use crate::ledger::new_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    Accepted,
    Skipped,
    Error,
}

/// What happened to one work item. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incident_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,

    pub status: DispatchStatus,

    /// Rendered task text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_session_key: Option<String>,

    /// RPC attempts made; 0 when nothing was sent.
    #[serde(default)]
    pub attempts: u32,
}

impl DispatchRecord {
    fn new(status: DispatchStatus) -> Self {
        Self {
            id: new_id("dispatch"),
            timestamp: Utc::now(),
            incident_id: None,
            task_id: None,
            rule_id: None,
            agent_id: None,
            status,
            task: None,
            error: None,
            run_id: None,
            child_session_key: None,
            attempts: 0,
        }
    }

    pub fn accepted() -> Self {
        Self::new(DispatchStatus::Accepted)
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            error: Some(reason.into()),
            ..Self::new(DispatchStatus::Skipped)
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::new(DispatchStatus::Error)
        }
    }
}

/// Totals for one dispatch pass.
#[derive(Debug, Clone, Default)]
pub struct DispatchSummary {
    pub records: Vec<DispatchRecord>,
}

impl DispatchSummary {
    pub fn count(&self, status: DispatchStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }

    pub fn accepted(&self) -> usize {
        self.count(DispatchStatus::Accepted)
    }

    pub fn skipped(&self) -> usize {
        self.count(DispatchStatus::Skipped)
    }

    pub fn errors(&self) -> usize {
        self.count(DispatchStatus::Error)
    }
}

/// Append-only file of dispatch records.
#[derive(Debug, Clone)]
pub struct DispatchLog {
    path: PathBuf,
}

impl DispatchLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `record`. A write failure is logged, not returned: the
    /// dispatch already happened.
    pub fn write(&self, record: &DispatchRecord) {
        if let Err(e) = append_record(&self.path, record) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to write dispatch record");
        }
    }
}
