//! The verified status record.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Why a monitored job is not considered running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusReason {
    StatusFileMissing,
    PidMissing,
    PidNotRunning,
    PidMismatch,
    LogMissing,
}

impl StatusReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusReason::StatusFileMissing => "status-file-missing",
            StatusReason::PidMissing => "pid-missing",
            StatusReason::PidNotRunning => "pid-not-running",
            StatusReason::PidMismatch => "pid-mismatch",
            StatusReason::LogMissing => "log-missing",
        }
    }
}

impl std::fmt::Display for StatusReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current status of the monitored job.
///
/// The launcher writes the first version; the verifier rewrites it on every
/// pass. Fields the verifier does not know about are carried through in
/// `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconStatus {
    #[serde(default)]
    pub running: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<StatusReason>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ReconStatus {
    /// A not-running status with no identity, for a missing status file.
    pub fn missing() -> Self {
        Self {
            reason: Some(StatusReason::StatusFileMissing),
            ..Self::default()
        }
    }

    /// One-line operator-facing description of this status.
    pub fn describe(&self) -> String {
        let mut details = Vec::new();
        if let Some(pid) = self.pid {
            details.push(format!("pid {}", pid));
        }
        if let Some(run_id) = &self.run_id {
            details.push(format!("run {}", run_id));
        }
        if self.running {
            if let Some(started) = &self.started_at {
                details.push(format!("started {}", started));
            }
        } else {
            if let Some(reason) = self.reason {
                details.push(reason.to_string());
            }
            if let Some(finished) = &self.finished_at {
                details.push(format!("finished {}", finished));
            }
            if let Some(code) = self.exit_code {
                details.push(format!("exit code {}", code));
            }
        }

        let state = if self.running { "running" } else { "not running" };
        if details.is_empty() {
            format!("Recon status (verified): {}", state)
        } else {
            format!("Recon status (verified): {} ({})", state, details.join(", "))
        }
    }
}

/// Read the status file. Missing or unparsable files read as `None`.
pub fn read_status(path: &Path) -> Option<ReconStatus> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
        Ok(status) => Some(status),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "status file unparsable, treating as missing");
            None
        }
    }
}
