//! The verification pass.

use super::probe::{HostProcessProbe, ProcessProbe};
use super::status::{ReconStatus, StatusReason, read_status};
use crate::config::Config;
use crate::context::WorkspaceContext;
use crate::error::Result;
use crate::fs::atomic_write_json;
use crate::incidents::{IncidentRecord, Severity, append_incident};
use crate::markers::{
    MarkerMetadata, MarkerOutcome, create_marker, marker_key, marker_path, read_marker,
};
use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Source tag of completion incidents.
pub const COMPLETION_SOURCE: &str = "recon-status";

/// Result of one verification pass.
#[derive(Debug, Clone)]
pub struct Refresh {
    /// The status as verified and written.
    pub status: ReconStatus,

    /// The completion incident, when this pass won the right to emit it.
    pub completion: Option<IncidentRecord>,
}

/// Verifies one monitored job against the host.
#[derive(Debug, Clone)]
pub struct StatusVerifier<P: ProcessProbe = HostProcessProbe> {
    root: PathBuf,
    status_path: PathBuf,
    markers_dir: PathBuf,
    incidents_path: PathBuf,
    process_marker: String,
    probe: P,
}

impl StatusVerifier<HostProcessProbe> {
    /// Verifier for the workspace's configured status file, probing the host.
    pub fn new(ctx: &WorkspaceContext, config: &Config) -> Self {
        Self::with_probe(ctx, config, HostProcessProbe)
    }
}

impl<P: ProcessProbe> StatusVerifier<P> {
    pub fn with_probe(ctx: &WorkspaceContext, config: &Config, probe: P) -> Self {
        Self {
            root: ctx.root.clone(),
            status_path: ctx.recon_status_path.clone(),
            markers_dir: ctx.markers_dir.clone(),
            incidents_path: ctx.incidents_path(),
            process_marker: config.mission_control.recon.process_marker.clone(),
            probe,
        }
    }

    pub fn status_path(&self) -> &Path {
        &self.status_path
    }

    /// Verify the job, rewrite the status file, and emit the completion
    /// incident if this pass owns the running->finished transition.
    pub fn refresh(&self) -> Result<Refresh> {
        let previous = read_status(&self.status_path);
        let mut status = match &previous {
            Some(claimed) => self.verify(claimed)?,
            None => ReconStatus::missing(),
        };

        let was_running = previous
            .as_ref()
            .is_some_and(|p| p.running || p.finished_at.is_some());
        let transitioned = was_running && !status.running;

        if transitioned && status.finished_at.is_none() {
            status.finished_at = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));
        }

        // Written before the marker, so a crash in between is retried from
        // the file on the next pass.
        atomic_write_json(&self.status_path, &status)?;

        let completion = if transitioned {
            self.emit_completion(&status)?
        } else {
            None
        };

        debug!(
            running = status.running,
            reason = status.reason.map(|r| r.as_str()),
            "recon status verified"
        );

        Ok(Refresh { status, completion })
    }

    /// Check a claimed status against the host. Identity fields carry over.
    ///
    /// Fails, leaving the status file alone, when the host cannot be inspected.
    fn verify(&self, claimed: &ReconStatus) -> Result<ReconStatus> {
        let mut status = claimed.clone();
        status.running = false;

        let Some(pid) = claimed.pid else {
            status.reason = Some(StatusReason::PidMissing);
            return Ok(status);
        };

        match self.probe.command_line(pid)? {
            None => {
                status.reason = Some(StatusReason::PidNotRunning);
                return Ok(status);
            }
            Some(cmdline) if !cmdline.contains(&self.process_marker) => {
                status.reason = Some(StatusReason::PidMismatch);
                return Ok(status);
            }
            Some(_) => {}
        }

        let log_exists = claimed
            .log_path
            .as_deref()
            .is_some_and(|log| crate::config::resolve_against(&self.root, log).exists());
        if !log_exists {
            status.reason = Some(StatusReason::LogMissing);
            return Ok(status);
        }

        status.running = true;
        status.reason = None;
        Ok(status)
    }

    fn emit_completion(&self, status: &ReconStatus) -> Result<Option<IncidentRecord>> {
        let Some(key) = marker_key(status.run_id.as_deref(), status.pid) else {
            debug!("finished job has neither run id nor pid, nothing to deduplicate on");
            return Ok(None);
        };

        let marker = marker_path(&self.markers_dir, &key);
        let metadata = MarkerMetadata::new(status.run_id.as_deref(), status.pid);
        if create_marker(&marker, &metadata)? == MarkerOutcome::AlreadyExists {
            let owner = read_marker(&marker).map(|m| m.owner);
            debug!(key = %key, owner = owner.as_deref(), "completion already emitted");
            return Ok(None);
        }

        let incident = completion_incident(&key, status);
        append_incident(&self.incidents_path, &incident)?;
        info!(
            incident_id = %incident.id,
            run_id = status.run_id.as_deref(),
            pid = status.pid,
            "monitored job finished, completion incident emitted"
        );
        Ok(Some(incident))
    }
}

fn completion_incident(key: &str, status: &ReconStatus) -> IncidentRecord {
    let label = match (&status.run_id, status.pid) {
        (Some(run_id), _) => run_id.clone(),
        (None, Some(pid)) => format!("pid {}", pid),
        (None, None) => key.to_string(),
    };
    let summary = match status.exit_code {
        Some(code) => format!("Recon run {} finished (exit code {})", label, code),
        None => format!("Recon run {} finished", label),
    };

    let evidence = status
        .log_path
        .iter()
        .map(|log| Value::String(log.clone()))
        .collect();

    IncidentRecord::new(
        format!("recon-complete-{}", key),
        COMPLETION_SOURCE,
        Severity::Medium,
        summary,
    )
    .with_evidence(evidence)
    .with_meta(json!({
        "runId": status.run_id,
        "pid": status.pid,
        "exitCode": status.exit_code,
        "reason": status.reason.map(|r| r.as_str()),
        "startedAt": status.started_at,
        "finishedAt": status.finished_at,
    }))
}
