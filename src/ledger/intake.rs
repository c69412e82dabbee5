//! Turning incidents into tasks and alerts.

use super::records::{ActivityKind, ActivityRecord, SignalRecord, TaskRecord, TaskStatus, new_id};
use super::store::LedgerStore;
use super::tasks::NewTask;
use crate::config::types::MissionControlConfig;
use crate::error::Result;
use crate::incidents::IncidentRecord;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;

/// Label added to tasks from sources that need review before action.
pub const QA_REQUIRED_LABEL: &str = "qa-required";

/// What intake did with one incident.
#[derive(Debug, Clone, Default)]
pub struct IntakeOutcome {
    pub task: Option<TaskRecord>,

    /// Id of the open task this incident duplicated, when no task was created.
    pub duplicate_of: Option<String>,

    pub alert: Option<SignalRecord>,
}

impl LedgerStore {
    /// Create an inbox task and/or an alert signal for `incident`, as
    /// configured. Does nothing under the kill switch.
    pub fn ingest_incident(
        &self,
        mc: &MissionControlConfig,
        incident: &IncidentRecord,
        now: DateTime<Utc>,
    ) -> Result<IntakeOutcome> {
        let mut outcome = IntakeOutcome::default();
        if mc.kill_switch {
            return Ok(outcome);
        }

        if mc.incidents.auto_create_tasks && incident.severity >= mc.incidents.min_severity {
            let title = task_title(incident);
            let window = Duration::minutes(mc.incidents.dedupe_window_minutes as i64);
            let existing = self.task_view()?.into_iter().find(|t| {
                !t.status.is_terminal()
                    && t.source.as_deref() == Some(incident.source.as_str())
                    && t.title == title
                    && now - t.created_at <= window
            });

            match existing {
                Some(task) => {
                    tracing::debug!(incident_id = %incident.id, task_id = %task.id, "incident matches an open task");
                    outcome.duplicate_of = Some(task.id);
                }
                None => {
                    let tier = mc.trust.tier_for(&incident.source);
                    let mut labels = vec![format!("incident:{}", incident.id)];
                    if mc.qa.require_review_for.contains(&tier) {
                        labels.push(QA_REQUIRED_LABEL.to_string());
                    }
                    let task = self.create_task(NewTask {
                        title,
                        description: Some(task_description(incident)),
                        status: TaskStatus::Inbox,
                        priority: incident.severity.into(),
                        labels,
                        source: Some(incident.source.clone()),
                        severity: Some(incident.severity),
                        trust_tier: Some(tier),
                        ..NewTask::default()
                    })?;
                    outcome.task = Some(task);
                }
            }
        }

        if mc.alerts.enabled && incident.severity >= mc.alerts.min_severity {
            let signal = SignalRecord {
                id: new_id("sig"),
                timestamp: now,
                kind: "alert".to_string(),
                severity: incident.severity,
                source: incident.source.clone(),
                message: task_title(incident),
                incident_id: Some(incident.id.clone()),
                meta: incident.meta.clone(),
            };
            self.record_signal(&signal)?;
            outcome.alert = Some(signal);
        }

        if outcome.task.is_some() || outcome.alert.is_some() {
            let mut activity = ActivityRecord::new(
                ActivityKind::IncidentIngested,
                format!("Ingested incident {} from {}", incident.id, incident.source),
            )
            .with_meta(json!({
                "incidentId": incident.id,
                "severity": incident.severity,
                "alert": outcome.alert.is_some(),
            }));
            if let Some(task) = &outcome.task {
                activity = activity.with_task(&task.id);
            }
            self.record_activity(&activity)?;
        }

        Ok(outcome)
    }
}

fn task_title(incident: &IncidentRecord) -> String {
    if incident.summary.trim().is_empty() {
        format!("Incident {} from {}", incident.id, incident.source)
    } else {
        incident.summary.trim().to_string()
    }
}

fn task_description(incident: &IncidentRecord) -> String {
    let mut description = format!(
        "Incident {} ({}) from {}",
        incident.id, incident.severity, incident.source
    );
    let evidence = incident.evidence_text();
    if !evidence.is_empty() {
        description.push_str("\nEvidence: ");
        description.push_str(&evidence);
    }
    description
}
