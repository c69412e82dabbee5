//! Dispatching incidents to sub-agents.

use super::record::{DispatchLog, DispatchRecord, DispatchSummary};
use super::routing::{RoutingRule, route};
use super::spawn::{SpawnRequest, Spawner};
use super::template::{default_incident_text, incident_vars, render_template};
use crate::admission::{AdmissionController, AdmissionRequest};
use crate::config::Config;
use crate::context::WorkspaceContext;
use crate::gateway::GatewayClient;
use crate::incidents::IncidentRecord;
use crate::ledger::{LedgerStore, RUN_STATUS_RUNNING, RunLedgerRecord};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

/// Job type when neither the rule nor the incident names one.
const DEFAULT_JOB_TYPE: &str = "incident";

/// Everything the dispatcher needs beyond its collaborators.
#[derive(Debug, Clone, Default)]
pub struct IncidentRouting {
    pub rules: Vec<RoutingRule>,
    pub default_agent_id: Option<String>,
    pub kill_switch: bool,
}

impl From<&Config> for IncidentRouting {
    fn from(config: &Config) -> Self {
        Self {
            rules: config.orchestrator.routing.clone(),
            default_agent_id: config.orchestrator.default_agent_id.clone(),
            kill_switch: config.mission_control.kill_switch,
        }
    }
}

pub struct IncidentDispatcher {
    routing: IncidentRouting,
    admission: AdmissionController,
    spawner: Spawner,
    store: LedgerStore,
    log: DispatchLog,
}

impl IncidentDispatcher {
    pub fn new(
        routing: IncidentRouting,
        admission: AdmissionController,
        spawner: Spawner,
        store: LedgerStore,
        log: DispatchLog,
    ) -> Self {
        Self {
            routing,
            admission,
            spawner,
            store,
            log,
        }
    }

    pub fn from_config(
        ctx: &WorkspaceContext,
        config: &Config,
        gateway: Arc<dyn GatewayClient>,
    ) -> Self {
        let store = LedgerStore::new(&ctx.ledger_dir);
        Self::new(
            IncidentRouting::from(config),
            AdmissionController::new(config.budgets.clone(), store.clone()),
            super::spawner_for(ctx, config, gateway),
            store,
            DispatchLog::new(ctx.dispatch_log_path()),
        )
    }

    /// Dispatch `incidents` in order. A failure on one incident is recorded
    /// and the batch continues. Under the kill switch nothing happens.
    pub async fn dispatch(&self, incidents: &[IncidentRecord]) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        if self.routing.kill_switch {
            tracing::info!(count = incidents.len(), "kill switch set, incident dispatch skipped");
            return summary;
        }

        for incident in incidents {
            let record = self.dispatch_one(incident).await;
            self.log.write(&record);
            summary.records.push(record);
        }

        if !incidents.is_empty() {
            tracing::info!(
                accepted = summary.accepted(),
                skipped = summary.skipped(),
                errors = summary.errors(),
                "incident dispatch finished"
            );
        }
        summary
    }

    async fn dispatch_one(&self, incident: &IncidentRecord) -> DispatchRecord {
        let rule = route(&self.routing.rules, incident);
        let rule_id = rule.and_then(|r| r.id.clone());
        let agent_id = rule.and_then(RoutingRule::agent).or_else(|| {
            self.routing
                .default_agent_id
                .as_deref()
                .map(str::trim)
                .filter(|a| !a.is_empty())
        });

        let with_ids = |mut record: DispatchRecord| {
            record.incident_id = Some(incident.id.clone());
            record.rule_id = rule_id.clone();
            record.agent_id = agent_id.map(str::to_string);
            record
        };

        let Some(agent_id) = agent_id else {
            return with_ids(DispatchRecord::skipped("no agent id"));
        };

        let job_type = rule
            .and_then(|r| r.job_type.as_deref())
            .filter(|j| !j.is_empty())
            .or(Some(incident.source.as_str()).filter(|s| !s.is_empty()))
            .unwrap_or(DEFAULT_JOB_TYPE);

        let admission = AdmissionRequest::new(agent_id, job_type).with_scope_id(&incident.id);
        match self.admission.evaluate(&admission) {
            Ok(outcome) if outcome.decision.blocks_dispatch() => {
                return with_ids(DispatchRecord::skipped(format!(
                    "budget_{}: {}",
                    outcome.decision,
                    outcome.reason_text()
                )));
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(incident_id = %incident.id, error = %e, "admission check failed");
                return with_ids(DispatchRecord::error(format!("admission check failed: {}", e)));
            }
        }

        let task = match rule.and_then(|r| r.task_template.as_deref()) {
            Some(template) => render_template(template, &incident_vars(incident)),
            None => default_incident_text(incident),
        };

        let attempted = self
            .spawner
            .spawn(&SpawnRequest {
                agent_id,
                task: &task,
                label: format!("incident:{}", incident.id),
            })
            .await;

        let mut record = match attempted.result {
            Ok(run) => {
                let entry = RunLedgerRecord {
                    id: run.run_id.clone(),
                    timestamp: Utc::now(),
                    task_id: format!("incident:{}", incident.id),
                    agent_id: agent_id.to_string(),
                    status: RUN_STATUS_RUNNING.to_string(),
                    command: "agent".to_string(),
                    started_at: Some(Utc::now()),
                    job_type: job_type.to_string(),
                    meta: json!({
                        "incidentId": incident.id,
                        "ruleId": rule_id,
                        "childSessionKey": run.child_session_key,
                    }),
                };
                if let Err(e) = self.store.record_run(&entry) {
                    tracing::warn!(run_id = %run.run_id, error = %e, "failed to record run");
                }

                tracing::info!(
                    incident_id = %incident.id,
                    agent_id,
                    run_id = %run.run_id,
                    "incident dispatched"
                );
                let mut record = DispatchRecord::accepted();
                record.run_id = Some(run.run_id);
                record.child_session_key = Some(run.child_session_key);
                record
            }
            Err(e) => {
                tracing::warn!(incident_id = %incident.id, error = %e, "incident spawn failed");
                DispatchRecord::error(e.to_string())
            }
        };
        record.task = Some(task);
        record.attempts = attempted.attempts;
        with_ids(record)
    }
}
