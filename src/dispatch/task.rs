//! Dispatching ledger tasks to their assignees.

use super::record::{DispatchLog, DispatchRecord, DispatchSummary};
use super::spawn::{SpawnRequest, Spawner};
use super::template::task_text;
use crate::admission::{AdmissionController, AdmissionRequest};
use crate::config::Config;
use crate::context::WorkspaceContext;
use crate::error::Result;
use crate::gateway::GatewayClient;
use crate::ledger::{
    ActivityKind, ActivityRecord, LedgerStore, RUN_STATUS_RUNNING, RunLedgerRecord, TaskPatch,
    TaskRecord, TaskStatus,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

/// Budget job type of every task run.
pub const TASK_JOB_TYPE: &str = "task";

/// Assigned tasks considered per pass.
pub const ASSIGNED_BATCH: usize = 50;

/// Inbox tasks considered per pass.
pub const INBOX_BATCH: usize = 25;

pub struct TaskDispatcher {
    admission: AdmissionController,
    spawner: Spawner,
    store: LedgerStore,
    log: DispatchLog,
}

impl TaskDispatcher {
    pub fn new(
        admission: AdmissionController,
        spawner: Spawner,
        store: LedgerStore,
        log: DispatchLog,
    ) -> Self {
        Self {
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
            AdmissionController::new(config.budgets.clone(), store.clone()),
            super::spawner_for(ctx, config, gateway),
            store,
            DispatchLog::new(ctx.task_dispatch_log_path()),
        )
    }

    /// Tasks due for dispatch: assigned first, then inbox, oldest update first.
    pub fn pending(&self) -> Result<Vec<TaskRecord>> {
        let mut tasks = self
            .store
            .list_tasks(Some(TaskStatus::Assigned), Some(ASSIGNED_BATCH))?;
        tasks.extend(
            self.store
                .list_tasks(Some(TaskStatus::Inbox), Some(INBOX_BATCH))?,
        );
        Ok(tasks)
    }

    /// Dispatch everything [`pending`](Self::pending) returns.
    pub async fn dispatch_pending(&self) -> Result<DispatchSummary> {
        let tasks = self.pending()?;
        Ok(self.dispatch(&tasks).await)
    }

    pub async fn dispatch(&self, tasks: &[TaskRecord]) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        for task in tasks {
            let record = self.dispatch_one(task).await;
            self.log.write(&record);
            summary.records.push(record);
        }
        if !tasks.is_empty() {
            tracing::info!(
                accepted = summary.accepted(),
                skipped = summary.skipped(),
                errors = summary.errors(),
                "task dispatch finished"
            );
        }
        summary
    }

    async fn dispatch_one(&self, task: &TaskRecord) -> DispatchRecord {
        let agent_id = task
            .assignees
            .iter()
            .map(|a| a.trim())
            .find(|a| !a.is_empty());

        let with_ids = |mut record: DispatchRecord| {
            record.task_id = Some(task.id.clone());
            record.agent_id = agent_id.map(str::to_string);
            record
        };

        let Some(agent_id) = agent_id else {
            return with_ids(DispatchRecord::skipped("no agent id"));
        };

        let admission = AdmissionRequest::new(agent_id, TASK_JOB_TYPE).with_scope_id(&task.id);
        match self.admission.evaluate(&admission) {
            // The task keeps its status and is looked at again next pass.
            Ok(outcome) if outcome.decision.blocks_dispatch() => {
                return with_ids(DispatchRecord::skipped(format!(
                    "budget_{}: {}",
                    outcome.decision,
                    outcome.reason_text()
                )));
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(task_id = %task.id, error = %e, "admission check failed");
                return with_ids(DispatchRecord::error(format!("admission check failed: {}", e)));
            }
        }

        let text = task_text(task);
        let attempted = self
            .spawner
            .spawn(&SpawnRequest {
                agent_id,
                task: &text,
                label: format!("task:{}", task.id),
            })
            .await;

        let mut record = match attempted.result {
            Ok(run) => {
                if let Err(e) = self.record_success(task, agent_id, &run.run_id, &run.child_session_key) {
                    tracing::warn!(task_id = %task.id, run_id = %run.run_id, error = %e, "failed to record task dispatch");
                }
                tracing::info!(task_id = %task.id, agent_id, run_id = %run.run_id, "task dispatched");

                let mut record = DispatchRecord::accepted();
                record.run_id = Some(run.run_id);
                record.child_session_key = Some(run.child_session_key);
                record
            }
            Err(e) => {
                tracing::warn!(task_id = %task.id, error = %e, "task spawn failed");
                DispatchRecord::error(e.to_string())
            }
        };
        record.task = Some(text);
        record.attempts = attempted.attempts;
        with_ids(record)
    }

    /// Advance the task to `in_progress`, then record the run and the activity.
    ///
    /// Every write is attempted; the first failure is returned.
    fn record_success(
        &self,
        task: &TaskRecord,
        agent_id: &str,
        run_id: &str,
        child_session_key: &str,
    ) -> Result<()> {
        let status = self
            .store
            .update_task(&task.id, TaskPatch::status(TaskStatus::InProgress))
            .map(|_| ());
        let run = self.store.record_run(&RunLedgerRecord {
            id: run_id.to_string(),
            timestamp: Utc::now(),
            task_id: task.id.clone(),
            agent_id: agent_id.to_string(),
            status: RUN_STATUS_RUNNING.to_string(),
            command: "agent".to_string(),
            started_at: Some(Utc::now()),
            job_type: TASK_JOB_TYPE.to_string(),
            meta: json!({ "childSessionKey": child_session_key }),
        });
        let activity = self.store.record_activity(
            &ActivityRecord::new(
                ActivityKind::TaskDispatched,
                format!("Dispatched task {} to {}", task.id, agent_id),
            )
            .with_task(&task.id)
            .with_agent(agent_id)
            .with_meta(json!({ "runId": run_id, "childSessionKey": child_session_key })),
        );
        status.and(run).and(activity)
    }
}
