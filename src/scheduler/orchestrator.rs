//! What each cadence does when it fires.

use super::state::OrchestratorState;
use crate::config::Config;
use crate::context::WorkspaceContext;
use crate::dispatch::{DispatchSummary, IncidentDispatcher, TaskDispatcher};
use crate::error::Result;
use crate::gateway::{GatewayClient, GatewayWakeSink, HeartbeatCoalescer, WakeSink};
use crate::incidents::{IncidentRecord, file_mtime_ms, read_batch};
use crate::ledger::{LedgerStore, MirrorOutcome, PruneSummary, RollupSummary, push_mirror};
use crate::recon::{HostProcessProbe, ProcessProbe, StatusVerifier};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Which cadence (or operator command) ran a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickKind {
    Hourly,
    Daily,
    Manual,
}

impl TickKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TickKind::Hourly => "hourly",
            TickKind::Daily => "daily",
            TickKind::Manual => "manual",
        }
    }
}

impl std::fmt::Display for TickKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What one pass did.
#[derive(Debug, Default)]
pub struct TickReport {
    /// The incident log was unchanged and the pass stopped early.
    pub idle: bool,
    pub incidents_read: usize,
    pub tasks_created: usize,
    pub alerts: usize,
    pub incidents: DispatchSummary,
    pub tasks: DispatchSummary,
    /// Completion incident emitted by the status refresh of this pass.
    pub completion: Option<IncidentRecord>,
    pub housekeeping: Option<Housekeeping>,
}

/// Daily maintenance results. `None` means the step is disabled.
#[derive(Debug, Default)]
pub struct Housekeeping {
    pub rollup: Option<RollupSummary>,
    pub maintenance: Option<PruneSummary>,
    pub mirror: Option<MirrorOutcome>,
}

/// Runs the hourly, daily and trigger passes against one workspace.
pub struct Orchestrator {
    ctx: WorkspaceContext,
    config: Config,
    store: LedgerStore,
    verifier: StatusVerifier<Box<dyn ProcessProbe>>,
    incidents: IncidentDispatcher,
    tasks: TaskDispatcher,
    wake: Arc<dyn WakeSink>,
    heartbeat: HeartbeatCoalescer,
    // Both cadences read and rewrite the checkpoint.
    checkpoint: Mutex<()>,
}

impl Orchestrator {
    pub fn new(ctx: WorkspaceContext, config: Config, gateway: Arc<dyn GatewayClient>) -> Self {
        let wake: Arc<dyn WakeSink> = Arc::new(GatewayWakeSink::new(Arc::clone(&gateway)));
        Self::with_parts(ctx, config, gateway, wake, Box::new(HostProcessProbe))
    }

    pub fn with_parts(
        ctx: WorkspaceContext,
        config: Config,
        gateway: Arc<dyn GatewayClient>,
        wake: Arc<dyn WakeSink>,
        probe: Box<dyn ProcessProbe>,
    ) -> Self {
        Self {
            store: LedgerStore::new(&ctx.ledger_dir),
            verifier: StatusVerifier::with_probe(&ctx, &config, probe),
            incidents: IncidentDispatcher::from_config(&ctx, &config, Arc::clone(&gateway)),
            tasks: TaskDispatcher::from_config(&ctx, &config, gateway),
            heartbeat: HeartbeatCoalescer::new(Arc::clone(&wake)),
            wake,
            checkpoint: Mutex::new(()),
            ctx,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn context(&self) -> &WorkspaceContext {
        &self.ctx
    }

    /// Refresh recon status, then run the trigger path unless the incident
    /// log is untouched since the last pass.
    pub async fn hourly_tick(&self) -> Result<TickReport> {
        let completion = self.refresh_recon();

        let _checkpoint = self.checkpoint.lock().await;
        let state_path = self.ctx.state_path();
        let mut state = OrchestratorState::load(&state_path);

        let mtime = file_mtime_ms(&self.ctx.incidents_path());
        if mtime == state.last_incident_mtime_ms {
            debug!(mtime_ms = mtime, "incident log unchanged, hourly tick idle");
            state.last_hourly_tick_at = Some(Utc::now());
            state.save(&state_path)?;
            return Ok(TickReport {
                idle: true,
                completion,
                ..TickReport::default()
            });
        }

        let mut report = self.run_trigger(TickKind::Hourly, state).await?;
        report.completion = completion;
        Ok(report)
    }

    /// Trigger path, then housekeeping.
    pub async fn daily_tick(&self) -> Result<TickReport> {
        let mut report = self.trigger(TickKind::Daily).await?;
        report.housekeeping = Some(self.housekeeping().await);
        Ok(report)
    }

    /// Wake the main session, drain new incidents, dispatch incidents and
    /// tasks, and checkpoint.
    pub async fn trigger(&self, kind: TickKind) -> Result<TickReport> {
        let _checkpoint = self.checkpoint.lock().await;
        let state = OrchestratorState::load(&self.ctx.state_path());
        self.run_trigger(kind, state).await
    }

    /// Send a heartbeat still waiting out its coalescing window.
    pub async fn flush(&self) {
        self.heartbeat.flush().await;
    }

    /// Rollup, maintenance and mirror, each when enabled. A failing step is
    /// logged and the others still run.
    pub async fn housekeeping(&self) -> Housekeeping {
        let mc = &self.config.mission_control;
        let mut done = Housekeeping::default();

        if mc.rollup.enabled {
            match self.store.rollup(mc.rollup.days, Utc::now()) {
                Ok(summary) => done.rollup = Some(summary),
                Err(e) => warn!(error = %e, "ledger rollup failed"),
            }
        }

        if mc.maintenance.enabled {
            match self
                .store
                .maintain(mc.maintenance.dedupe_window_minutes, false)
            {
                Ok(summary) => done.maintenance = Some(summary),
                Err(e) => warn!(error = %e, "ledger maintenance failed"),
            }
        }

        if mc.mirror.enabled {
            done.mirror = Some(push_mirror(&self.store, &mc.mirror, &self.ctx.root).await);
        }

        done
    }

    fn refresh_recon(&self) -> Option<IncidentRecord> {
        if !self.config.mission_control.recon.enabled {
            return None;
        }
        match self.verifier.refresh() {
            Ok(refresh) => refresh.completion,
            Err(e) => {
                warn!(error = %e, "recon status refresh failed");
                None
            }
        }
    }

    async fn run_trigger(&self, kind: TickKind, mut state: OrchestratorState) -> Result<TickReport> {
        let now = Utc::now();

        if let Err(e) = self.wake.wake(&format!("Orchestrator {} tick", kind)).await {
            warn!(error = %e, "wake request failed");
        }
        self.heartbeat.request(kind.as_str());

        let batch = read_batch(&self.ctx.incidents_path(), state.last_incident_offset);
        let mut report = TickReport {
            incidents_read: batch.records.len(),
            ..TickReport::default()
        };

        for incident in &batch.records {
            match self
                .store
                .ingest_incident(&self.config.mission_control, incident, now)
            {
                Ok(outcome) => {
                    report.tasks_created += usize::from(outcome.task.is_some());
                    report.alerts += usize::from(outcome.alert.is_some());
                }
                Err(e) => warn!(incident_id = %incident.id, error = %e, "incident intake failed"),
            }
        }

        report.incidents = self.incidents.dispatch(&batch.records).await;
        match self.tasks.dispatch_pending().await {
            Ok(summary) => report.tasks = summary,
            Err(e) => warn!(error = %e, "task dispatch failed"),
        }

        state.last_incident_offset = batch.next_offset;
        state.last_incident_mtime_ms = batch.mtime_ms;
        match kind {
            TickKind::Hourly => state.last_hourly_tick_at = Some(now),
            TickKind::Daily => state.last_daily_tick_at = Some(now),
            TickKind::Manual => {}
        }
        state.save(&self.ctx.state_path())?;

        info!(
            tick = %kind,
            incidents = report.incidents_read,
            tasks_created = report.tasks_created,
            dispatched = report.incidents.accepted() + report.tasks.accepted(),
            skipped = report.incidents.skipped() + report.tasks.skipped(),
            errors = report.incidents.errors() + report.tasks.errors(),
            "trigger pass complete"
        );
        Ok(report)
    }
}
