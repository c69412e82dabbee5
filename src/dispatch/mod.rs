//! Incident and task dispatch.
//!
//! Both dispatchers run the same pipeline per work item, strictly in order:
//!
//! 1. pick an agent (routing rules for incidents, first assignee for tasks)
//! 2. ask the [`AdmissionController`](crate::admission::AdmissionController)
//! 3. render the task text
//! 4. spawn the run through the gateway (`agent` RPC), with retries
//! 5. record the run and write exactly one [`DispatchRecord`]
//!
//! A failing item is recorded as `error` and the batch moves on. Nothing is
//! requeued: a skipped incident is not retried, a skipped task keeps its
//! status and comes up again on the next pass.

mod incident;
mod record;
mod routing;
mod spawn;
mod supervision;
mod task;
pub mod template;


use crate::config::Config;
use crate::context::WorkspaceContext;
use crate::gateway::{GatewayClient, RetryPolicy};
use std::sync::Arc;

pub use incident::{IncidentDispatcher, IncidentRouting};
pub use record::{DispatchLog, DispatchRecord, DispatchStatus, DispatchSummary};
pub use routing::{RoutingRule, RulePredicate, matches, route};
pub use spawn::{SPAWN_TIMEOUT, SpawnRequest, SpawnedRun, Spawner};
pub use supervision::{CLEANUP_KEEP, SubagentRun, SupervisionRegistry};
pub use task::{ASSIGNED_BATCH, INBOX_BATCH, TASK_JOB_TYPE, TaskDispatcher};

/// Spawner configured from `orchestrator` settings.
pub fn spawner_for(
    ctx: &WorkspaceContext,
    config: &Config,
    gateway: Arc<dyn GatewayClient>,
) -> Spawner {
    Spawner::new(
        gateway,
        RetryPolicy::from(&config.orchestrator.spawn_retry),
        config.orchestrator.requester_session_key.clone(),
        SupervisionRegistry::new(ctx.subagent_runs_path()),
    )
}
