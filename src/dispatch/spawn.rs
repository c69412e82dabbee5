//! The shared spawn step: one `agent` RPC per attempt, then registration.

use super::supervision::{CLEANUP_KEEP, SubagentRun, SupervisionRegistry};
use crate::error::Result;
use crate::gateway::{Attempted, GatewayClient, RetryPolicy};
use chrono::Utc;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Timeout of one `agent` call.
pub const SPAWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Lane sub-agent runs are queued on.
const SUBAGENT_LANE: &str = "subagent";

#[derive(Debug, Clone)]
pub struct SpawnRequest<'a> {
    pub agent_id: &'a str,
    pub task: &'a str,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpawnedRun {
    pub run_id: String,
    pub child_session_key: String,
}

/// Spawns supervised sub-agent runs through the gateway.
#[derive(Clone)]
pub struct Spawner {
    gateway: Arc<dyn GatewayClient>,
    retry: RetryPolicy,
    requester_session_key: String,
    registry: SupervisionRegistry,
}

impl Spawner {
    pub fn new(
        gateway: Arc<dyn GatewayClient>,
        retry: RetryPolicy,
        requester_session_key: impl Into<String>,
        registry: SupervisionRegistry,
    ) -> Self {
        Self {
            gateway,
            retry,
            requester_session_key: requester_session_key.into(),
            registry,
        }
    }

    /// Spawn one run. Every attempt carries a fresh idempotency key; the
    /// child session key is fixed for the whole request.
    pub async fn spawn(&self, request: &SpawnRequest<'_>) -> Attempted<SpawnedRun> {
        let child_session_key = format!("agent:{}:subagent:{}", request.agent_id, Uuid::new_v4());
        let preamble = self.preamble(&child_session_key, request.task);

        let attempted = self
            .retry
            .run(|_| {
                let idempotency_key = Uuid::new_v4().to_string();
                let params = json!({
                    "message": request.task,
                    "sessionKey": child_session_key,
                    "deliver": false,
                    "lane": SUBAGENT_LANE,
                    "extraSystemPrompt": preamble,
                    "label": request.label,
                    "spawnedBy": self.requester_session_key,
                    "idempotencyKey": idempotency_key,
                });
                async move {
                    self.gateway
                        .call("agent", params, SPAWN_TIMEOUT)
                        .await
                        .map(|response| run_id_from(&response).unwrap_or(idempotency_key))
                }
            })
            .await;

        let Attempted { result, attempts } = attempted;
        let result = result.map(|run_id| SpawnedRun {
            run_id,
            child_session_key: child_session_key.clone(),
        });

        if let Ok(run) = &result
            && let Err(e) = self.register(request, run)
        {
            // The run exists either way; the registry is for supervision.
            tracing::warn!(run_id = %run.run_id, error = %e, "failed to register spawned run");
        }

        Attempted { result, attempts }
    }

    fn register(&self, request: &SpawnRequest<'_>, run: &SpawnedRun) -> Result<()> {
        self.registry.register(&SubagentRun {
            run_id: run.run_id.clone(),
            child_session_key: run.child_session_key.clone(),
            requester_session_key: self.requester_session_key.clone(),
            agent_id: request.agent_id.to_string(),
            task: request.task.to_string(),
            label: request.label.clone(),
            cleanup: CLEANUP_KEEP.to_string(),
            created_at: Utc::now(),
        })
    }

    fn preamble(&self, child_session_key: &str, task: &str) -> String {
        format!(
            "You are a sub-agent spawned by {}.\n\
             Your session: {}.\n\
             Task: {}\n\
             Work only on this task. When you are done, reply with a short summary of the outcome; \
             it is reported back to the requester.",
            self.requester_session_key, child_session_key, task
        )
    }
}

fn run_id_from(response: &Value) -> Option<String> {
    response
        .get("runId")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

