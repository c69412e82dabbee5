//! Config struct definition and default implementation.

use super::types::*;
use crate::dispatch::RoutingRule;
use serde::{Deserialize, Serialize};

/// Configuration for warden.
///
/// This struct represents the contents of `warden.yaml`. Unknown fields are
/// ignored for forward compatibility with the gateway's larger config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub budgets: BudgetsConfig,
    pub mission_control: MissionControlConfig,
    pub orchestrator: OrchestratorConfig,
    pub gateway: GatewayConfig,
}

/// The `orchestrator` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OrchestratorConfig {
    /// Master switch for the scheduler.
    pub enabled: bool,

    /// Incident routing rules, evaluated in declared order.
    pub routing: Vec<RoutingRule>,

    /// Agent used when no rule matches (or the matching rule names none).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_agent_id: Option<String>,

    /// Session key recorded as `spawnedBy` on every spawned run.
    pub requester_session_key: String,

    pub spawn_retry: RetryConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            routing: Vec::new(),
            default_agent_id: None,
            requester_session_key: default_requester_session_key(),
            spawn_retry: RetryConfig::default(),
        }
    }
}

fn default_requester_session_key() -> String {
    "agent:main:main".to_string()
}
