//! Section types for the warden configuration file.
//!
//! Keys are camelCase to match the gateway's config schema
//! (`budgets.byAgent`, `missionControl.killSwitch`, ...).

use crate::incidents::Severity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// budgets
// ============================================================================

/// The `budgets` section: three limit tiers plus enforcement settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BudgetsConfig {
    /// Limits applied to every dispatch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global: Option<BudgetLimits>,

    /// Limits keyed by agent id.
    pub by_agent: BTreeMap<String, BudgetLimits>,

    /// Limits keyed by job type (`task`, `recon-status`, ...).
    pub by_job_type: BTreeMap<String, BudgetLimits>,

    pub enforcement: EnforcementConfig,
}

/// Limits for one budget tier. Every limit is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BudgetLimits {
    /// Rolling window (`30m`, `1h`, `24h`, `7d`).
    pub window: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_limit: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency_limit: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_limit: Option<u64>,

    /// Maximum admission queries per window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_limit: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_runtime_seconds: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_chars: Option<u64>,
}

impl Default for BudgetLimits {
    fn default() -> Self {
        Self {
            window: default_window(),
            run_limit: None,
            concurrency_limit: None,
            token_limit: None,
            query_limit: None,
            max_runtime_seconds: None,
            max_output_chars: None,
        }
    }
}

fn default_window() -> String {
    "24h".to_string()
}

/// How a budget violation is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementMode {
    /// Never block; decisions are still audited.
    Off,
    /// Violations are downgraded to `warn`.
    Soft,
    /// Violations block dispatch (`deny` or `defer`).
    #[default]
    Hard,
}

/// The `budgets.enforcement` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnforcementConfig {
    pub mode: EnforcementMode,

    /// Suggested retry delay attached to `defer` decisions.
    pub defer_minutes: u64,

    /// Usage above this share of a limit produces `warn`.
    pub warn_threshold_pct: u32,

    /// Usage above this share of a limit is a violation.
    pub hard_stop_threshold_pct: u32,
}

impl Default for EnforcementConfig {
    fn default() -> Self {
        Self {
            mode: EnforcementMode::default(),
            defer_minutes: 15,
            warn_threshold_pct: 80,
            hard_stop_threshold_pct: 100,
        }
    }
}

// ============================================================================
// missionControl
// ============================================================================

/// How much verification a source's output needs before it is acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrustTier {
    Trusted,
    #[default]
    Verify,
    Untrusted,
}

impl std::fmt::Display for TrustTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrustTier::Trusted => write!(f, "trusted"),
            TrustTier::Verify => write!(f, "verify"),
            TrustTier::Untrusted => write!(f, "untrusted"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrustConfig {
    pub default_tier: TrustTier,
    /// Tier overrides keyed by incident source.
    pub sources: BTreeMap<String, TrustTier>,
}

impl TrustConfig {
    pub fn tier_for(&self, source: &str) -> TrustTier {
        self.sources.get(source).copied().unwrap_or(self.default_tier)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AlertsConfig {
    pub enabled: bool,
    pub min_severity: Severity,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_severity: Severity::High,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IncidentsConfig {
    /// Create an inbox task for each qualifying incident.
    pub auto_create_tasks: bool,
    pub min_severity: Severity,
    pub dedupe_window_minutes: u64,
}

impl Default for IncidentsConfig {
    fn default() -> Self {
        Self {
            auto_create_tasks: false,
            min_severity: Severity::Medium,
            dedupe_window_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QaConfig {
    /// Tasks from these trust tiers are labelled `qa-required`.
    pub require_review_for: Vec<TrustTier>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReconConfig {
    /// Refresh the monitored job's status on every hourly tick.
    pub enabled: bool,
    /// Status file, relative to the workspace root.
    pub status_path: String,
    /// Substring the monitored process's command line must contain.
    pub process_marker: String,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            status_path: "recon/status.json".to_string(),
            process_marker: "recon".to_string(),
        }
    }
}

/// Where the mirror snapshot is pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MirrorKind {
    #[default]
    File,
    Webhook,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MirrorConfig {
    pub enabled: bool,
    pub kind: MirrorKind,
    /// Target file for `kind: file` (relative paths resolve against the workspace).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Target URL for `kind: webhook`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub timeout_ms: u64,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            kind: MirrorKind::default(),
            path: None,
            url: None,
            timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RollupConfig {
    pub enabled: bool,
    /// Entries older than this many days move to rollup files.
    pub days: u32,
}

impl Default for RollupConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            days: 14,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MaintenanceConfig {
    pub enabled: bool,
    pub dedupe_window_minutes: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dedupe_window_minutes: 60,
        }
    }
}

/// The `missionControl` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MissionControlConfig {
    /// Disables incident intake, alerting, and incident dispatch.
    pub kill_switch: bool,
    /// Ledger directory, relative to the workspace root unless absolute.
    pub ledger_dir: String,
    pub trust: TrustConfig,
    pub alerts: AlertsConfig,
    pub incidents: IncidentsConfig,
    pub qa: QaConfig,
    pub recon: ReconConfig,
    pub mirror: MirrorConfig,
    pub rollup: RollupConfig,
    pub maintenance: MaintenanceConfig,
}

impl Default for MissionControlConfig {
    fn default() -> Self {
        Self {
            kill_switch: false,
            ledger_dir: "mission-control".to_string(),
            trust: TrustConfig::default(),
            alerts: AlertsConfig::default(),
            incidents: IncidentsConfig::default(),
            qa: QaConfig::default(),
            recon: ReconConfig::default(),
            mirror: MirrorConfig::default(),
            rollup: RollupConfig::default(),
            maintenance: MaintenanceConfig::default(),
        }
    }
}

// ============================================================================
// orchestrator / gateway
// ============================================================================

/// Retry policy for the spawn RPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles on each further attempt.
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff_ms: 1_000,
        }
    }
}

/// The `gateway` section: where the RPC boundary lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GatewayConfig {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:18789".to_string(),
            token: None,
        }
    }
}
