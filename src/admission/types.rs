//! Admission request, decision and audit snapshot types.

use crate::config::BudgetLimits;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Expected cost of the work being admitted. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Estimate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_seconds: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_chars: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdmissionRequest {
    pub agent_id: String,
    pub job_type: String,

    /// The work item being admitted (incident or task id).
    pub scope_id: Option<String>,

    pub estimate: Estimate,
}

impl AdmissionRequest {
    pub fn new(agent_id: impl Into<String>, job_type: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            job_type: job_type.into(),
            scope_id: None,
            estimate: Estimate::default(),
        }
    }

    pub fn with_scope_id(mut self, scope_id: impl Into<String>) -> Self {
        self.scope_id = Some(scope_id.into());
        self
    }

    pub fn with_estimate(mut self, estimate: Estimate) -> Self {
        self.estimate = estimate;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionDecision {
    Allow,
    Warn,
    /// Over a concurrency limit; worth retrying after `deferMinutes`.
    Defer,
    Deny,
}

impl AdmissionDecision {
    /// Whether the work must not be dispatched now. Dispatchers do not
    /// requeue deferred work.
    pub fn blocks_dispatch(&self) -> bool {
        matches!(self, AdmissionDecision::Defer | AdmissionDecision::Deny)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AdmissionDecision::Allow => "allow",
            AdmissionDecision::Warn => "warn",
            AdmissionDecision::Defer => "defer",
            AdmissionDecision::Deny => "deny",
        }
    }
}

impl std::fmt::Display for AdmissionDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdmissionOutcome {
    pub decision: AdmissionDecision,
    pub reason: Option<String>,

    /// Tier that decided (`global`, `jobType:<name>`, `agent:<id>`), or
    /// `none`.
    pub scope: String,

    /// Earliest time a deferred request is worth retrying.
    pub retry_after: Option<DateTime<Utc>>,
}

impl AdmissionOutcome {
    pub fn reason_text(&self) -> &str {
        self.reason.as_deref().unwrap_or("no reason given")
    }
}

/// Usage of one tier inside its window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BudgetUsage {
    pub runs: u64,
    pub concurrent: u64,
    pub tokens: u64,
    pub queries: u64,
}

/// Limits and usage of one tier at evaluation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierSnapshot {
    pub scope: String,
    pub window: String,
    pub limits: BudgetLimits,
    pub usage: BudgetUsage,
}
