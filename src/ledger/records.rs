//! Record shapes for every ledger kind.

use crate::admission::{AdmissionDecision, TierSnapshot};
use crate::config::TrustTier;
use crate::incidents::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// One append-only log under the ledger directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LedgerKind {
    Tasks,
    Activities,
    Messages,
    Documents,
    Subscriptions,
    Signals,
    RunLedger,
    BudgetLedger,
}

impl LedgerKind {
    pub const ALL: [LedgerKind; 8] = [
        LedgerKind::Tasks,
        LedgerKind::Activities,
        LedgerKind::Messages,
        LedgerKind::Documents,
        LedgerKind::Subscriptions,
        LedgerKind::Signals,
        LedgerKind::RunLedger,
        LedgerKind::BudgetLedger,
    ];

    /// File stem, also used to name rollup files.
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerKind::Tasks => "tasks",
            LedgerKind::Activities => "activities",
            LedgerKind::Messages => "messages",
            LedgerKind::Documents => "documents",
            LedgerKind::Subscriptions => "subscriptions",
            LedgerKind::Signals => "signals",
            LedgerKind::RunLedger => "run-ledger",
            LedgerKind::BudgetLedger => "budget-ledger",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.jsonl", self.as_str())
    }

    /// Key holding the time an entry was written, used for rollup.
    pub fn time_field(&self) -> &'static str {
        match self {
            LedgerKind::Tasks => "updatedAt",
            LedgerKind::Messages | LedgerKind::Documents | LedgerKind::Subscriptions => {
                "createdAt"
            }
            LedgerKind::Activities
            | LedgerKind::Signals
            | LedgerKind::RunLedger
            | LedgerKind::BudgetLedger => "timestamp",
        }
    }
}

impl std::fmt::Display for LedgerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn new_id(prefix: &str) -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, &uuid[..12])
}

// ============================================================================
// Tasks
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Inbox,
    Assigned,
    InProgress,
    Review,
    Verified,
    Done,
    Blocked,
    Cancelled,
}

impl TaskStatus {
    /// Done, verified and cancelled tasks never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Done | TaskStatus::Verified | TaskStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Inbox => "inbox",
            TaskStatus::Assigned => "assigned",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Review => "review",
            TaskStatus::Verified => "verified",
            TaskStatus::Done => "done",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Critical => "critical",
        }
    }
}

impl std::fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Severity> for TaskPriority {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Low => TaskPriority::Low,
            Severity::Medium => TaskPriority::Medium,
            Severity::High => TaskPriority::High,
        }
    }
}

/// One version of a task. The newest line for an id is the current task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: String,
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default)]
    pub priority: TaskPriority,

    #[serde(default)]
    pub assignees: Vec<String>,

    #[serde(default)]
    pub labels: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_tier: Option<TrustTier>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskRecord {
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

// ============================================================================
// Activities
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    TaskCreated,
    TaskUpdated,
    TaskDispatched,
    TaskDeduplicated,
    IncidentIngested,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,

    #[serde(rename = "type")]
    pub kind: ActivityKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,

    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl ActivityRecord {
    pub fn new(kind: ActivityKind, message: impl Into<String>) -> Self {
        Self {
            id: new_id("act"),
            timestamp: Utc::now(),
            kind,
            task_id: None,
            agent_id: None,
            message: message.into(),
            meta: None,
        }
    }

    pub fn with_task(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }
}

// ============================================================================
// Messages, documents, subscriptions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub id: String,
    pub task_id: String,
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRecord {
    pub id: String,
    pub task_id: String,
    pub agent_id: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Signals
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: String,
    pub severity: Severity,
    pub source: String,
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incident_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

// ============================================================================
// Run and budget ledgers
// ============================================================================

/// Status of a spawned run as recorded in the run ledger.
pub const RUN_STATUS_RUNNING: &str = "running";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunLedgerRecord {
    /// The spawned run id.
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub task_id: String,
    pub agent_id: String,
    pub status: String,

    #[serde(default)]
    pub command: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub job_type: String,

    #[serde(default)]
    pub meta: Value,
}

impl RunLedgerRecord {
    /// Tokens reported in `meta.tokens`, if any.
    pub fn tokens(&self) -> u64 {
        self.meta.get("tokens").and_then(Value::as_u64).unwrap_or(0)
    }
}

/// One admission evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetLedgerRecord {
    pub timestamp: DateTime<Utc>,

    /// Tier that decided, or `none` when nothing was exceeded.
    pub scope: String,

    pub decision: AdmissionDecision,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default)]
    pub budget_snapshot: Vec<TierSnapshot>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_id: Option<String>,

    pub agent_id: String,
    pub job_type: String,
}
