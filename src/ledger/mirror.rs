//! Best-effort push of a ledger snapshot to a file or webhook.

use super::records::{ActivityRecord, TaskRecord};
use super::store::LedgerStore;
use crate::config::resolve_against;
use crate::config::types::{MirrorConfig, MirrorKind};
use crate::error::Result;
use crate::fs::atomic_write_json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Number of trailing activities included in a snapshot.
const RECENT_ACTIVITY_LIMIT: usize = 50;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorSnapshot {
    pub generated_at: DateTime<Utc>,
    pub task_counts: BTreeMap<String, usize>,
    pub open_tasks: Vec<TaskRecord>,
    pub recent_activities: Vec<ActivityRecord>,
    pub budget_decisions: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorOutcome {
    Disabled,
    Written(PathBuf),
    Posted(u16),
    Failed(String),
}

impl LedgerStore {
    pub fn snapshot(&self, now: DateTime<Utc>) -> Result<MirrorSnapshot> {
        let tasks = self.task_view()?;
        let mut task_counts = BTreeMap::new();
        for task in &tasks {
            *task_counts.entry(task.status.to_string()).or_insert(0) += 1;
        }

        let mut activities = self.activities()?;
        let skip = activities.len().saturating_sub(RECENT_ACTIVITY_LIMIT);
        let recent_activities = activities.split_off(skip);

        let mut budget_decisions = BTreeMap::new();
        for entry in self.budget_entries()? {
            *budget_decisions
                .entry(entry.decision.as_str().to_string())
                .or_insert(0) += 1;
        }

        Ok(MirrorSnapshot {
            generated_at: now,
            task_counts,
            open_tasks: tasks
                .into_iter()
                .filter(|t| !t.status.is_terminal())
                .collect(),
            recent_activities,
            budget_decisions,
        })
    }
}

/// Push a snapshot to the configured sink. Never fails: problems come back
/// as [`MirrorOutcome::Failed`] and are logged.
pub async fn push_mirror(store: &LedgerStore, config: &MirrorConfig, root: &Path) -> MirrorOutcome {
    if !config.enabled {
        return MirrorOutcome::Disabled;
    }

    let outcome = match store.snapshot(Utc::now()) {
        Ok(snapshot) => match config.kind {
            MirrorKind::File => write_file(&snapshot, config, root),
            MirrorKind::Webhook => post_webhook(&snapshot, config).await,
        },
        Err(e) => MirrorOutcome::Failed(e.to_string()),
    };

    match &outcome {
        MirrorOutcome::Failed(error) => tracing::warn!(error = %error, "ledger mirror failed"),
        other => tracing::info!(outcome = ?other, "ledger mirrored"),
    }
    outcome
}

fn write_file(snapshot: &MirrorSnapshot, config: &MirrorConfig, root: &Path) -> MirrorOutcome {
    let Some(path) = config.path.as_deref().filter(|p| !p.is_empty()) else {
        return MirrorOutcome::Failed("mirror path is not configured".to_string());
    };
    let target = resolve_against(root, path);
    match atomic_write_json(&target, snapshot) {
        Ok(()) => MirrorOutcome::Written(target),
        Err(e) => MirrorOutcome::Failed(e.to_string()),
    }
}

async fn post_webhook(snapshot: &MirrorSnapshot, config: &MirrorConfig) -> MirrorOutcome {
    let Some(url) = config.url.as_deref().filter(|u| !u.is_empty()) else {
        return MirrorOutcome::Failed("mirror url is not configured".to_string());
    };

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_millis(config.timeout_ms))
        .build()
    {
        Ok(client) => client,
        Err(e) => return MirrorOutcome::Failed(format!("failed to build http client: {}", e)),
    };

    match client.post(url).json(snapshot).send().await {
        Ok(response) if response.status().is_success() => {
            MirrorOutcome::Posted(response.status().as_u16())
        }
        Ok(response) => MirrorOutcome::Failed(format!("webhook returned {}", response.status())),
        Err(e) => MirrorOutcome::Failed(format!("webhook request failed: {}", e)),
    }
}
