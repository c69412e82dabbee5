//! Duplicate task cancellation and signal pruning.

use super::records::{ActivityKind, ActivityRecord, LedgerKind, SignalRecord, TaskStatus};
use super::rollup::replace_log;
use super::store::LedgerStore;
use super::tasks::TaskPatch;
use crate::error::Result;
use crate::fs::{complete_len, read_bytes, split_lines};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;

/// Label added to tasks cancelled as duplicates.
pub const DUPLICATE_LABEL: &str = "duplicate";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateTask {
    pub task_id: String,
    pub duplicate_of: String,
}

/// What a maintenance pass did, or would do under `dry_run`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PruneSummary {
    pub dry_run: bool,
    pub duplicate_tasks: Vec<DuplicateTask>,
    pub pruned_signals: usize,
}

impl LedgerStore {
    /// Cancel open tasks duplicating an earlier open task (same source and
    /// title within `window_minutes`) and prune repeated signals.
    pub fn maintain(&self, window_minutes: u64, dry_run: bool) -> Result<PruneSummary> {
        let window = Duration::minutes(window_minutes as i64);
        let mut summary = PruneSummary {
            dry_run,
            ..PruneSummary::default()
        };

        let mut canonical: HashMap<(String, String), (String, DateTime<Utc>)> = HashMap::new();
        for task in self.task_view()? {
            if task.status.is_terminal() {
                continue;
            }
            let key = (
                task.source.clone().unwrap_or_default(),
                task.title.trim().to_lowercase(),
            );
            match canonical.get(&key) {
                Some((first_id, first_at)) if task.created_at - *first_at <= window => {
                    summary.duplicate_tasks.push(DuplicateTask {
                        task_id: task.id.clone(),
                        duplicate_of: first_id.clone(),
                    });
                }
                _ => {
                    canonical.insert(key, (task.id.clone(), task.created_at));
                }
            }
        }

        if !dry_run {
            for duplicate in &summary.duplicate_tasks {
                self.cancel_duplicate(duplicate)?;
            }
        }

        summary.pruned_signals = self.prune_signals(window, dry_run)?;

        tracing::info!(
            dry_run,
            duplicate_tasks = summary.duplicate_tasks.len(),
            pruned_signals = summary.pruned_signals,
            "ledger maintenance finished"
        );
        Ok(summary)
    }

    fn cancel_duplicate(&self, duplicate: &DuplicateTask) -> Result<()> {
        let Some(task) = self.get_task(&duplicate.task_id)? else {
            return Ok(());
        };
        let mut labels = task.labels.clone();
        if !task.has_label(DUPLICATE_LABEL) {
            labels.push(DUPLICATE_LABEL.to_string());
        }
        self.update_task(
            &task.id,
            TaskPatch {
                status: Some(TaskStatus::Cancelled),
                labels: Some(labels),
                ..TaskPatch::default()
            },
        )?;
        self.record_activity(
            &ActivityRecord::new(
                ActivityKind::TaskDeduplicated,
                format!("Cancelled {} as a duplicate of {}", task.id, duplicate.duplicate_of),
            )
            .with_task(&task.id)
            .with_meta(json!({ "duplicateOf": duplicate.duplicate_of })),
        )
    }

    fn prune_signals(&self, window: Duration, dry_run: bool) -> Result<usize> {
        let path = self.path(LedgerKind::Signals);
        let content = read_bytes(&path)?;
        let complete_len = complete_len(&content);

        let mut last_kept: HashMap<(String, String), DateTime<Utc>> = HashMap::new();
        let mut kept: Vec<&[u8]> = Vec::new();
        let mut pruned = 0;
        for line in split_lines(&content[..complete_len]) {
            let Ok(signal) = serde_json::from_slice::<SignalRecord>(line) else {
                kept.push(line);
                continue;
            };
            let key = (signal.source, signal.message);
            match last_kept.get(&key) {
                Some(first) if signal.timestamp - *first <= window => pruned += 1,
                _ => {
                    last_kept.insert(key, signal.timestamp);
                    kept.push(line);
                }
            }
        }

        if pruned > 0 && !dry_run {
            replace_log(&path, &kept, complete_len)?;
        }
        Ok(pruned)
    }
}
