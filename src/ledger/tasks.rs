//! Task CRUD over the append-only task log.
//!
//! Every mutation appends a full new version of the task. The current view
//! is the newest line per id.

use super::records::{
    ActivityKind, ActivityRecord, LedgerKind, TaskPriority, TaskRecord, TaskStatus, new_id,
};
use super::store::LedgerStore;
use crate::config::TrustTier;
use crate::error::{Result, WardenError};
use crate::incidents::Severity;
use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;

/// Fields for a new task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assignees: Vec<String>,
    pub labels: Vec<String>,
    pub source: Option<String>,
    pub severity: Option<Severity>,
    pub trust_tier: Option<TrustTier>,
}

/// Changes to apply to an existing task. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub status: Option<TaskStatus>,
    pub assignees: Option<Vec<String>>,
    pub labels: Option<Vec<String>>,
    pub priority: Option<TaskPriority>,
    pub description: Option<String>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    fn apply(self, task: &mut TaskRecord) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if let Some(status) = self.status
            && status != task.status
        {
            task.status = status;
            changed.push("status");
        }
        if let Some(assignees) = self.assignees
            && assignees != task.assignees
        {
            task.assignees = assignees;
            changed.push("assignees");
        }
        if let Some(labels) = self.labels
            && labels != task.labels
        {
            task.labels = labels;
            changed.push("labels");
        }
        if let Some(priority) = self.priority
            && priority != task.priority
        {
            task.priority = priority;
            changed.push("priority");
        }
        if let Some(description) = self.description
            && task.description.as_deref() != Some(description.as_str())
        {
            task.description = Some(description);
            changed.push("description");
        }
        changed
    }
}

impl LedgerStore {
    /// Create a task and record a `task_created` activity.
    pub fn create_task(&self, new: NewTask) -> Result<TaskRecord> {
        if new.title.trim().is_empty() {
            return Err(WardenError::UserError(
                "task title must not be empty".to_string(),
            ));
        }

        let now = Utc::now();
        let task = TaskRecord {
            id: new_id("task"),
            title: new.title,
            description: new.description,
            status: new.status,
            priority: new.priority,
            assignees: new.assignees,
            labels: new.labels,
            source: new.source,
            severity: new.severity,
            trust_tier: new.trust_tier,
            created_at: now,
            updated_at: now,
        };
        self.append(LedgerKind::Tasks, &task)?;
        self.record_activity(
            &ActivityRecord::new(ActivityKind::TaskCreated, format!("Created task: {}", task.title))
                .with_task(&task.id),
        )?;

        tracing::info!(task_id = %task.id, status = %task.status, "task created");
        Ok(task)
    }

    /// Apply `patch` to the current version of task `id`.
    ///
    /// A patch that changes nothing appends nothing and returns the current
    /// version.
    pub fn update_task(&self, id: &str, patch: TaskPatch) -> Result<TaskRecord> {
        let Some(mut task) = self.get_task(id)? else {
            return Err(WardenError::UserError(format!("task '{}' not found", id)));
        };

        let changed = patch.apply(&mut task);
        if changed.is_empty() {
            return Ok(task);
        }

        task.updated_at = Utc::now();
        self.append(LedgerKind::Tasks, &task)?;
        self.record_activity(
            &ActivityRecord::new(
                ActivityKind::TaskUpdated,
                format!("Updated {} of task {}", changed.join(", "), task.id),
            )
            .with_task(&task.id)
            .with_meta(json!({ "changed": changed, "status": task.status })),
        )?;
        Ok(task)
    }

    pub fn get_task(&self, id: &str) -> Result<Option<TaskRecord>> {
        let versions: Vec<TaskRecord> = self.read(LedgerKind::Tasks)?;
        Ok(versions.into_iter().rev().find(|t| t.id == id))
    }

    /// Current version of every task, ordered by creation.
    pub fn task_view(&self) -> Result<Vec<TaskRecord>> {
        let versions: Vec<TaskRecord> = self.read(LedgerKind::Tasks)?;
        Ok(latest_versions(versions))
    }

    /// Current tasks, optionally filtered by status, oldest update first.
    pub fn list_tasks(
        &self,
        status: Option<TaskStatus>,
        limit: Option<usize>,
    ) -> Result<Vec<TaskRecord>> {
        let mut tasks: Vec<TaskRecord> = self
            .task_view()?
            .into_iter()
            .filter(|t| status.is_none_or(|s| t.status == s))
            .collect();
        tasks.sort_by(|a, b| a.updated_at.cmp(&b.updated_at));
        if let Some(limit) = limit {
            tasks.truncate(limit);
        }
        Ok(tasks)
    }
}

/// Collapse task versions to the newest per id, ordered by creation time.
pub(crate) fn latest_versions(versions: Vec<TaskRecord>) -> Vec<TaskRecord> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut latest: Vec<TaskRecord> = Vec::new();
    for task in versions {
        match index.get(&task.id) {
            Some(&i) => latest[i] = task,
            None => {
                index.insert(task.id.clone(), latest.len());
                latest.push(task);
            }
        }
    }
    latest.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    latest
}
