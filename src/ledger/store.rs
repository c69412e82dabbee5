//! Per-kind append and read.

use super::records::{
    ActivityRecord, BudgetLedgerRecord, DocumentRecord, LedgerKind, MessageRecord,
    RunLedgerRecord, SignalRecord, SubscriptionRecord, new_id,
};
use crate::error::Result;
use crate::fs::{append_record, read_records};
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Handle to a ledger directory.
///
/// Holds no state beyond the path: every read goes to disk, so several
/// stores (or processes) over the same directory see each other's appends.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    dir: PathBuf,
}

impl LedgerStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, kind: LedgerKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }

    /// Directory holding rolled-up entries.
    pub fn rollup_dir(&self) -> PathBuf {
        self.dir.join("rollup")
    }

    /// Append one record to the log for `kind`.
    pub fn append<T: Serialize>(&self, kind: LedgerKind, record: &T) -> Result<()> {
        append_record(self.path(kind), record)
    }

    /// Read every well-formed record of `kind`, oldest first.
    pub fn read<T: DeserializeOwned>(&self, kind: LedgerKind) -> Result<Vec<T>> {
        read_records(self.path(kind))
    }

    pub fn record_activity(&self, activity: &ActivityRecord) -> Result<()> {
        self.append(LedgerKind::Activities, activity)
    }

    pub fn activities(&self) -> Result<Vec<ActivityRecord>> {
        self.read(LedgerKind::Activities)
    }

    pub fn record_signal(&self, signal: &SignalRecord) -> Result<()> {
        self.append(LedgerKind::Signals, signal)
    }

    pub fn signals(&self) -> Result<Vec<SignalRecord>> {
        self.read(LedgerKind::Signals)
    }

    pub fn record_run(&self, run: &RunLedgerRecord) -> Result<()> {
        self.append(LedgerKind::RunLedger, run)
    }

    pub fn runs(&self) -> Result<Vec<RunLedgerRecord>> {
        self.read(LedgerKind::RunLedger)
    }

    pub fn record_budget(&self, entry: &BudgetLedgerRecord) -> Result<()> {
        self.append(LedgerKind::BudgetLedger, entry)
    }

    pub fn budget_entries(&self) -> Result<Vec<BudgetLedgerRecord>> {
        self.read(LedgerKind::BudgetLedger)
    }

    pub fn add_message(&self, task_id: &str, author: &str, body: &str) -> Result<MessageRecord> {
        let message = MessageRecord {
            id: new_id("msg"),
            task_id: task_id.to_string(),
            author: author.to_string(),
            body: body.to_string(),
            created_at: Utc::now(),
        };
        self.append(LedgerKind::Messages, &message)?;
        Ok(message)
    }

    pub fn messages_for(&self, task_id: &str) -> Result<Vec<MessageRecord>> {
        let all: Vec<MessageRecord> = self.read(LedgerKind::Messages)?;
        Ok(all.into_iter().filter(|m| m.task_id == task_id).collect())
    }

    pub fn add_document(
        &self,
        task_id: Option<&str>,
        title: &str,
        path: Option<&str>,
        content: Option<&str>,
    ) -> Result<DocumentRecord> {
        let document = DocumentRecord {
            id: new_id("doc"),
            task_id: task_id.map(str::to_string),
            title: title.to_string(),
            path: path.map(str::to_string),
            content: content.map(str::to_string),
            created_at: Utc::now(),
        };
        self.append(LedgerKind::Documents, &document)?;
        Ok(document)
    }

    /// Documents attached to `task_id`, or every document when `None`.
    pub fn documents(&self, task_id: Option<&str>) -> Result<Vec<DocumentRecord>> {
        let all: Vec<DocumentRecord> = self.read(LedgerKind::Documents)?;
        Ok(match task_id {
            Some(id) => all
                .into_iter()
                .filter(|d| d.task_id.as_deref() == Some(id))
                .collect(),
            None => all,
        })
    }

    pub fn subscribe(&self, task_id: &str, agent_id: &str) -> Result<SubscriptionRecord> {
        let subscription = SubscriptionRecord {
            id: new_id("sub"),
            task_id: task_id.to_string(),
            agent_id: agent_id.to_string(),
            created_at: Utc::now(),
        };
        self.append(LedgerKind::Subscriptions, &subscription)?;
        Ok(subscription)
    }

    pub fn subscribers(&self, task_id: &str) -> Result<Vec<SubscriptionRecord>> {
        let all: Vec<SubscriptionRecord> = self.read(LedgerKind::Subscriptions)?;
        Ok(all.into_iter().filter(|s| s.task_id == task_id).collect())
    }
}
