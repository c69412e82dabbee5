//! Moving old ledger entries into dated rollup files.

use super::records::{LedgerKind, TaskStatus};
use super::store::LedgerStore;
use crate::error::{Result, WardenError};
use crate::fs::{append_raw_lines, atomic_write, complete_len, read_bytes, split_lines};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

/// Entries moved per ledger kind by one rollup pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollupSummary {
    pub moved: BTreeMap<LedgerKind, usize>,
}

impl RollupSummary {
    pub fn total(&self) -> usize {
        self.moved.values().sum()
    }
}

impl LedgerStore {
    /// Move entries older than `days` into `rollup/<kind>-<YYYY-MM-DD>.jsonl`.
    ///
    /// Task versions move only once superseded by a newer version, or when
    /// the task is terminal, so the current view never changes.
    pub fn rollup(&self, days: u32, now: DateTime<Utc>) -> Result<RollupSummary> {
        let cutoff = now - Duration::days(i64::from(days));
        let mut summary = RollupSummary::default();
        for kind in LedgerKind::ALL {
            let moved = self.rollup_kind(kind, cutoff)?;
            if moved > 0 {
                summary.moved.insert(kind, moved);
            }
        }
        tracing::info!(moved = summary.total(), "ledger rollup finished");
        Ok(summary)
    }

    fn rollup_kind(&self, kind: LedgerKind, cutoff: DateTime<Utc>) -> Result<usize> {
        let path = self.path(kind);
        let content = read_bytes(&path)?;
        let complete_len = complete_len(&content);
        let lines: Vec<&[u8]> = split_lines(&content[..complete_len]).collect();
        if lines.is_empty() {
            return Ok(0);
        }

        let parsed: Vec<Option<Value>> = lines
            .iter()
            .map(|line| serde_json::from_slice(line).ok())
            .collect();

        let mut newest_version: HashMap<&str, usize> = HashMap::new();
        if kind == LedgerKind::Tasks {
            for (i, value) in parsed.iter().enumerate() {
                if let Some(id) = value.as_ref().and_then(|v| v.get("id")).and_then(Value::as_str) {
                    newest_version.insert(id, i);
                }
            }
        }

        let mut kept: Vec<&[u8]> = Vec::new();
        let mut moves: BTreeMap<String, Vec<&[u8]>> = BTreeMap::new();
        for (i, (line, value)) in lines.iter().zip(&parsed).enumerate() {
            let entry_time = value.as_ref().and_then(|v| entry_time(v, kind));
            let movable = match (value, entry_time) {
                (Some(v), Some(ts)) if ts < cutoff => {
                    kind != LedgerKind::Tasks || is_superseded(v, i, &newest_version) || is_terminal(v)
                }
                _ => false,
            };

            match entry_time {
                Some(ts) if movable => moves
                    .entry(ts.format("%Y-%m-%d").to_string())
                    .or_default()
                    .push(*line),
                _ => kept.push(*line),
            }
        }

        if moves.is_empty() {
            return Ok(0);
        }

        let mut moved = 0;
        for (date, entries) in moves {
            let target = self
                .rollup_dir()
                .join(format!("{}-{}.jsonl", kind.as_str(), date));
            let existing = read_bytes(&target)?;
            let present: HashSet<&[u8]> = split_lines(&existing).collect();
            // Moved lines parsed as JSON, so they are valid UTF-8.
            let fresh: Vec<String> = entries
                .iter()
                .filter(|line| !present.contains(*line))
                .map(|line| String::from_utf8_lossy(line).into_owned())
                .collect();
            append_raw_lines(&target, &fresh)?;
            moved += entries.len();
        }

        replace_log(&path, &kept, complete_len)?;
        tracing::debug!(kind = %kind, moved, "rolled up ledger entries");
        Ok(moved)
    }
}

/// Atomically replace the log at `path` with `kept`, followed by whatever was
/// appended after the first `observed_len` bytes were read.
pub(crate) fn replace_log(path: &Path, kept: &[&[u8]], observed_len: usize) -> Result<()> {
    let current = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => {
            return Err(WardenError::LedgerError(format!(
                "failed to re-read '{}': {}",
                path.display(),
                e
            )));
        }
    };

    let mut content = Vec::with_capacity(current.len());
    for line in kept {
        content.extend_from_slice(line);
        content.push(b'\n');
    }
    if current.len() > observed_len {
        content.extend_from_slice(&current[observed_len..]);
    }

    atomic_write(path, &content)
}

fn entry_time(value: &Value, kind: LedgerKind) -> Option<DateTime<Utc>> {
    let raw = value.get(kind.time_field())?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

fn is_superseded(value: &Value, index: usize, newest: &HashMap<&str, usize>) -> bool {
    value
        .get("id")
        .and_then(Value::as_str)
        .and_then(|id| newest.get(id))
        .is_some_and(|&newest_index| newest_index > index)
}

fn is_terminal(value: &Value) -> bool {
    value
        .get("status")
        .cloned()
        .and_then(|status| serde_json::from_value::<TaskStatus>(status).ok())
        .is_some_and(|status| status.is_terminal())
}
