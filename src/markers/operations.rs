//! Marker creation and lookup.

use super::metadata::MarkerMetadata;
use crate::error::{Result, WardenError};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Result of an exclusive create attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerOutcome {
    /// This caller created the marker and owns the side effect.
    Created,
    /// Another caller created it first.
    AlreadyExists,
}

/// Derive the marker key for a monitored run: the run id when present,
/// otherwise `pid-<N>`. Characters outside `[A-Za-z0-9._-]` become `_`.
///
/// Returns `None` when neither identity is known; such a run cannot be
/// deduplicated and must not emit anything.
pub fn marker_key(run_id: Option<&str>, pid: Option<u32>) -> Option<String> {
    let raw = match (run_id.map(str::trim), pid) {
        (Some(id), _) if !id.is_empty() => id.to_string(),
        (_, Some(pid)) => format!("pid-{}", pid),
        _ => return None,
    };

    let sanitized: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    Some(sanitized.trim_start_matches('.').to_string())
}

/// Path of the marker for `key` inside `dir`.
pub fn marker_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{}.done", key))
}

/// Create a marker file exclusively.
///
/// Exactly one caller racing on the same path receives
/// [`MarkerOutcome::Created`]. Metadata is written after the create; a
/// metadata write failure leaves the (empty) marker in place, since the
/// marker's existence is what matters.
pub fn create_marker(path: &Path, metadata: &MarkerMetadata) -> Result<MarkerOutcome> {
    if let Some(parent) = path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            WardenError::LedgerError(format!(
                "failed to create marker directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(MarkerOutcome::AlreadyExists),
        Err(e) => {
            return Err(WardenError::LedgerError(format!(
                "failed to create marker '{}': {}",
                path.display(),
                e
            )));
        }
    };

    let json = metadata.to_json()?;
    if let Err(e) = file.write_all(json.as_bytes()).and_then(|()| file.sync_all()) {
        tracing::warn!(path = %path.display(), error = %e, "marker created but metadata write failed");
    }

    Ok(MarkerOutcome::Created)
}

/// Read a marker's metadata, if the marker exists and is readable.
pub fn read_marker(path: &Path) -> Option<MarkerMetadata> {
    if !path.exists() {
        return None;
    }
    MarkerMetadata::from_file(path).ok()
}
