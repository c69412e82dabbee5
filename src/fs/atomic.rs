//! Atomic file replacement for state and status files.
//!
//! Every rewritten file (`orchestrator.state.json`, `recon/status.json`,
//! compacted ledgers, mirror snapshots) goes through this module:
//! 1. Write content to a uniquely named temporary file in the same directory
//! 2. Sync the file to disk (fsync)
//! 3. Rename over the target
//!
//! Temporary names carry the process id and a random suffix, so several
//! writers racing on the same target never share a temp file. The last
//! rename wins and readers only ever observe a complete file.

use crate::error::{Result, WardenError};
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Atomically write bytes to a file, creating parent directories as needed.
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            WardenError::LedgerError(format!(
                "failed to create parent directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let temp_path = generate_temp_path(path)?;
    write_and_sync(&temp_path, content)?;
    atomic_replace(&temp_path, path)
}

/// Serialize `value` as pretty JSON (with trailing newline) and write it atomically.
pub fn atomic_write_json<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<()> {
    let path = path.as_ref();
    let mut json = serde_json::to_string_pretty(value).map_err(|e| {
        WardenError::LedgerError(format!(
            "failed to serialize '{}' to JSON: {}",
            path.display(),
            e
        ))
    })?;
    json.push('\n');
    atomic_write(path, json.as_bytes())
}

/// Temp path next to the target: `.{filename}.{pid}.{random}.tmp`.
fn generate_temp_path(target: &Path) -> Result<PathBuf> {
    let parent = target.parent().unwrap_or(Path::new("."));
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            WardenError::LedgerError(format!("invalid file path '{}'", target.display()))
        })?;

    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let temp_name = format!(".{}.{}.{}.tmp", filename, std::process::id(), &suffix[..12]);
    Ok(parent.join(temp_name))
}

fn write_and_sync(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| {
        WardenError::LedgerError(format!(
            "failed to create temporary file '{}': {}",
            path.display(),
            e
        ))
    })?;

    let written = file.write_all(content).and_then(|()| file.sync_all());
    if let Err(e) = written {
        let _ = fs::remove_file(path);
        return Err(WardenError::LedgerError(format!(
            "failed to write temporary file '{}': {}",
            path.display(),
            e
        )));
    }

    Ok(())
}

fn atomic_replace(source: &Path, target: &Path) -> Result<()> {
    fs::rename(source, target).map_err(|e| {
        let _ = fs::remove_file(source);
        WardenError::LedgerError(format!(
            "failed to atomically replace '{}': {}",
            target.display(),
            e
        ))
    })?;

    // Persist the directory entry as well.
    #[cfg(unix)]
    if let Some(parent) = target.parent()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all();
    }

    Ok(())
}
