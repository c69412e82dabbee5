//! Newline-delimited JSON append and read helpers.
//!
//! Appends are a single `write` of one complete line on a file opened in
//! append mode, so concurrent appenders (this process and external
//! producers) interleave whole lines. Readers are lenient: a line that does
//! not parse is skipped, never fatal.

use crate::error::{Result, WardenError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

/// Serialize a record to a single-line JSON string.
pub fn to_line<T: Serialize>(record: &T) -> Result<String> {
    serde_json::to_string(record)
        .map_err(|e| WardenError::LedgerError(format!("failed to serialize record: {}", e)))
}

/// Append one record as a JSON line, creating the file and parent dirs as needed.
pub fn append_record<P: AsRef<Path>, T: Serialize>(path: P, record: &T) -> Result<()> {
    let line = to_line(record)?;
    append_raw_lines(path, &[line])
}

/// Append pre-serialized lines. Each entry must not contain a newline.
pub fn append_raw_lines<P: AsRef<Path>>(path: P, lines: &[String]) -> Result<()> {
    let path = path.as_ref();
    if lines.is_empty() {
        return Ok(());
    }

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            WardenError::LedgerError(format!(
                "failed to create directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let mut buffer = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
    for line in lines {
        buffer.push_str(line);
        buffer.push('\n');
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            WardenError::LedgerError(format!("failed to open '{}': {}", path.display(), e))
        })?;

    file.write_all(buffer.as_bytes()).map_err(|e| {
        WardenError::LedgerError(format!("failed to append to '{}': {}", path.display(), e))
    })?;

    file.sync_data().map_err(|e| {
        WardenError::LedgerError(format!("failed to sync '{}': {}", path.display(), e))
    })?;

    Ok(())
}

/// Read the raw bytes of an NDJSON file. A missing file reads as empty.
///
/// Lines are decoded one at a time by the callers, so a line that is not
/// valid UTF-8 costs only itself.
pub fn read_bytes<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let path = path.as_ref();
    match fs::read(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(WardenError::LedgerError(format!(
            "failed to read '{}': {}",
            path.display(),
            e
        ))),
    }
}

/// Length in bytes of the newline-terminated prefix of `content`.
///
/// Anything past it is a partial line from an in-flight append.
pub fn complete_len(content: &[u8]) -> usize {
    content
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |i| i + 1)
}

/// Split `content` into lines without their `\n` or `\r\n` terminators.
pub fn split_lines(content: &[u8]) -> impl Iterator<Item = &[u8]> {
    content.split_inclusive(|&b| b == b'\n').map(|line| {
        let line = line.strip_suffix(b"\n").unwrap_or(line);
        line.strip_suffix(b"\r").unwrap_or(line)
    })
}

/// Parse every line of `content`, dropping blank and malformed lines.
pub fn parse_lines<T: DeserializeOwned>(content: &[u8]) -> Vec<T> {
    split_lines(content)
        .map(|line| line.trim_ascii())
        .filter(|line| !line.is_empty())
        .filter_map(|line| serde_json::from_slice(line).ok())
        .collect()
}

/// Read and parse all well-formed records of an NDJSON file.
pub fn read_records<P: AsRef<Path>, T: DeserializeOwned>(path: P) -> Result<Vec<T>> {
    Ok(parse_lines(&read_bytes(path)?))
}
