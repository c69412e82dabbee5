//! Offset-based tailing of the incident log.

use super::record::IncidentRecord;
use crate::error::Result;
use std::fs::{self, File};
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;
use std::time::UNIX_EPOCH;
use tracing::{debug, warn};

/// Records appended since a checkpoint, plus the checkpoint to persist next.
#[derive(Debug, Clone, Default)]
pub struct IncidentBatch {
    /// Successfully parsed incidents, in file order.
    pub records: Vec<IncidentRecord>,

    /// Byte offset to resume from on the next read.
    pub next_offset: u64,

    /// File modification time in milliseconds since the epoch.
    pub mtime_ms: Option<i64>,

    /// Lines that failed to parse and were dropped.
    pub discarded: usize,

    /// True when the file had shrunk below the requested offset and was
    /// re-read from the start.
    pub reset: bool,
}

/// Read the incidents appended to `path` since byte `offset`.
///
/// - A missing file is an empty batch with `next_offset = 0`.
/// - An offset past the end of the file (rotation or truncation) re-reads
///   from byte 0.
/// - Each non-blank line is parsed on its own; unparsable lines are dropped
///   and counted in `discarded`.
/// - `next_offset` is the file size observed when the read started.
///
/// Unreadable files are logged and treated as empty, keeping `offset`.
pub fn read_batch(path: &Path, offset: u64) -> IncidentBatch {
    match try_read_batch(path, offset) {
        Ok(batch) => batch,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "incident log unreadable, treating as empty");
            IncidentBatch {
                next_offset: offset,
                ..IncidentBatch::default()
            }
        }
    }
}

fn try_read_batch(path: &Path, offset: u64) -> std::io::Result<IncidentBatch> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(IncidentBatch::default()),
        Err(e) => return Err(e),
    };

    let size = metadata.len();
    let mtime_ms = mtime_millis(&metadata);
    let reset = offset > size;
    let start = if reset { 0 } else { offset };

    if reset {
        debug!(path = %path.display(), offset, size, "incident log shrank, re-reading from start");
    }

    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(start))?;
    let mut buffer = Vec::with_capacity((size - start) as usize);
    file.take(size - start).read_to_end(&mut buffer)?;

    let text = String::from_utf8_lossy(&buffer);
    let mut records = Vec::new();
    let mut discarded = 0;
    for line in text.split('\n').map(str::trim).filter(|l| !l.is_empty()) {
        match serde_json::from_str::<IncidentRecord>(line) {
            Ok(record) => records.push(record),
            Err(_) => discarded += 1,
        }
    }

    Ok(IncidentBatch {
        records,
        next_offset: start + buffer.len() as u64,
        mtime_ms,
        discarded,
        reset,
    })
}

/// Modification time of `path` in epoch milliseconds, if it exists.
pub fn file_mtime_ms(path: &Path) -> Option<i64> {
    fs::metadata(path).ok().and_then(|m| mtime_millis(&m))
}

fn mtime_millis(metadata: &fs::Metadata) -> Option<i64> {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as i64)
}

/// Append one incident to the log.
pub fn append_incident(path: &Path, incident: &IncidentRecord) -> Result<()> {
    crate::fs::append_record(path, incident)
}
