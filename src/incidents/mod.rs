//! Incident records and the append-only incident log.
//!
//! Incidents are produced by external collaborators (scanners, research
//! parsers) and by the status verifier, one JSON object per line in
//! `memory/incidents.jsonl`. This module owns the record shape and the
//! offset-based tail reader the scheduler drains on every trigger.

mod reader;
mod record;


pub use reader::{IncidentBatch, append_incident, file_mtime_ms, read_batch};
pub use record::{IncidentRecord, Severity};
