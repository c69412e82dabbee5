//! Filesystem utilities for warden.
//!
//! Two write disciplines cover every file this crate touches: whole-file
//! atomic replacement for single-value state, and line appends for logs.

pub mod atomic;
pub mod ndjson;

pub use atomic::{atomic_write, atomic_write_json};
pub use ndjson::{
    append_raw_lines, append_record, complete_len, read_bytes, read_records, split_lines,
};
