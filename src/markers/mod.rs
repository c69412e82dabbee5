//! Exclusive completion markers.
//!
//! A marker is a small JSON file created with **create_new** semantics
//! (exclusive create). Whoever creates it wins the right to perform a
//! one-time side effect; every other caller, in this process or another,
//! observes `AlreadyExists` and does nothing. Markers are never removed by
//! this crate, so the marker directory itself is the durable record of which
//! transitions have already been acted on.
//!
//! # Marker Files
//!
//! Markers live in `recon/.markers/` and are named `<key>.done`, where the
//! key is the monitored run id (or `pid-<N>` when the launcher supplied no
//! run id). The file body records who created it and when.

mod metadata;
mod operations;

#[cfg(test)]
mod tests;

pub use metadata::{MarkerMetadata, owner_string};
pub use operations::{MarkerOutcome, create_marker, marker_key, marker_path, read_marker};
