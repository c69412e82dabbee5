//! Status verification for externally launched long-running jobs.
//!
//! An external launcher starts a job (a recon run) and writes
//! `recon/status.json` claiming it is running. Claims go stale: the process
//! may have died, the pid may have been reused, the log may be gone. The
//! [`StatusVerifier`] checks the claim against the host on every pass,
//! rewrites the status file with what it actually found, and emits exactly
//! one completion incident when a job it saw running has stopped.
//!
//! # At-most-once completion
//!
//! The running->finished transition is derived from the status file alone
//! (the previous record said `running` or carries `finishedAt`). The right to
//! emit the completion incident is decided by an exclusive marker file keyed
//! by run id (see [`crate::markers`]), so concurrent passes, in this process
//! or another, emit one incident between them.

mod claims;
mod probe;
mod status;
mod verifier;

#[cfg(test)]
mod tests;

pub use claims::sanitize_claims;
pub use probe::{HostProcessProbe, ProcessProbe};
pub use status::{ReconStatus, StatusReason, read_status};
pub use verifier::{COMPLETION_SOURCE, Refresh, StatusVerifier};
