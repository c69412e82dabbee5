//! Mission Control ledger store.
//!
//! One NDJSON log per record kind under the ledger directory
//! (`mission-control/` by default):
//!
//! ```text
//! tasks.jsonl          activities.jsonl     messages.jsonl
//! documents.jsonl      subscriptions.jsonl  signals.jsonl
//! run-ledger.jsonl     budget-ledger.jsonl  rollup/<kind>-<date>.jsonl
//! ```
//!
//! Logs are append-only. The two passes that rewrite a log (rollup and
//! signal pruning) replace it atomically and carry over anything appended
//! while they ran.

mod intake;
mod maintenance;
mod mirror;
mod records;
mod rollup;
mod store;
mod tasks;


pub use intake::{IntakeOutcome, QA_REQUIRED_LABEL};
pub use maintenance::{DUPLICATE_LABEL, DuplicateTask, PruneSummary};
pub use mirror::{MirrorOutcome, MirrorSnapshot, push_mirror};
pub(crate) use records::new_id;
pub use records::{
    ActivityKind, ActivityRecord, BudgetLedgerRecord, DocumentRecord, LedgerKind, MessageRecord,
    RUN_STATUS_RUNNING, RunLedgerRecord, SignalRecord, SubscriptionRecord, TaskPriority,
    TaskRecord, TaskStatus,
};
pub use rollup::RollupSummary;
pub use store::LedgerStore;
pub use tasks::{NewTask, TaskPatch};
