//! Budget admission control.
//!
//! Before any sub-agent run is spawned, the dispatcher asks the
//! [`AdmissionController`] whether the run fits the configured budgets.
//! Usage is derived from the ledgers rather than kept in memory: runs come
//! from `run-ledger.jsonl`, admission queries from `budget-ledger.jsonl`.
//! Every evaluation is itself appended to the budget ledger with a snapshot
//! of the tiers it looked at.
//!
//! | decision | dispatch | when                                        |
//! |----------|----------|---------------------------------------------|
//! | allow    | yes      | no tier near its limit, or enforcement off  |
//! | warn     | yes      | a tier past the warn threshold (or soft)    |
//! | defer    | no       | hard mode, only concurrency over the limit  |
//! | deny     | no       | hard mode, any other limit exceeded         |

mod controller;
mod types;
mod window;

#[cfg(test)]
mod tests;

pub use controller::AdmissionController;
pub use types::{
    AdmissionDecision, AdmissionOutcome, AdmissionRequest, BudgetUsage, Estimate, TierSnapshot,
};
pub use window::{DEFAULT_WINDOW, parse_window, window_or_default};
