//! Implementation of `warden budget`.

use crate::admission::{AdmissionController, AdmissionRequest, Estimate};
use crate::cli::BudgetArgs;
use crate::config::Config;
use crate::context::WorkspaceContext;
use crate::error::Result;
use crate::ledger::LedgerStore;

/// Evaluate admission for a hypothetical run and print the decision.
pub fn cmd_budget(ctx: &WorkspaceContext, config: &Config, args: BudgetArgs) -> Result<()> {
    let controller = AdmissionController::new(
        config.budgets.clone(),
        LedgerStore::new(&ctx.ledger_dir),
    );
    let request = AdmissionRequest::new(args.agent, args.job_type).with_estimate(Estimate {
        tokens: args.tokens,
        runtime_seconds: args.runtime_seconds,
        output_chars: None,
    });

    let outcome = controller.evaluate(&request)?;

    println!("Decision: {}", outcome.decision);
    println!("Scope:    {}", outcome.scope);
    if let Some(reason) = &outcome.reason {
        println!("Reason:   {}", reason);
    }
    if let Some(retry_after) = outcome.retry_after {
        println!("Retry:    after {}", retry_after.to_rfc3339());
    }
    Ok(())
}
