//! Implementation of `warden run` and `warden tick`.

use super::gateway_client;
use crate::cli::TickArgs;
use crate::config::Config;
use crate::context::WorkspaceContext;
use crate::error::{Result, WardenError};
use crate::scheduler::{Orchestrator, Scheduler, TickKind, TickReport};
use std::sync::Arc;

/// Start the scheduler and block until Ctrl-C.
pub async fn cmd_run(ctx: WorkspaceContext, config: Config) -> Result<()> {
    if !config.orchestrator.enabled {
        println!("Orchestrator is disabled (orchestrator.enabled = false); nothing to run.");
        return Ok(());
    }

    let gateway = gateway_client(&config)?;
    let orchestrator = Arc::new(Orchestrator::new(ctx, config, gateway));
    let scheduler = Scheduler::new(Arc::clone(&orchestrator));
    scheduler.start();

    tokio::signal::ctrl_c().await.map_err(|e| {
        WardenError::UserError(format!("failed to listen for Ctrl-C: {}", e))
    })?;

    scheduler.stop();
    orchestrator.flush().await;
    Ok(())
}

/// Run one trigger pass, or the daily pass with `--daily`.
pub async fn cmd_tick(ctx: WorkspaceContext, config: Config, args: TickArgs) -> Result<()> {
    let gateway = gateway_client(&config)?;
    let orchestrator = Orchestrator::new(ctx, config, gateway);

    let report = if args.daily {
        orchestrator.daily_tick().await
    } else {
        orchestrator.trigger(TickKind::Manual).await
    };
    // The runtime ends with this command; send the heartbeat now.
    orchestrator.flush().await;
    let report = report?;

    print_report(&report);
    Ok(())
}

fn print_report(report: &TickReport) {
    println!("Incidents read:   {}", report.incidents_read);
    println!("Tasks created:    {}", report.tasks_created);
    println!("Alerts raised:    {}", report.alerts);
    println!(
        "Incidents:        {} accepted, {} skipped, {} errors",
        report.incidents.accepted(),
        report.incidents.skipped(),
        report.incidents.errors()
    );
    println!(
        "Tasks:            {} accepted, {} skipped, {} errors",
        report.tasks.accepted(),
        report.tasks.skipped(),
        report.tasks.errors()
    );

    if let Some(housekeeping) = &report.housekeeping {
        if let Some(rollup) = &housekeeping.rollup {
            println!("Rolled up:        {} entries", rollup.total());
        }
        if let Some(summary) = &housekeeping.maintenance {
            println!(
                "Maintenance:      {} duplicate tasks, {} signals pruned",
                summary.duplicate_tasks.len(),
                summary.pruned_signals
            );
        }
        if let Some(mirror) = &housekeeping.mirror {
            println!("Mirror:           {:?}", mirror);
        }
    }
}
