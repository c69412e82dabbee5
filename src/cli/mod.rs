//! CLI argument parsing for warden.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Warden: incident and task dispatch control plane for an agent gateway.
///
/// Tails the workspace incident log, routes incidents and ledger tasks to
/// sub-agents through the gateway under budget admission, and keeps the
/// Mission Control ledger tidy on a wall-clock schedule.
#[derive(Parser, Debug)]
#[command(name = "warden")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Flags accepted by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Workspace root (defaults to $WARDEN_WORKSPACE, then the current directory).
    #[arg(long, global = true)]
    pub workspace: Option<PathBuf>,

    /// Config file (defaults to $WARDEN_CONFIG, then <workspace>/warden.yaml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,
}

/// Available commands for warden.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the scheduler until interrupted.
    ///
    /// Fires the hourly and daily passes on wall-clock boundaries.
    Run,

    /// Run one pass now.
    ///
    /// Drains new incidents and dispatches incidents and tasks.
    Tick(TickArgs),

    /// Verify the monitored job's status file.
    ReconStatus(ReconStatusArgs),

    /// Move old ledger entries into dated rollup files.
    Rollup,

    /// Cancel duplicate tasks and prune repeated signals.
    Maintain(MaintainArgs),

    /// Push a ledger snapshot to the configured mirror.
    Mirror,

    /// Ask the admission controller about a run without spawning it.
    ///
    /// The query itself is recorded in the budget ledger.
    Budget(BudgetArgs),
}

#[derive(Args, Debug)]
pub struct TickArgs {
    /// Run the daily pass (including housekeeping) instead of a trigger pass.
    #[arg(long)]
    pub daily: bool,
}

#[derive(Args, Debug)]
pub struct ReconStatusArgs {
    /// Rewrite stale running/finished claims in this file and print the result.
    #[arg(long, value_name = "FILE")]
    pub sanitize: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct MaintainArgs {
    /// Report what would change without writing.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct BudgetArgs {
    /// Agent that would run.
    pub agent: String,

    /// Job type of the run.
    pub job_type: String,

    /// Estimated tokens the run would consume.
    #[arg(long)]
    pub tokens: Option<u64>,

    /// Estimated runtime in seconds.
    #[arg(long)]
    pub runtime_seconds: Option<u64>,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_debug_assert() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_run() {
        let cli = Cli::try_parse_from(["warden", "run"]).unwrap();
        assert!(matches!(cli.command, Command::Run));
        assert!(!cli.global.log_json);
        assert!(cli.global.workspace.is_none());
    }

    #[test]
    fn parse_tick_daily() {
        let cli = Cli::try_parse_from(["warden", "tick", "--daily"]).unwrap();
        if let Command::Tick(args) = cli.command {
            assert!(args.daily);
        } else {
            panic!("Expected Tick command");
        }
    }

    #[test]
    fn parse_globals_after_subcommand() {
        let cli = Cli::try_parse_from([
            "warden",
            "maintain",
            "--dry-run",
            "--workspace",
            "/ws",
            "--config",
            "/etc/warden.yaml",
            "--log-json",
        ])
        .unwrap();

        assert_eq!(cli.global.workspace, Some(PathBuf::from("/ws")));
        assert_eq!(cli.global.config, Some(PathBuf::from("/etc/warden.yaml")));
        assert!(cli.global.log_json);
        assert!(matches!(cli.command, Command::Maintain(MaintainArgs { dry_run: true })));
    }

    #[test]
    fn parse_recon_status_sanitize() {
        let cli =
            Cli::try_parse_from(["warden", "recon-status", "--sanitize", "reply.txt"]).unwrap();
        if let Command::ReconStatus(args) = cli.command {
            assert_eq!(args.sanitize, Some(PathBuf::from("reply.txt")));
        } else {
            panic!("Expected ReconStatus command");
        }
    }

    #[test]
    fn parse_budget() {
        let cli = Cli::try_parse_from(["warden", "budget", "ops", "recon", "--tokens", "1200"])
            .unwrap();
        if let Command::Budget(args) = cli.command {
            assert_eq!(args.agent, "ops");
            assert_eq!(args.job_type, "recon");
            assert_eq!(args.tokens, Some(1200));
            assert!(args.runtime_seconds.is_none());
        } else {
            panic!("Expected Budget command");
        }
    }

    #[test]
    fn budget_requires_job_type() {
        assert!(Cli::try_parse_from(["warden", "budget", "ops"]).is_err());
    }
}
