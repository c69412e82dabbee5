//! Implementation of `warden rollup`, `warden maintain` and `warden mirror`.

use crate::cli::MaintainArgs;
use crate::config::Config;
use crate::context::WorkspaceContext;
use crate::error::{Result, WardenError};
use crate::ledger::{LedgerStore, MirrorOutcome, push_mirror};
use chrono::Utc;

/// Roll up entries older than `missionControl.rollup.days`. Runs whether or
/// not the daily rollup is enabled.
pub fn cmd_rollup(ctx: &WorkspaceContext, config: &Config) -> Result<()> {
    let store = LedgerStore::new(&ctx.ledger_dir);
    let summary = store.rollup(config.mission_control.rollup.days, Utc::now())?;

    if summary.total() == 0 {
        println!("Nothing to roll up.");
        return Ok(());
    }
    for (kind, moved) in &summary.moved {
        println!("  {:16} {:>5}", kind.as_str(), moved);
    }
    println!("Rolled up {} entries into {}", summary.total(), store.rollup_dir().display());
    Ok(())
}

/// Deduplicate tasks and prune signals, printing the summary as JSON.
pub fn cmd_maintain(ctx: &WorkspaceContext, config: &Config, args: MaintainArgs) -> Result<()> {
    let store = LedgerStore::new(&ctx.ledger_dir);
    let summary = store.maintain(
        config.mission_control.maintenance.dedupe_window_minutes,
        args.dry_run,
    )?;

    let json = serde_json::to_string_pretty(&summary).map_err(|e| {
        WardenError::LedgerError(format!("failed to serialize prune summary: {}", e))
    })?;
    println!("{}", json);
    Ok(())
}

/// Push one snapshot to the configured mirror.
pub async fn cmd_mirror(ctx: &WorkspaceContext, config: &Config) -> Result<()> {
    let store = LedgerStore::new(&ctx.ledger_dir);
    match push_mirror(&store, &config.mission_control.mirror, &ctx.root).await {
        MirrorOutcome::Disabled => println!("Mirror is disabled (missionControl.mirror.enabled)."),
        MirrorOutcome::Written(path) => println!("Snapshot written to {}", path.display()),
        MirrorOutcome::Posted(status) => println!("Snapshot posted (HTTP {})", status),
        MirrorOutcome::Failed(error) => {
            return Err(WardenError::LedgerError(format!("mirror push failed: {}", error)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::MirrorKind;
    use crate::ledger::NewTask;
    use crate::test_support::TestWorkspace;

    #[test]
    fn maintain_dry_run_leaves_tasks_open() {
        let ws = TestWorkspace::new();
        let store = LedgerStore::new(&ws.ctx.ledger_dir);
        for _ in 0..2 {
            store
                .create_task(NewTask {
                    title: "Port 22 open".to_string(),
                    source: Some("scanner".to_string()),
                    ..NewTask::default()
                })
                .unwrap();
        }

        cmd_maintain(&ws.ctx, &ws.config, MaintainArgs { dry_run: true }).unwrap();

        let open = store
            .task_view()
            .unwrap()
            .into_iter()
            .filter(|t| !t.status.is_terminal())
            .count();
        assert_eq!(open, 2);
    }

    #[test]
    fn rollup_of_empty_ledger_succeeds() {
        let ws = TestWorkspace::new();
        cmd_rollup(&ws.ctx, &ws.config).unwrap();
    }

    #[tokio::test]
    async fn mirror_file_is_written() {
        let mut config = Config::default();
        config.mission_control.mirror.enabled = true;
        config.mission_control.mirror.kind = MirrorKind::File;
        config.mission_control.mirror.path = Some("out/mirror.json".to_string());
        let ws = TestWorkspace::with_config(config);

        cmd_mirror(&ws.ctx, &ws.config).await.unwrap();

        assert!(ws.root().join("out").join("mirror.json").exists());
    }

    #[tokio::test]
    async fn failed_mirror_is_ledger_error() {
        let mut config = Config::default();
        config.mission_control.mirror.enabled = true;
        config.mission_control.mirror.kind = MirrorKind::Webhook;
        config.mission_control.mirror.url = Some("http://127.0.0.1:9/hook".to_string());
        config.mission_control.mirror.timeout_ms = 500;
        let ws = TestWorkspace::with_config(config);

        let err = cmd_mirror(&ws.ctx, &ws.config).await.unwrap_err();

        assert_eq!(err.exit_code(), crate::exit_codes::LEDGER_FAILURE);
    }
}
