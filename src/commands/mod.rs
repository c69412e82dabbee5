//! Command implementations for warden.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations. Every command resolves the workspace and config the
//! same way, then works against a [`WorkspaceContext`].

mod budget;
mod housekeeping;
mod recon_status;
mod run;

use crate::cli::{Command, GlobalArgs};
use crate::config::Config;
use crate::context::WorkspaceContext;
use crate::error::Result;
use crate::gateway::{GatewayClient, HttpGatewayClient};
use std::sync::Arc;

/// Dispatch a command to its implementation.
pub async fn dispatch(global: &GlobalArgs, command: Command) -> Result<()> {
    let (ctx, config) = load_workspace(global)?;

    match command {
        Command::Run => run::cmd_run(ctx, config).await,
        Command::Tick(args) => run::cmd_tick(ctx, config, args).await,
        Command::ReconStatus(args) => recon_status::cmd_recon_status(&ctx, &config, args),
        Command::Rollup => housekeeping::cmd_rollup(&ctx, &config),
        Command::Maintain(args) => housekeeping::cmd_maintain(&ctx, &config, args),
        Command::Mirror => housekeeping::cmd_mirror(&ctx, &config).await,
        Command::Budget(args) => budget::cmd_budget(&ctx, &config, args),
    }
}

/// Resolve the workspace root and load its config.
fn load_workspace(global: &GlobalArgs) -> Result<(WorkspaceContext, Config)> {
    let root = WorkspaceContext::resolve_root(global.workspace.as_deref())?;
    let config_path = WorkspaceContext::resolve_config_path(&root, global.config.as_deref());
    let config = Config::load_or_default(&config_path)?;
    tracing::debug!(root = %root.display(), config = %config_path.display(), "workspace resolved");
    Ok((WorkspaceContext::new(&root, &config), config))
}

fn gateway_client(config: &Config) -> Result<Arc<dyn GatewayClient>> {
    Ok(Arc::new(HttpGatewayClient::new(&config.gateway)?))
}
