//! Implementation of `warden recon-status`.

use crate::cli::ReconStatusArgs;
use crate::config::Config;
use crate::context::WorkspaceContext;
use crate::error::{Result, WardenError};
use crate::recon::{StatusVerifier, sanitize_claims};

/// Verify the status file and print what is actually true. With
/// `--sanitize`, print the given file with stale claims corrected instead.
pub fn cmd_recon_status(
    ctx: &WorkspaceContext,
    config: &Config,
    args: ReconStatusArgs,
) -> Result<()> {
    let refresh = StatusVerifier::new(ctx, config).refresh()?;

    if let Some(completion) = &refresh.completion {
        eprintln!("Emitted completion incident {}", completion.id);
    }

    let Some(path) = args.sanitize else {
        println!("{}", refresh.status.describe());
        return Ok(());
    };

    let text = std::fs::read_to_string(&path).map_err(|e| {
        WardenError::UserError(format!("failed to read '{}': {}", path.display(), e))
    })?;
    print!("{}", sanitize_claims(&text, &refresh.status));
    Ok(())
}
