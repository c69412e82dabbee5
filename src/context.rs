//! Workspace path resolution for warden.
//!
//! Every file this crate reads or writes lives under one agent workspace.
//! Commands resolve a [`WorkspaceContext`] once and take all paths from it,
//! so the layout is defined in exactly one place.

use crate::config::{Config, resolve_against};
use crate::error::{Result, WardenError};
use std::env;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the workspace root.
pub const WORKSPACE_ENV: &str = "WARDEN_WORKSPACE";

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV: &str = "WARDEN_CONFIG";

/// Default config file name at the workspace root.
pub const DEFAULT_CONFIG_FILE: &str = "warden.yaml";

/// Resolved paths for one agent workspace. All paths are absolute when the
/// root is.
#[derive(Debug, Clone)]
pub struct WorkspaceContext {
    /// Workspace root.
    pub root: PathBuf,

    /// `memory/` directory holding incident and orchestrator logs.
    pub memory_dir: PathBuf,

    /// Status file rewritten by the status verifier.
    pub recon_status_path: PathBuf,

    /// Directory of completion markers (one file per finished run).
    pub markers_dir: PathBuf,

    /// Mission Control ledger directory.
    pub ledger_dir: PathBuf,
}

impl WorkspaceContext {
    /// Build a context for `root` using the configured relative paths.
    pub fn new<P: AsRef<Path>>(root: P, config: &Config) -> Self {
        let root = root.as_ref().to_path_buf();
        let recon_status_path = resolve_against(&root, &config.mission_control.recon.status_path);
        let markers_dir = recon_status_path
            .parent()
            .map(|p| p.join(".markers"))
            .unwrap_or_else(|| root.join("recon").join(".markers"));

        Self {
            memory_dir: root.join("memory"),
            ledger_dir: config.ledger_dir(&root),
            recon_status_path,
            markers_dir,
            root,
        }
    }

    /// Resolve the workspace root: explicit argument, then `WARDEN_WORKSPACE`,
    /// then the current working directory.
    pub fn resolve_root(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return absolutize(path);
        }
        if let Ok(value) = env::var(WORKSPACE_ENV)
            && !value.trim().is_empty()
        {
            return absolutize(Path::new(value.trim()));
        }
        env::current_dir().map_err(|e| {
            WardenError::UserError(format!("failed to get current working directory: {}", e))
        })
    }

    /// Resolve the config path: explicit argument, then `WARDEN_CONFIG`,
    /// then `<root>/warden.yaml`.
    pub fn resolve_config_path(root: &Path, explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        match env::var(CONFIG_ENV) {
            Ok(value) if !value.trim().is_empty() => PathBuf::from(value.trim()),
            _ => root.join(DEFAULT_CONFIG_FILE),
        }
    }

    /// Append-only incident log (`memory/incidents.jsonl`).
    pub fn incidents_path(&self) -> PathBuf {
        self.memory_dir.join("incidents.jsonl")
    }

    /// Incident dispatch records.
    pub fn dispatch_log_path(&self) -> PathBuf {
        self.memory_dir.join("orchestrator.dispatch.jsonl")
    }

    /// Task dispatch records.
    pub fn task_dispatch_log_path(&self) -> PathBuf {
        self.memory_dir.join("orchestrator.tasks.jsonl")
    }

    /// Scheduler checkpoint.
    pub fn state_path(&self) -> PathBuf {
        self.memory_dir.join("orchestrator.state.json")
    }

    /// Supervision registry of spawned runs.
    pub fn subagent_runs_path(&self) -> PathBuf {
        self.memory_dir.join("subagent-runs.jsonl")
    }

    /// Resolve a configured path (mirror target, ...) against the root.
    pub fn resolve(&self, value: &str) -> PathBuf {
        resolve_against(&self.root, value)
    }
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = env::current_dir().map_err(|e| {
        WardenError::UserError(format!("failed to get current working directory: {}", e))
    })?;
    Ok(cwd.join(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_layout() {
        let ctx = WorkspaceContext::new("/ws", &Config::default());

        assert_eq!(ctx.incidents_path(), Path::new("/ws/memory/incidents.jsonl"));
        assert_eq!(
            ctx.dispatch_log_path(),
            Path::new("/ws/memory/orchestrator.dispatch.jsonl")
        );
        assert_eq!(
            ctx.task_dispatch_log_path(),
            Path::new("/ws/memory/orchestrator.tasks.jsonl")
        );
        assert_eq!(
            ctx.state_path(),
            Path::new("/ws/memory/orchestrator.state.json")
        );
        assert_eq!(ctx.recon_status_path, Path::new("/ws/recon/status.json"));
        assert_eq!(ctx.markers_dir, Path::new("/ws/recon/.markers"));
        assert_eq!(ctx.ledger_dir, Path::new("/ws/mission-control"));
    }

    #[test]
    fn test_configured_status_path_moves_markers() {
        let mut config = Config::default();
        config.mission_control.recon.status_path = "jobs/scan/state.json".to_string();
        let ctx = WorkspaceContext::new("/ws", &config);

        assert_eq!(ctx.recon_status_path, Path::new("/ws/jobs/scan/state.json"));
        assert_eq!(ctx.markers_dir, Path::new("/ws/jobs/scan/.markers"));
    }

    #[test]
    #[serial]
    fn test_resolve_root_prefers_explicit_then_env() {
        // SAFETY: serialized with other env-mutating tests.
        unsafe { env::set_var(WORKSPACE_ENV, "/from-env") };
        assert_eq!(
            WorkspaceContext::resolve_root(Some(Path::new("/explicit"))).unwrap(),
            PathBuf::from("/explicit")
        );
        assert_eq!(
            WorkspaceContext::resolve_root(None).unwrap(),
            PathBuf::from("/from-env")
        );
        unsafe { env::remove_var(WORKSPACE_ENV) };
    }

    #[test]
    #[serial]
    fn test_resolve_config_path_defaults_to_root() {
        unsafe { env::remove_var(CONFIG_ENV) };
        assert_eq!(
            WorkspaceContext::resolve_config_path(Path::new("/ws"), None),
            PathBuf::from("/ws/warden.yaml")
        );

        unsafe { env::set_var(CONFIG_ENV, "/etc/warden.yaml") };
        assert_eq!(
            WorkspaceContext::resolve_config_path(Path::new("/ws"), None),
            PathBuf::from("/etc/warden.yaml")
        );
        unsafe { env::remove_var(CONFIG_ENV) };
    }
}
