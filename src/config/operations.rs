//! Config loading, validation, and utility operations.

use super::model::Config;
use super::types::{BudgetLimits, MirrorKind};
use crate::admission::parse_window;
use crate::error::{Result, WardenError};
use std::path::Path;

impl Config {
    /// Load config from a YAML file.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(WardenError::ConfigError)` - Read error, parse error, or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            WardenError::ConfigError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load config from a YAML file, falling back to defaults when it does not exist.
    ///
    /// A file that exists but fails to parse or validate is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to a mapping.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| WardenError::ConfigError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            WardenError::ConfigError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values.
    ///
    /// Validation rules:
    /// - every budget window parses (`<n>m`, `<n>h`, `<n>d`)
    /// - threshold percentages are within 1..=1000 and warn <= hard stop
    /// - `orchestrator.spawnRetry.maxAttempts` is positive
    /// - `missionControl.rollup.days` is positive
    /// - an enabled mirror names its target
    pub fn validate(&self) -> Result<()> {
        if let Some(global) = &self.budgets.global {
            validate_limits("budgets.global", global)?;
        }
        for (agent, limits) in &self.budgets.by_agent {
            validate_limits(&format!("budgets.byAgent.{}", agent), limits)?;
        }
        for (job_type, limits) in &self.budgets.by_job_type {
            validate_limits(&format!("budgets.byJobType.{}", job_type), limits)?;
        }

        let enforcement = &self.budgets.enforcement;
        for (name, pct) in [
            ("warnThresholdPct", enforcement.warn_threshold_pct),
            ("hardStopThresholdPct", enforcement.hard_stop_threshold_pct),
        ] {
            if !(1..=1000).contains(&pct) {
                return Err(WardenError::ConfigError(format!(
                    "config validation failed: budgets.enforcement.{} must be between 1 and 1000 (found {})",
                    name, pct
                )));
            }
        }
        if enforcement.warn_threshold_pct > enforcement.hard_stop_threshold_pct {
            return Err(WardenError::ConfigError(
                "config validation failed: budgets.enforcement.warnThresholdPct must not exceed hardStopThresholdPct"
                    .to_string(),
            ));
        }

        if self.orchestrator.spawn_retry.max_attempts == 0 {
            return Err(WardenError::ConfigError(
                "config validation failed: orchestrator.spawnRetry.maxAttempts must be greater than 0"
                    .to_string(),
            ));
        }

        for (index, rule) in self.orchestrator.routing.iter().enumerate() {
            if let Some(agent_id) = &rule.agent_id
                && agent_id.trim().is_empty()
            {
                return Err(WardenError::ConfigError(format!(
                    "config validation failed: orchestrator.routing[{}] has an empty agentId",
                    index
                )));
            }
        }

        let mc = &self.mission_control;
        if mc.rollup.days == 0 {
            return Err(WardenError::ConfigError(
                "config validation failed: missionControl.rollup.days must be greater than 0"
                    .to_string(),
            ));
        }

        if mc.mirror.enabled {
            let missing = match mc.mirror.kind {
                MirrorKind::File => mc.mirror.path.as_deref().is_none_or(str::is_empty),
                MirrorKind::Webhook => mc.mirror.url.as_deref().is_none_or(str::is_empty),
            };
            if missing {
                return Err(WardenError::ConfigError(
                    "config validation failed: missionControl.mirror is enabled but has no path/url for its kind"
                        .to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Resolve the ledger directory against the workspace root.
    pub fn ledger_dir(&self, workspace_root: &Path) -> std::path::PathBuf {
        resolve_against(workspace_root, &self.mission_control.ledger_dir)
    }
}

/// Join `value` onto `root` unless it is already absolute.
pub fn resolve_against(root: &Path, value: &str) -> std::path::PathBuf {
    let path = Path::new(value);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

fn validate_limits(section: &str, limits: &BudgetLimits) -> Result<()> {
    if parse_window(&limits.window).is_none() {
        return Err(WardenError::ConfigError(format!(
            "config validation failed: {}.window '{}' is not a valid window (use e.g. 30m, 1h, 24h, 7d)",
            section, limits.window
        )));
    }
    Ok(())
}
