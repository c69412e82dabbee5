//! Configuration model for warden.
//!
//! This module defines the Config struct that represents `warden.yaml`.
//! It supports forward-compatible YAML parsing (unknown fields are ignored),
//! sensible defaults for optional fields, and validation of config values.

mod model;
mod operations;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export public API
pub use model::{Config, OrchestratorConfig};
pub use operations::resolve_against;
pub use types::{
    BudgetLimits, BudgetsConfig, EnforcementConfig, EnforcementMode, MirrorKind, RetryConfig,
    TrustTier,
};
