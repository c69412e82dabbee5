//! Error types for warden.
//!
//! Uses thiserror for derive macros. Messages are operator-facing: they name
//! the file or call involved so the failure can be acted on from a log line.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for warden operations.
#[derive(Error, Debug)]
pub enum WardenError {
    /// Bad arguments or an invalid workspace.
    #[error("{0}")]
    UserError(String),

    /// Configuration could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A ledger, state, or status file operation failed.
    #[error("Ledger operation failed: {0}")]
    LedgerError(String),

    /// The gateway RPC boundary failed (transport, timeout, or remote error).
    #[error("Gateway call failed: {0}")]
    GatewayError(String),

    /// The status verifier could not inspect the monitored process.
    #[error("Status verification failed: {0}")]
    VerifierError(String),
}

impl WardenError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            WardenError::UserError(_) => exit_codes::USER_ERROR,
            WardenError::ConfigError(_) => exit_codes::CONFIG_ERROR,
            WardenError::LedgerError(_) => exit_codes::LEDGER_FAILURE,
            WardenError::GatewayError(_) => exit_codes::GATEWAY_FAILURE,
            WardenError::VerifierError(_) => exit_codes::USER_ERROR,
        }
    }
}

/// Result type alias for warden operations.
pub type Result<T> = std::result::Result<T, WardenError>;
