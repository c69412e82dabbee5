//! Exit code constants for the warden CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid state)
//! - 2: Configuration error (unreadable or invalid config)
//! - 3: Ledger failure (a durable write could not be completed)
//! - 4: Gateway failure (the RPC boundary was unreachable or refused)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or invalid workspace state.
pub const USER_ERROR: i32 = 1;

/// Configuration could not be read, parsed, or validated.
pub const CONFIG_ERROR: i32 = 2;

/// A ledger, state, or status file could not be written.
pub const LEDGER_FAILURE: i32 = 3;

/// The gateway RPC call failed.
pub const GATEWAY_FAILURE: i32 = 4;
