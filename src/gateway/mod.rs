//! The boundary to the agent gateway.
//!
//! Everything that leaves this process goes through [`GatewayClient::call`]:
//! spawning a sub-agent (`agent`), waking the main session (`wake`) and
//! requesting a heartbeat (`heartbeat`).

mod client;
mod retry;
mod wake;


pub use client::{GatewayClient, HttpGatewayClient};
pub use retry::{Attempted, RetryPolicy};
pub use wake::{GatewayWakeSink, HEARTBEAT_COALESCE_WINDOW, HeartbeatCoalescer, WakeSink};
