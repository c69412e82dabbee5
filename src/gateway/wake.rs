//! Waking the main agent and requesting heartbeats.

use super::client::GatewayClient;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Timeout for wake and heartbeat calls.
const WAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Window over which heartbeat requests are merged.
pub const HEARTBEAT_COALESCE_WINDOW: Duration = Duration::from_secs(1);

#[async_trait]
pub trait WakeSink: Send + Sync {
    /// Enqueue a system event for the main session.
    async fn wake(&self, text: &str) -> Result<()>;

    async fn heartbeat(&self, reason: &str) -> Result<()>;
}

/// [`WakeSink`] backed by gateway RPC (`wake`, `heartbeat`).
pub struct GatewayWakeSink {
    client: Arc<dyn GatewayClient>,
}

impl GatewayWakeSink {
    pub fn new(client: Arc<dyn GatewayClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WakeSink for GatewayWakeSink {
    async fn wake(&self, text: &str) -> Result<()> {
        self.client
            .call("wake", json!({ "text": text, "mode": "now" }), WAKE_TIMEOUT)
            .await
            .map(|_| ())
    }

    async fn heartbeat(&self, reason: &str) -> Result<()> {
        self.client
            .call("heartbeat", json!({ "reason": reason }), WAKE_TIMEOUT)
            .await
            .map(|_| ())
    }
}

/// Merges heartbeat requests arriving within one window into one call.
///
/// The first request opens the window and schedules the heartbeat; requests
/// arriving before it fires only add their reason.
#[derive(Clone)]
pub struct HeartbeatCoalescer {
    sink: Arc<dyn WakeSink>,
    window: Duration,
    pending: Arc<Mutex<Option<Vec<String>>>>,
    timer: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl HeartbeatCoalescer {
    pub fn new(sink: Arc<dyn WakeSink>) -> Self {
        Self::with_window(sink, HEARTBEAT_COALESCE_WINDOW)
    }

    pub fn with_window(sink: Arc<dyn WakeSink>, window: Duration) -> Self {
        Self {
            sink,
            window,
            pending: Arc::new(Mutex::new(None)),
            timer: Arc::new(Mutex::new(None)),
        }
    }

    /// Request a heartbeat. Returns true when this call opened a new window.
    pub fn request(&self, reason: &str) -> bool {
        {
            let mut pending = lock(&self.pending);
            if let Some(reasons) = pending.as_mut() {
                if !reasons.iter().any(|r| r == reason) {
                    reasons.push(reason.to_string());
                }
                return false;
            }
            *pending = Some(vec![reason.to_string()]);
        }

        let coalescer = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(coalescer.window).await;
            let reasons = lock(&coalescer.pending).take();
            if let Some(reasons) = reasons {
                coalescer.send(&reasons).await;
            }
        });
        *lock(&self.timer) = Some(handle);
        true
    }

    /// Send any pending heartbeat now instead of at the end of its window.
    ///
    /// Waits for a heartbeat already being sent. One-shot callers await this
    /// before the runtime shuts down.
    pub async fn flush(&self) {
        let timer = lock(&self.timer).take();
        let reasons = lock(&self.pending).take();
        match (reasons, timer) {
            (Some(reasons), timer) => {
                if let Some(timer) = timer {
                    timer.abort();
                }
                self.send(&reasons).await;
            }
            (None, Some(timer)) => {
                let _ = timer.await;
            }
            (None, None) => {}
        }
    }

    async fn send(&self, reasons: &[String]) {
        let reason = reasons.join(", ");
        if let Err(e) = self.sink.heartbeat(&reason).await {
            tracing::warn!(error = %e, "heartbeat request failed");
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|p| p.into_inner())
}
