//! Fakes and fixtures shared by unit tests.

use crate::config::Config;
use crate::context::WorkspaceContext;
use crate::error::{Result, WardenError};
use crate::gateway::{GatewayClient, WakeSink};
use crate::recon::ProcessProbe;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// A temporary workspace with a resolved context.
pub(crate) struct TestWorkspace {
    pub(crate) dir: TempDir,
    pub(crate) config: Config,
    pub(crate) ctx: WorkspaceContext,
}

impl TestWorkspace {
    pub(crate) fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub(crate) fn with_config(config: Config) -> Self {
        let dir = TempDir::new().unwrap();
        let ctx = WorkspaceContext::new(dir.path(), &config);
        Self { dir, config, ctx }
    }

    pub(crate) fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Append raw incident lines to `memory/incidents.jsonl`.
    pub(crate) fn append_incidents(&self, lines: &[Value]) {
        let path = self.ctx.incidents_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut text = std::fs::read_to_string(&path).unwrap_or_default();
        for line in lines {
            text.push_str(&line.to_string());
            text.push('\n');
        }
        std::fs::write(&path, text).unwrap();
    }
}

/// Process table stand-in. Clones share the same table.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeProbe {
    processes: Arc<Mutex<HashMap<u32, String>>>,
    unavailable: bool,
}

impl FakeProbe {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_process(self, pid: u32, command_line: &str) -> Self {
        self.processes
            .lock()
            .unwrap()
            .insert(pid, command_line.to_string());
        self
    }

    pub(crate) fn kill(&self, pid: u32) {
        self.processes.lock().unwrap().remove(&pid);
    }

    /// A probe whose every lookup fails, as when `ps` cannot be run.
    pub(crate) fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }
}

impl ProcessProbe for FakeProbe {
    fn command_line(&self, pid: u32) -> Result<Option<String>> {
        if self.unavailable {
            return Err(WardenError::VerifierError("process table unavailable".to_string()));
        }
        Ok(self.processes.lock().unwrap().get(&pid).cloned())
    }
}

/// One recorded gateway call.
#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub(crate) method: String,
    pub(crate) params: Value,
    pub(crate) timeout: Duration,
}

/// Gateway that records calls. `agent` returns `{runId: "run-<n>"}` unless
/// a scripted response is queued.
#[derive(Default)]
pub(crate) struct FakeGateway {
    calls: Mutex<Vec<RecordedCall>>,
    scripted: Mutex<VecDeque<Result<Value>>>,
}

impl FakeGateway {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn push_response(&self, response: Result<Value>) {
        self.scripted.lock().unwrap().push_back(response);
    }

    pub(crate) fn fail_next(&self, times: usize, message: &str) {
        for _ in 0..times {
            self.push_response(Err(WardenError::GatewayError(message.to_string())));
        }
    }

    pub(crate) fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn calls_to(&self, method: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == method)
            .collect()
    }
}

#[async_trait]
impl GatewayClient for FakeGateway {
    async fn call(&self, method: &str, params: Value, timeout: Duration) -> Result<Value> {
        let count = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(RecordedCall {
                method: method.to_string(),
                params,
                timeout,
            });
            calls.iter().filter(|c| c.method == method).count()
        };

        if let Some(response) = self.scripted.lock().unwrap().pop_front() {
            return response;
        }
        Ok(match method {
            "agent" => json!({ "runId": format!("run-{}", count) }),
            _ => json!({}),
        })
    }
}

/// Wake sink that records what it was asked to do.
#[derive(Default)]
pub(crate) struct FakeWake {
    pub(crate) wakes: Mutex<Vec<String>>,
    pub(crate) heartbeats: Mutex<Vec<String>>,
}

impl FakeWake {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn wake_count(&self) -> usize {
        self.wakes.lock().unwrap().len()
    }

    pub(crate) fn heartbeat_count(&self) -> usize {
        self.heartbeats.lock().unwrap().len()
    }
}

#[async_trait]
impl WakeSink for FakeWake {
    async fn wake(&self, text: &str) -> Result<()> {
        self.wakes.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn heartbeat(&self, reason: &str) -> Result<()> {
        self.heartbeats.lock().unwrap().push(reason.to_string());
        Ok(())
    }
}
