//! RPC client for the agent gateway.

use crate::config::types::GatewayConfig;
use crate::error::{Result, WardenError};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;

/// One request/response call into the gateway.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    async fn call(&self, method: &str, params: Value, timeout: Duration) -> Result<Value>;
}

/// Posts `{method, params}` to `<url>/rpc`.
#[derive(Debug, Clone)]
pub struct HttpGatewayClient {
    http: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpGatewayClient {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let http = reqwest::Client::builder().build().map_err(|e| {
            WardenError::GatewayError(format!("failed to build http client: {}", e))
        })?;
        Ok(Self {
            http,
            endpoint: format!("{}/rpc", config.url.trim_end_matches('/')),
            token: config.token.clone().filter(|t| !t.is_empty()),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GatewayClient for HttpGatewayClient {
    async fn call(&self, method: &str, params: Value, timeout: Duration) -> Result<Value> {
        let mut request = self
            .http
            .post(&self.endpoint)
            .timeout(timeout)
            .json(&json!({ "method": method, "params": params }));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            let kind = if e.is_timeout() { "timed out" } else { "failed" };
            WardenError::GatewayError(format!("{} {}: {}", method, kind, e))
        })?;

        let status = response.status();
        let body: Value = response.json().await.map_err(|e| {
            WardenError::GatewayError(format!("{} returned an unreadable body ({}): {}", method, status, e))
        })?;

        if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(WardenError::GatewayError(format!("{}: {}", method, message)));
        }
        if !status.is_success() {
            return Err(WardenError::GatewayError(format!(
                "{} returned {}",
                method, status
            )));
        }

        Ok(body.get("result").cloned().unwrap_or(body))
    }
}
