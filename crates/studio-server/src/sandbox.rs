use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::bridge::{ToolClient, ToolError};

// ─── DevServer ────────────────────────────────────────────────────────────

/// A provisioned sandbox session for one app.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DevServer {
    /// Public preview URL of the running site.
    pub ephemeral_url: String,
    /// Tool surface endpoint for this session.
    pub mcp_ephemeral_url: String,
    #[serde(default)]
    pub code_server_url: Option<String>,
}

// ─── SandboxProvider ──────────────────────────────────────────────────────

/// Boundary to the remote sandbox service. The service itself is external;
/// the core only provisions sessions, health-checks the preview, and talks
/// to the per-session tool surface.
#[async_trait]
pub trait SandboxProvider: Send + Sync {
    async fn request_dev_server(&self, repo_id: &str, base_id: &str)
        -> anyhow::Result<DevServer>;

    /// True when the preview URL answers with a success status. Any
    /// transport failure counts as unhealthy.
    async fn check_preview(&self, url: &str) -> bool;

    fn tool_client(&self, dev: &DevServer) -> Arc<dyn ToolClient>;
}

// ─── HttpSandbox ──────────────────────────────────────────────────────────

/// Production sandbox client over the provisioning HTTP API.
pub struct HttpSandbox {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpSandbox {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }
}

#[async_trait]
impl SandboxProvider for HttpSandbox {
    async fn request_dev_server(
        &self,
        repo_id: &str,
        base_id: &str,
    ) -> anyhow::Result<DevServer> {
        debug!(repo_id = %repo_id, base_id = %base_id, "requesting dev server");
        let mut request = self
            .client
            .post(format!("{}/v1/dev-servers", self.base_url))
            .json(&json!({ "repo_id": repo_id, "base_id": base_id }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let dev = request
            .send()
            .await?
            .error_for_status()?
            .json::<DevServer>()
            .await?;
        Ok(dev)
    }

    async fn check_preview(&self, url: &str) -> bool {
        let response = self
            .client
            .get(url)
            .timeout(Duration::from_secs(10))
            .send()
            .await;
        match response {
            Ok(r) if r.status().is_success() => true,
            Ok(r) => {
                warn!(url = %url, status = %r.status(), "preview health check failed");
                false
            }
            Err(e) => {
                warn!(url = %url, error = %e, "preview unreachable");
                false
            }
        }
    }

    fn tool_client(&self, dev: &DevServer) -> Arc<dyn ToolClient> {
        Arc::new(HttpToolClient::new(dev.mcp_ephemeral_url.clone()))
    }
}

// ─── HttpToolClient ───────────────────────────────────────────────────────

/// JSON-RPC client for the sandbox's per-session tool surface
/// (`tools/list`, `tools/call`).
pub struct HttpToolClient {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    message: String,
}

impl HttpToolClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    async fn rpc(&self, method: &str, params: Value) -> Result<Value, ToolError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| ToolError::Transport(e.to_string()))?
            .json::<RpcResponse>()
            .await
            .map_err(|e| ToolError::Transport(e.to_string()))?;

        if let Some(error) = response.error {
            return Err(ToolError::Rpc(error.message));
        }
        Ok(response.result.unwrap_or(Value::Null))
    }
}

#[async_trait]
impl ToolClient for HttpToolClient {
    async fn list_tools(&self) -> Result<Vec<String>, ToolError> {
        let result = self.rpc("tools/list", json!({})).await?;
        let names = result
            .get("tools")
            .and_then(Value::as_array)
            .map(|tools| {
                tools
                    .iter()
                    .filter_map(|t| t.get("name").and_then(Value::as_str))
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();
        Ok(names)
    }

    async fn call_tool(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        self.rpc("tools/call", json!({ "name": name, "arguments": args }))
            .await
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn request_dev_server_parses_session() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/dev-servers")
            .match_body(mockito::Matcher::Json(
                json!({ "repo_id": "r1", "base_id": "b1" }),
            ))
            .with_status(200)
            .with_body(
                json!({
                    "ephemeral_url": "https://preview.test",
                    "mcp_ephemeral_url": "https://mcp.test",
                })
                .to_string(),
            )
            .create_async()
            .await;

        let sandbox = HttpSandbox::new(server.url(), None);
        let dev = sandbox.request_dev_server("r1", "b1").await.unwrap();

        mock.assert_async().await;
        assert_eq!(dev.ephemeral_url, "https://preview.test");
        assert_eq!(dev.code_server_url, None);
    }

    #[tokio::test]
    async fn provisioning_failure_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/dev-servers")
            .with_status(502)
            .create_async()
            .await;

        let sandbox = HttpSandbox::new(server.url(), None);
        assert!(sandbox.request_dev_server("r1", "b1").await.is_err());
    }

    #[tokio::test]
    async fn check_preview_reports_status() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/ok").with_status(200).create_async().await;
        server.mock("GET", "/bad").with_status(500).create_async().await;

        let sandbox = HttpSandbox::new(server.url(), None);
        assert!(sandbox.check_preview(&format!("{}/ok", server.url())).await);
        assert!(!sandbox.check_preview(&format!("{}/bad", server.url())).await);
    }

    #[tokio::test]
    async fn unreachable_preview_is_unhealthy() {
        let sandbox = HttpSandbox::new("http://127.0.0.1:9", None);
        assert!(!sandbox.check_preview("http://127.0.0.1:9/").await);
    }

    #[tokio::test]
    async fn list_tools_extracts_names() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(200)
            .with_body(
                json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "result": { "tools": [
                        { "name": "write_file" },
                        { "name": "exec" },
                    ]},
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = HttpToolClient::new(server.url());
        let tools = client.list_tools().await.unwrap();
        assert_eq!(tools, vec!["write_file", "exec"]);
    }

    #[tokio::test]
    async fn rpc_error_surfaces_as_tool_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(200)
            .with_body(
                json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "error": { "code": -32601, "message": "unknown tool" },
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = HttpToolClient::new(server.url());
        let err = client.call_tool("nope", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::Rpc(msg) if msg == "unknown tool"));
    }
}
