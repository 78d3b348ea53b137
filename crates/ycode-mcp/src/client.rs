use serde_json::{Value, json};
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::debug;
use ycode_core::Result;

use crate::protocol::{JsonRpcId, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use crate::transport::{McpTransport, mcp_error};
use crate::types::{McpServerInfo, McpToolDef, McpToolResult};

const PROTOCOL_VERSION: &str = "2024-11-05";

/// Client for one MCP server.
pub struct McpClient {
    server: String,
    transport: Box<dyn McpTransport>,
    next_id: AtomicI64,
}

impl McpClient {
    pub fn new(server: impl Into<String>, transport: Box<dyn McpTransport>) -> Self {
        Self {
            server: server.into(),
            transport,
            next_id: AtomicI64::new(1),
        }
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    fn next_id(&self) -> JsonRpcId {
        JsonRpcId::Number(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let mut req = JsonRpcRequest::new(self.next_id(), method);
        if let Some(params) = params {
            req = req.with_params(params);
        }
        let JsonRpcResponse { result, error, .. } = self.transport.send(req).await?;
        if let Some(err) = error {
            return Err(mcp_error(
                &self.server,
                format!("{method} failed ({}): {}", err.code, err.message),
            ));
        }
        Ok(result.unwrap_or(Value::Null))
    }

    /// Handshake: `initialize`, then the `notifications/initialized` notification.
    pub async fn initialize(&self) -> Result<McpServerInfo> {
        let result = self
            .request(
                "initialize",
                Some(json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "clientInfo": { "name": "ycode", "version": env!("CARGO_PKG_VERSION") },
                    "capabilities": {}
                })),
            )
            .await?;

        let info = McpServerInfo {
            name: result
                .pointer("/serverInfo/name")
                .and_then(Value::as_str)
                .unwrap_or(&self.server)
                .to_string(),
            version: result
                .pointer("/serverInfo/version")
                .and_then(Value::as_str)
                .map(str::to_string),
            instructions: result
                .get("instructions")
                .and_then(Value::as_str)
                .map(str::to_string),
        };

        self.transport
            .send_notification(JsonRpcNotification::new("notifications/initialized"))
            .await?;
        debug!(server = %self.server, remote = %info.name, "tool server initialized");
        Ok(info)
    }

    pub async fn list_tools(&self) -> Result<Vec<McpToolDef>> {
        let result = self.request("tools/list", None).await?;
        let tools = match result.get("tools") {
            Some(tools) => serde_json::from_value(tools.clone())
                .map_err(|e| mcp_error(&self.server, format!("bad tools/list payload: {e}")))?,
            None => Vec::new(),
        };
        Ok(tools)
    }

    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<McpToolResult> {
        let result = self
            .request("tools/call", Some(json!({ "name": name, "arguments": arguments })))
            .await?;
        serde_json::from_value(result)
            .map_err(|e| mcp_error(&self.server, format!("bad tools/call payload: {e}")))
    }

    pub async fn close(&self) -> Result<()> {
        self.transport.close().await
    }
}
