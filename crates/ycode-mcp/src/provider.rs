use async_trait::async_trait;
use serde_json::json;
use std::path::PathBuf;
use tokio::sync::OnceCell;
use tracing::{info, warn};
use ycode_config::{McpConfig, McpServerConfig};
use ycode_core::{Result, Tool, ToolCall, ToolProvider, ToolResult};

use crate::client::McpClient;
use crate::transport::{StdioTransport, mcp_error};

/// One configured tool server, exposed as a tool group.
///
/// The process is started lazily on first use and kept for the session.
pub struct McpToolProvider {
    name: String,
    launch: Option<(McpServerConfig, PathBuf)>,
    client: OnceCell<McpClient>,
}

impl McpToolProvider {
    pub fn new(config: McpServerConfig, workdir: PathBuf) -> Self {
        Self {
            name: config.name.clone(),
            launch: Some((config, workdir)),
            client: OnceCell::new(),
        }
    }

    /// Wrap an already initialized client.
    pub fn with_client(client: McpClient) -> Self {
        Self {
            name: client.server().to_string(),
            launch: None,
            client: OnceCell::new_with(Some(client)),
        }
    }

    /// Providers for every enabled server.
    pub fn from_config(config: &McpConfig, workdir: &std::path::Path) -> Vec<Self> {
        config
            .servers
            .iter()
            .filter(|s| s.enabled)
            .map(|s| Self::new(s.clone(), workdir.to_path_buf()))
            .collect()
    }

    async fn client(&self) -> Result<&McpClient> {
        self.client
            .get_or_try_init(|| async {
                let (config, workdir) = self
                    .launch
                    .as_ref()
                    .ok_or_else(|| mcp_error(&self.name, "no launch configuration"))?;
                let transport = StdioTransport::spawn(
                    &config.name,
                    &config.command,
                    &config.args,
                    &config.env,
                    workdir,
                )?;
                let client = McpClient::new(config.name.clone(), Box::new(transport));
                let info = client.initialize().await?;
                info!(group = %self.name, server = %info.name, version = ?info.version, "tool group connected");
                Ok(client)
            })
            .await
    }

    /// Stop the server process if it was started.
    pub async fn shutdown(&self) {
        if let Some(client) = self.client.get()
            && let Err(e) = client.close().await
        {
            warn!(group = %self.name, error = %e, "failed to stop tool server");
        }
    }
}

#[async_trait]
impl ToolProvider for McpToolProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> Result<Vec<Tool>> {
        let defs = self.client().await?.list_tools().await?;
        Ok(defs
            .into_iter()
            .map(|d| {
                let schema = if d.input_schema.is_null() {
                    json!({ "type": "object", "properties": {} })
                } else {
                    d.input_schema
                };
                Tool::new(d.name, d.description.unwrap_or_default(), schema).with_provider(&self.name)
            })
            .collect())
    }

    async fn call(&self, call: &ToolCall) -> Result<ToolResult> {
        let result = self
            .client()
            .await?
            .call_tool(&call.tool_name, call.arguments.clone())
            .await?;
        let text = result.text();
        Ok(if result.is_error {
            ToolResult::error(&call.id, text)
        } else {
            ToolResult::text(&call.id, text)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{JsonRpcId, JsonRpcResponse};
    use crate::transport::mock::MockTransport;

    fn provider(responses: Vec<serde_json::Value>) -> McpToolProvider {
        let responses = responses
            .into_iter()
            .map(|r| JsonRpcResponse::success(JsonRpcId::Number(0), r))
            .collect();
        McpToolProvider::with_client(McpClient::new("bash", Box::new(MockTransport::new(responses))))
    }

    #[tokio::test]
    async fn test_tools_tagged_with_group() {
        let p = provider(vec![json!({"tools": [{"name": "run"}, {"name": "kill_background"}]})]);
        let tools = p.list_tools().await.unwrap();
        assert_eq!(tools.len(), 2);
        assert!(tools.iter().all(|t| t.provider.as_deref() == Some("bash")));
        assert_eq!(tools[0].parameters["type"], "object");
        assert!(!tools[0].is_read_only);
    }

    #[tokio::test]
    async fn test_call_maps_error_flag() {
        let p = provider(vec![json!({
            "content": [{"type": "text", "text": "exit 1"}],
            "isError": true
        })]);
        let call = ToolCall {
            id: "call_1".into(),
            tool_name: "run".into(),
            arguments: json!({"command": "false"}),
        };
        let result = p.call(&call).await.unwrap();
        assert!(result.is_error);
        assert_eq!(result.tool_call_id, "call_1");
        assert_eq!(result.content, "exit 1");
    }

    #[test]
    fn test_only_enabled_servers() {
        let mut config = McpConfig::default();
        config.servers.push(McpServerConfig {
            name: "off".into(),
            command: "nothing".into(),
            args: vec![],
            env: Default::default(),
            enabled: false,
        });
        let providers = McpToolProvider::from_config(&config, std::path::Path::new("."));
        let names: Vec<&str> = providers.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["bash"]);
    }
}
