#[cfg(test)]
#[cfg(unix)]
mod tests {
    use serde_json::json;
    use std::collections::HashMap;
    use ycode_config::McpServerConfig;
    use ycode_core::{ToolCall, ToolProvider};
    use ycode_mcp::McpToolProvider;

    fn shell_server(name: &str, script: &str) -> McpServerConfig {
        McpServerConfig {
            name: name.into(),
            command: "sh".into(),
            args: vec!["-c".into(), script.into()],
            env: HashMap::new(),
            enabled: true,
        }
    }

    mod stdio {
        use super::*;

        const FAKE_SERVER: &str = r#"
read -r line
printf '%s\n' '{"jsonrpc":"2.0","id":1,"result":{"serverInfo":{"name":"fake","version":"1.0"}}}'
read -r line
read -r line
printf '%s\n' 'booting...' '{"jsonrpc":"2.0","method":"notifications/message","params":{}}' '{"jsonrpc":"2.0","id":2,"result":{"tools":[{"name":"run","description":"Run a command"}]}}'
read -r line
printf '%s\n' '{"jsonrpc":"2.0","id":3,"result":{"content":[{"type":"text","text":"hi there"}]}}'
read -r line
"#;

        #[tokio::test]
        async fn test_handshake_list_and_call() {
            let dir = tempfile_dir();
            let provider = McpToolProvider::new(shell_server("bash", FAKE_SERVER), dir);

            let tools = provider.list_tools().await.unwrap();
            assert_eq!(tools.len(), 1);
            assert_eq!(tools[0].name, "run");
            assert_eq!(tools[0].description, "Run a command");
            assert_eq!(tools[0].provider.as_deref(), Some("bash"));

            let call = ToolCall {
                id: "call_1".into(),
                tool_name: "run".into(),
                arguments: json!({"command": "echo hi there"}),
            };
            let result = provider.call(&call).await.unwrap();
            assert!(!result.is_error);
            assert_eq!(result.content, "hi there");

            provider.shutdown().await;
        }

        #[tokio::test]
        async fn test_server_that_exits_reports_closed_output() {
            let provider =
                McpToolProvider::new(shell_server("quitter", "read -r line; exit 0"), tempfile_dir());
            let err = provider.list_tools().await.unwrap_err().to_string();
            assert!(err.contains("quitter"), "{err}");
            assert!(err.contains("closed"), "{err}");
        }

        #[tokio::test]
        async fn test_missing_command_fails_to_start() {
            let mut config = shell_server("ghost", "");
            config.command = "ycode-no-such-binary-for-tests".into();
            let provider = McpToolProvider::new(config, tempfile_dir());
            let err = provider.list_tools().await.unwrap_err().to_string();
            assert!(err.contains("failed to start"), "{err}");
        }

        fn tempfile_dir() -> std::path::PathBuf {
            std::env::temp_dir()
        }
    }
}
