//! Transports carrying JSON-RPC messages to a server.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, info};
use ycode_core::{Result, YcodeError};

use crate::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

#[async_trait]
pub trait McpTransport: Send + Sync {
    /// Send a request and wait for the response with the same id.
    async fn send(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse>;

    async fn send_notification(&self, notification: JsonRpcNotification) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

struct StdioIo {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

/// Newline-delimited JSON-RPC over a child process's stdin/stdout.
///
/// Requests are serialised: one request is in flight at a time.
pub struct StdioTransport {
    server: String,
    io: Mutex<StdioIo>,
}

impl StdioTransport {
    /// Start `command` in `workdir`. Its stderr is discarded.
    pub fn spawn(
        server: &str,
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
        workdir: &Path,
    ) -> Result<Self> {
        let mut child = Command::new(command)
            .args(args)
            .envs(env)
            .current_dir(workdir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| mcp_error(server, format!("failed to start `{command}`: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| mcp_error(server, "stdin not captured"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| mcp_error(server, "stdout not captured"))?;

        info!(server, command, pid = child.id(), "tool server started");
        Ok(Self {
            server: server.to_string(),
            io: Mutex::new(StdioIo {
                child,
                stdin,
                stdout: BufReader::new(stdout).lines(),
            }),
        })
    }

    async fn write_line(&self, io: &mut StdioIo, line: String) -> Result<()> {
        io.stdin
            .write_all(format!("{line}\n").as_bytes())
            .await
            .map_err(|e| mcp_error(&self.server, format!("write failed: {e}")))?;
        io.stdin
            .flush()
            .await
            .map_err(|e| mcp_error(&self.server, format!("write failed: {e}")))
    }
}

pub(crate) fn mcp_error(server: &str, reason: impl Into<String>) -> YcodeError {
    YcodeError::Mcp {
        server: server.to_string(),
        reason: reason.into(),
    }
}

#[async_trait]
impl McpTransport for StdioTransport {
    async fn send(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse> {
        let mut io = self.io.lock().await;
        let line = serde_json::to_string(&request)?;
        debug!(server = %self.server, method = %request.method, "tool server request");
        self.write_line(&mut io, line).await?;

        loop {
            let line = io
                .stdout
                .next_line()
                .await
                .map_err(|e| mcp_error(&self.server, format!("read failed: {e}")))?
                .ok_or_else(|| mcp_error(&self.server, "server closed its output"))?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Ok(value) = serde_json::from_str::<serde_json::Value>(line) else {
                debug!(server = %self.server, line, "ignoring non-JSON output");
                continue;
            };
            let is_response = value.get("result").is_some() || value.get("error").is_some();
            if !is_response {
                // Server-initiated notification or request.
                debug!(server = %self.server, method = ?value.get("method"), "ignoring server message");
                continue;
            }
            let response: JsonRpcResponse = serde_json::from_value(value)?;
            if response.id == request.id {
                return Ok(response);
            }
            debug!(server = %self.server, id = ?response.id, "ignoring response for another request");
        }
    }

    async fn send_notification(&self, notification: JsonRpcNotification) -> Result<()> {
        let mut io = self.io.lock().await;
        let line = serde_json::to_string(&notification)?;
        self.write_line(&mut io, line).await
    }

    async fn close(&self) -> Result<()> {
        let mut io = self.io.lock().await;
        io.child.kill().await?;
        info!(server = %self.server, "tool server stopped");
        Ok(())
    }
}

/// Transport that replays canned responses, for tests.
#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::sync::Mutex as Shared;

    pub(crate) struct MockTransport {
        responses: Shared<Vec<JsonRpcResponse>>,
        pub(crate) requests: Shared<Vec<JsonRpcRequest>>,
        pub(crate) notifications: Shared<Vec<JsonRpcNotification>>,
    }

    impl MockTransport {
        pub(crate) fn new(responses: Vec<JsonRpcResponse>) -> Self {
            Self {
                responses: Shared::new(responses),
                requests: Shared::new(Vec::new()),
                notifications: Shared::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl McpTransport for MockTransport {
        async fn send(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse> {
            self.requests.lock().unwrap().push(request.clone());
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Ok(JsonRpcResponse::failure(request.id, -32603, "no more mock responses"));
            }
            let mut resp = responses.remove(0);
            resp.id = request.id;
            Ok(resp)
        }

        async fn send_notification(&self, notification: JsonRpcNotification) -> Result<()> {
            self.notifications.lock().unwrap().push(notification);
            Ok(())
        }

        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }
}
