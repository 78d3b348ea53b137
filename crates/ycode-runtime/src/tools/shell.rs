use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tracing::info;
use ycode_core::{Result, Tool, ToolCall, ToolResult, YcodeError};

use super::{RUN, ToolContext, parse_args};
use crate::registry::ToolHandler;

const DEFAULT_TIMEOUT_SECS: u64 = 120;
const MAX_STDOUT_CHARS: usize = 10_000;
const MAX_STDERR_CHARS: usize = 5_000;

#[derive(Deserialize)]
struct RunArgs {
    command: String,
    #[serde(default)]
    timeout_secs: Option<u64>,
}

/// Non-interactive `sh -c` in the working directory.
pub struct RunTool {
    workdir: PathBuf,
}

impl RunTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            workdir: ctx.workdir.clone(),
        }
    }
}

#[async_trait]
impl ToolHandler for RunTool {
    fn descriptor(&self) -> Tool {
        Tool::new(
            RUN,
            "Run a non-interactive shell command in the workspace and return its exit code, stdout and stderr. Stdin is /dev/null.",
            json!({
                "type": "object",
                "properties": {
                    "command": { "type": "string", "description": "Shell command to execute." },
                    "timeout_secs": { "type": "integer", "description": "Timeout in seconds (default: 120)." }
                },
                "required": ["command"],
                "additionalProperties": false
            }),
        )
    }

    async fn call(&self, call: &ToolCall) -> Result<ToolResult> {
        let args: RunArgs = parse_args(call)?;
        let timeout_secs = args.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        info!(command = %args.command, timeout_secs, "executing shell command");

        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c")
            .arg(&args.command)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(Duration::from_secs(timeout_secs), cmd.output())
            .await
            .map_err(|_| YcodeError::ToolExecution {
                tool: RUN.into(),
                reason: format!("command timed out after {timeout_secs}s"),
            })?
            .map_err(|e| YcodeError::ToolExecution {
                tool: RUN.into(),
                reason: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let exit_code = output.status.code().unwrap_or(-1);
        let content = format!(
            "Exit code: {exit_code}\n\nSTDOUT:\n{}\n\nSTDERR:\n{}",
            stdout.chars().take(MAX_STDOUT_CHARS).collect::<String>(),
            stderr.chars().take(MAX_STDERR_CHARS).collect::<String>(),
        );

        let result = if output.status.success() {
            ToolResult::text(&call.id, content)
        } else {
            ToolResult::error(&call.id, content)
        };
        Ok(result.with_data(json!({ "exit_code": exit_code })))
    }
}
