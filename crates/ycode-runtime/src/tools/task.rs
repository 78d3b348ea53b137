use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use ycode_core::{Result, Tool, ToolCall, ToolResult};

use super::{TASK, parse_args};
use crate::registry::ToolHandler;
use crate::subagent::{AgentProfiles, SubagentOrchestrator};

#[derive(Deserialize)]
struct TaskArgs {
    description: String,
    prompt: String,
    agent_type: String,
}

/// Spawns a subagent and returns its transcript as the tool result.
pub struct TaskTool {
    orchestrator: Arc<SubagentOrchestrator>,
}

impl TaskTool {
    pub fn new(orchestrator: Arc<SubagentOrchestrator>) -> Self {
        Self { orchestrator }
    }
}

#[async_trait]
impl ToolHandler for TaskTool {
    fn descriptor(&self) -> Tool {
        Tool::new(
            TASK,
            format!(
                "Spawn a subagent for a focused subtask. Subagents run in ISOLATED context - they don't see parent's history. \
                 Use this to keep the main conversation clean.\n\nAgent types:\n{}\n\nExample uses:\n\
                 - Task(explore): \"Find all files using the auth module.\"\n\
                 - Task(plan): \"Design a migration strategy for the database\"\n\
                 - Task(code): \"Implement the user registration form\"",
                AgentProfiles::description()
            ),
            json!({
                "type": "object",
                "properties": {
                    "description": { "type": "string", "description": "Short task name (3-5 words) for progress display" },
                    "prompt": { "type": "string", "description": "Detailed instructions for the subagent" },
                    "agent_type": { "type": "string", "enum": AgentProfiles::names(), "description": "Type of agent to spawn" }
                },
                "required": ["description", "prompt", "agent_type"],
                "additionalProperties": false
            }),
        )
    }

    async fn call(&self, call: &ToolCall) -> Result<ToolResult> {
        let args: TaskArgs = parse_args(call)?;
        let summary = self
            .orchestrator
            .run_task(&args.description, &args.prompt, &args.agent_type)
            .await?;
        Ok(ToolResult::text(&call.id, summary))
    }
}
