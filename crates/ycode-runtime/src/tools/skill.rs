use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use ycode_core::{Result, Tool, ToolCall, ToolResult};
use ycode_skills::SkillRegistry;

use super::{SKILL, ToolContext, parse_args};
use crate::registry::ToolHandler;

#[derive(Deserialize)]
struct SkillArgs {
    skill: String,
}

/// Injects a skill's full instructions into the conversation.
pub struct SkillTool {
    skills: Arc<SkillRegistry>,
}

impl SkillTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            skills: Arc::clone(&ctx.skills),
        }
    }
}

#[async_trait]
impl ToolHandler for SkillTool {
    fn descriptor(&self) -> Tool {
        Tool::new(
            SKILL,
            format!(
                "Load a skill to gain specialized knowledge for a task.\n\nAvailable skills:\n{}\n\n\
                 Load a skill as soon as the task matches its description, then follow its instructions.",
                self.skills.descriptions()
            ),
            json!({
                "type": "object",
                "properties": {
                    "skill": { "type": "string", "description": "Name of the skill to load" }
                },
                "required": ["skill"],
                "additionalProperties": false
            }),
        )
        .read_only()
    }

    async fn call(&self, call: &ToolCall) -> Result<ToolResult> {
        let args: SkillArgs = parse_args(call)?;
        let Some(content) = self.skills.content(&args.skill) else {
            return Ok(ToolResult::error(
                &call.id,
                format!(
                    "Error: Unknown skill '{}'. Available: {}",
                    args.skill,
                    self.skills.names().join(", ")
                ),
            ));
        };
        Ok(ToolResult::text(
            &call.id,
            format!(
                "<skill-loaded name=\"{}\">\n{content}\n</skill-loaded>\n\nFollow the instructions in the skill above to complete the user's task.",
                args.skill
            ),
        ))
    }
}
