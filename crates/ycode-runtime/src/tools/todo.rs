use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use ycode_core::{Result, Tool, ToolCall, ToolResult};

use super::{TODO_WRITER, ToolContext, parse_args};
use crate::registry::ToolHandler;
use crate::session::{ROUNDS_WITHOUT_TODO, SessionContext};
use crate::todo::{RawTodo, TodoBoard};

#[derive(Deserialize)]
struct TodoArgs {
    items: Vec<RawTodo>,
}

pub struct TodoWriterTool {
    todos: Arc<TodoBoard>,
    session: Arc<SessionContext>,
}

impl TodoWriterTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            todos: Arc::clone(&ctx.todos),
            session: Arc::clone(&ctx.session),
        }
    }

    fn update(&self, call: &ToolCall) -> Result<String> {
        let args: TodoArgs = parse_args(call)?;
        let rendered = self.todos.update(&args.items)?;
        self.session.set_int(ROUNDS_WITHOUT_TODO, 0);

        let status = self.todos.status();
        let summary = if status.total == 0 {
            "No todos have been created.".to_string()
        } else {
            format!(
                "Status updated: {} completed, {} in progress.",
                status.completed, status.in_progress
            )
        };
        Ok(format!("{rendered}\n {summary}"))
    }
}

#[async_trait]
impl ToolHandler for TodoWriterTool {
    fn descriptor(&self) -> Tool {
        Tool::new(
            TODO_WRITER,
            "Update the shared todo list (pending | in_progress | completed). Send the full list every time.",
            json!({
                "type": "object",
                "properties": {
                    "items": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "id": { "type": "string" },
                                "content": { "type": "string" },
                                "activeForm": { "type": "string" },
                                "status": { "type": "string", "enum": ["pending", "in_progress", "completed"] }
                            },
                            "required": ["content", "activeForm", "status"],
                            "additionalProperties": false
                        },
                        "maxItems": 20
                    }
                },
                "required": ["items"]
            }),
        )
    }

    async fn call(&self, call: &ToolCall) -> Result<ToolResult> {
        Ok(match self.update(call) {
            Ok(text) => ToolResult::text(&call.id, text),
            Err(e) => ToolResult::error(&call.id, format!("Error updating todos: {e}")),
        })
    }
}
