use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use ycode_core::{Result, Tool, ToolCall, ToolResult};
use ycode_memory::{MemoryStore, MemoryWrite};

use super::{MEMORY_SEARCH, MEMORY_WRITER, ToolContext, parse_args};
use crate::registry::ToolHandler;
use crate::session::{LAST_MEMORY_ACTIVITY_ROUND, SessionContext, TOTAL_ROUNDS};

const DEFAULT_SEARCH_LIMIT: usize = 8;

fn touch(session: &SessionContext) {
    session.set_int(LAST_MEMORY_ACTIVITY_ROUND, session.get_int(TOTAL_ROUNDS));
}

pub struct MemoryWriterTool {
    memory: Arc<MemoryStore>,
    session: Arc<SessionContext>,
}

impl MemoryWriterTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            memory: Arc::clone(&ctx.memory),
            session: Arc::clone(&ctx.session),
        }
    }
}

#[async_trait]
impl ToolHandler for MemoryWriterTool {
    fn descriptor(&self) -> Tool {
        Tool::new(
            MEMORY_WRITER,
            "Save long-term memory items (profile, daily, or project).",
            json!({
                "type": "object",
                "properties": {
                    "category": { "type": "string", "enum": ["profile", "daily", "project"] },
                    "content": { "type": "string" },
                    "date": { "type": "string", "description": "YYYY-MM-DD for daily memory (optional)" },
                    "tags": { "type": "array", "items": { "type": "string" } },
                    "project": { "type": "string", "description": "Project key for project memory (optional, defaults to current workspace name)" }
                },
                "required": ["category", "content"],
                "additionalProperties": false
            }),
        )
    }

    async fn call(&self, call: &ToolCall) -> Result<ToolResult> {
        touch(&self.session);
        let outcome = parse_args::<MemoryWrite>(call).and_then(|w| self.memory.add_memory(&w));
        Ok(match outcome {
            Ok(status) => ToolResult::text(&call.id, status),
            Err(e) => ToolResult::error(&call.id, format!("Error updating memory: {e}")),
        })
    }
}

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
    /// Out-of-range values are clamped rather than rejected.
    #[serde(default)]
    limit: Option<i64>,
}

pub struct MemorySearchTool {
    memory: Arc<MemoryStore>,
    session: Arc<SessionContext>,
}

impl MemorySearchTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            memory: Arc::clone(&ctx.memory),
            session: Arc::clone(&ctx.session),
        }
    }
}

#[async_trait]
impl ToolHandler for MemorySearchTool {
    fn descriptor(&self) -> Tool {
        Tool::new(
            MEMORY_SEARCH,
            "Search memories across profile, daily, and project scopes.",
            json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string" },
                    "limit": { "type": "integer", "minimum": 1, "maximum": 30 }
                },
                "required": ["query"],
                "additionalProperties": false
            }),
        )
        .read_only()
    }

    async fn call(&self, call: &ToolCall) -> Result<ToolResult> {
        touch(&self.session);
        let outcome = parse_args::<SearchArgs>(call).and_then(|a| {
            let limit = a.limit.map_or(DEFAULT_SEARCH_LIMIT, |l| l.clamp(1, 30) as usize);
            self.memory.search(&a.query, limit)
        });
        Ok(match outcome {
            Ok(text) => ToolResult::text(&call.id, text),
            Err(e) => ToolResult::error(&call.id, format!("Error searching memory: {e}")),
        })
    }
}
