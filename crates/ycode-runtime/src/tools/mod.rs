//! Built-in tools. The list in [`builtin_tools`] is the whole registration.

mod files;
mod memory;
mod shell;
mod skill;
mod task;
mod todo;

pub use files::{AppendFileTool, EditFileTool, ListDirectoryTool, ReadFileTool, WriteFileTool};
pub use memory::{MemorySearchTool, MemoryWriterTool};
pub use shell::RunTool;
pub use skill::SkillTool;
pub use task::TaskTool;
pub use todo::TodoWriterTool;

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use ycode_core::{Result, ToolCall, YcodeError};
use ycode_memory::MemoryStore;
use ycode_skills::SkillRegistry;

use crate::freshness::FreshnessGuard;
use crate::registry::ToolHandler;
use crate::session::SessionContext;
use crate::todo::TodoBoard;

pub const TODO_WRITER: &str = "TodoWriter";
pub const MEMORY_WRITER: &str = "MemoryWriter";
pub const MEMORY_SEARCH: &str = "MemorySearch";
pub const TASK: &str = "Task";
pub const SKILL: &str = "Skill";
pub const READ_FILE: &str = "read_file";
pub const WRITE_FILE: &str = "write_file";
pub const APPEND_FILE: &str = "append_file";
pub const EDIT_FILE: &str = "edit_file";
pub const LIST_DIRECTORY: &str = "list_directory";
pub const RUN: &str = "run";

/// State the built-in tools act on.
#[derive(Clone)]
pub struct ToolContext {
    pub workdir: PathBuf,
    pub session: Arc<SessionContext>,
    pub todos: Arc<TodoBoard>,
    pub memory: Arc<MemoryStore>,
    pub freshness: Arc<FreshnessGuard>,
    pub skills: Arc<SkillRegistry>,
}

/// Every built-in except `Task`, which needs the finished registry.
pub fn builtin_tools(ctx: &ToolContext) -> Vec<Arc<dyn ToolHandler>> {
    vec![
        Arc::new(TodoWriterTool::new(ctx)),
        Arc::new(MemoryWriterTool::new(ctx)),
        Arc::new(MemorySearchTool::new(ctx)),
        Arc::new(SkillTool::new(ctx)),
        Arc::new(ReadFileTool::new(ctx)),
        Arc::new(WriteFileTool::new(ctx)),
        Arc::new(AppendFileTool::new(ctx)),
        Arc::new(EditFileTool::new(ctx)),
        Arc::new(ListDirectoryTool::new(ctx)),
        Arc::new(RunTool::new(ctx)),
    ]
}

/// Deserialize a call's argument map into the tool's argument struct.
pub(crate) fn parse_args<T: DeserializeOwned>(call: &ToolCall) -> Result<T> {
    serde_json::from_value(call.arguments.clone()).map_err(|e| {
        YcodeError::validation(format!("invalid arguments for {}: {e}", call.tool_name))
    })
}

/// Relative paths are taken from the working directory.
pub(crate) fn resolve_path(workdir: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        workdir.join(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Args {
        query: String,
    }

    #[test]
    fn bad_arguments_are_validation_errors() {
        let call = ToolCall {
            id: "c1".into(),
            tool_name: "MemorySearch".into(),
            arguments: json!({"limit": 3}),
        };
        let err = parse_args::<Args>(&call).err().unwrap();
        assert!(err.is_recoverable());
        assert!(err.to_string().starts_with("invalid arguments for MemorySearch"));
    }

    #[test]
    fn relative_paths_join_workdir() {
        let workdir = Path::new("/repo");
        assert_eq!(resolve_path(workdir, "src/lib.rs"), PathBuf::from("/repo/src/lib.rs"));
        assert_eq!(resolve_path(workdir, "/etc/hosts"), PathBuf::from("/etc/hosts"));
    }
}
