//! File tools. Every mutation checks the freshness guard first.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::info;
use ycode_core::{Result, Tool, ToolCall, ToolResult, YcodeError};

use super::{
    APPEND_FILE, EDIT_FILE, LIST_DIRECTORY, READ_FILE, ToolContext, WRITE_FILE, parse_args,
    resolve_path,
};
use crate::freshness::FreshnessGuard;
use crate::registry::ToolHandler;

const MAX_READ_CHARS: usize = 50_000;

fn io_error(tool: &str, path: &Path, e: std::io::Error) -> YcodeError {
    YcodeError::ToolExecution {
        tool: tool.into(),
        reason: format!("{}: {e}", path.display()),
    }
}

async fn ensure_parent(tool: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| io_error(tool, parent, e))?;
    }
    Ok(())
}

#[derive(Deserialize)]
struct PathArgs {
    path: String,
}

pub struct ReadFileTool {
    workdir: PathBuf,
    freshness: Arc<FreshnessGuard>,
}

impl ReadFileTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            workdir: ctx.workdir.clone(),
            freshness: Arc::clone(&ctx.freshness),
        }
    }
}

#[async_trait]
impl ToolHandler for ReadFileTool {
    fn descriptor(&self) -> Tool {
        Tool::new(
            READ_FILE,
            "Read a file from the workspace. A file must be read before it can be modified.",
            json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "Path relative to the workspace, or absolute." }
                },
                "required": ["path"],
                "additionalProperties": false
            }),
        )
        .read_only()
    }

    async fn call(&self, call: &ToolCall) -> Result<ToolResult> {
        let args: PathArgs = parse_args(call)?;
        let path = resolve_path(&self.workdir, &args.path);
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| io_error(READ_FILE, &path, e))?;
        self.freshness.mark_read(&path);

        let total_chars = content.chars().count();
        let mut text: String = content.chars().take(MAX_READ_CHARS).collect();
        if total_chars > MAX_READ_CHARS {
            text.push_str(&format!("\n\n[truncated: showing {MAX_READ_CHARS} of {total_chars} characters]"));
        }
        Ok(ToolResult::text(&call.id, text).with_data(json!({ "bytes": content.len() })))
    }
}

#[derive(Deserialize)]
struct WriteArgs {
    path: String,
    content: String,
}

pub struct WriteFileTool {
    workdir: PathBuf,
    freshness: Arc<FreshnessGuard>,
}

impl WriteFileTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            workdir: ctx.workdir.clone(),
            freshness: Arc::clone(&ctx.freshness),
        }
    }
}

#[async_trait]
impl ToolHandler for WriteFileTool {
    fn descriptor(&self) -> Tool {
        Tool::new(
            WRITE_FILE,
            "Write content to a file (create or overwrite). Existing files must be read first.",
            json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "Path relative to the workspace, or absolute." },
                    "content": { "type": "string", "description": "Full file contents to write." }
                },
                "required": ["path", "content"],
                "additionalProperties": false
            }),
        )
    }

    async fn call(&self, call: &ToolCall) -> Result<ToolResult> {
        let args: WriteArgs = parse_args(call)?;
        let path = resolve_path(&self.workdir, &args.path);
        self.freshness.assert_fresh(&path)?;

        ensure_parent(WRITE_FILE, &path).await?;
        tokio::fs::write(&path, &args.content)
            .await
            .map_err(|e| io_error(WRITE_FILE, &path, e))?;
        self.freshness.reset_write_offset(&path);
        self.freshness.mark_read(&path);

        info!(path = %path.display(), bytes = args.content.len(), "file written");
        Ok(ToolResult::text(
            &call.id,
            format!("Successfully wrote {} bytes to {}", args.content.len(), args.path),
        ))
    }
}

#[derive(Deserialize)]
struct AppendArgs {
    path: String,
    content: String,
    offset: u64,
}

/// Chunked writes: each chunk names the byte offset it expects to land at.
pub struct AppendFileTool {
    workdir: PathBuf,
    freshness: Arc<FreshnessGuard>,
}

impl AppendFileTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            workdir: ctx.workdir.clone(),
            freshness: Arc::clone(&ctx.freshness),
        }
    }
}

#[async_trait]
impl ToolHandler for AppendFileTool {
    fn descriptor(&self) -> Tool {
        Tool::new(
            APPEND_FILE,
            "Append a chunk to a file. `offset` must equal the file's current length (the offset returned by the previous append).",
            json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "Path relative to the workspace, or absolute." },
                    "content": { "type": "string", "description": "Text to append." },
                    "offset": { "type": "integer", "minimum": 0, "description": "Byte offset this chunk starts at." }
                },
                "required": ["path", "content", "offset"],
                "additionalProperties": false
            }),
        )
    }

    async fn call(&self, call: &ToolCall) -> Result<ToolResult> {
        let args: AppendArgs = parse_args(call)?;
        let path = resolve_path(&self.workdir, &args.path);
        self.freshness.assert_fresh(&path)?;
        self.freshness.assert_write_offset(&path, args.offset)?;

        ensure_parent(APPEND_FILE, &path).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| io_error(APPEND_FILE, &path, e))?;
        file.write_all(args.content.as_bytes())
            .await
            .map_err(|e| io_error(APPEND_FILE, &path, e))?;
        file.flush().await.map_err(|e| io_error(APPEND_FILE, &path, e))?;

        let written = args.content.len() as u64;
        self.freshness.advance_write_offset(&path, written);
        self.freshness.mark_read(&path);

        let next = args.offset + written;
        Ok(ToolResult::text(
            &call.id,
            format!("Appended {written} bytes to {}; next offset is {next}", args.path),
        )
        .with_data(json!({ "next_offset": next })))
    }
}

#[derive(Deserialize)]
struct EditArgs {
    path: String,
    old_text: String,
    new_text: String,
    #[serde(default)]
    replace_all: bool,
}

pub struct EditFileTool {
    workdir: PathBuf,
    freshness: Arc<FreshnessGuard>,
}

impl EditFileTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            workdir: ctx.workdir.clone(),
            freshness: Arc::clone(&ctx.freshness),
        }
    }
}

#[async_trait]
impl ToolHandler for EditFileTool {
    fn descriptor(&self) -> Tool {
        Tool::new(
            EDIT_FILE,
            "Search-and-replace edit. `old_text` must match exactly once unless `replace_all` is true. The file must be read first.",
            json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "Path relative to the workspace, or absolute." },
                    "old_text": { "type": "string", "description": "Exact text to find, including whitespace." },
                    "new_text": { "type": "string", "description": "Replacement text." },
                    "replace_all": { "type": "boolean", "default": false }
                },
                "required": ["path", "old_text", "new_text"],
                "additionalProperties": false
            }),
        )
    }

    async fn call(&self, call: &ToolCall) -> Result<ToolResult> {
        let args: EditArgs = parse_args(call)?;
        if args.old_text.is_empty() {
            return Err(YcodeError::validation("old_text cannot be empty"));
        }
        let path = resolve_path(&self.workdir, &args.path);
        self.freshness.assert_fresh(&path)?;

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| io_error(EDIT_FILE, &path, e))?;
        let occurrences = content.matches(&args.old_text).count();
        if occurrences == 0 {
            return Err(YcodeError::validation(format!(
                "old_text not found in {}; match the exact text including whitespace",
                args.path
            )));
        }
        if occurrences > 1 && !args.replace_all {
            return Err(YcodeError::validation(format!(
                "old_text matches {occurrences} times in {}; add context or set replace_all",
                args.path
            )));
        }

        let updated = if args.replace_all {
            content.replace(&args.old_text, &args.new_text)
        } else {
            content.replacen(&args.old_text, &args.new_text, 1)
        };
        tokio::fs::write(&path, &updated)
            .await
            .map_err(|e| io_error(EDIT_FILE, &path, e))?;
        self.freshness.reset_write_offset(&path);
        self.freshness.mark_read(&path);

        Ok(ToolResult::text(
            &call.id,
            format!(
                "Successfully edited {} ({occurrences} occurrence{} replaced)",
                args.path,
                if occurrences == 1 { "" } else { "s" }
            ),
        )
        .with_data(json!({ "occurrences": occurrences })))
    }
}

pub struct ListDirectoryTool {
    workdir: PathBuf,
}

impl ListDirectoryTool {
    pub fn new(ctx: &ToolContext) -> Self {
        Self {
            workdir: ctx.workdir.clone(),
        }
    }
}

#[async_trait]
impl ToolHandler for ListDirectoryTool {
    fn descriptor(&self) -> Tool {
        Tool::new(
            LIST_DIRECTORY,
            "List entries in a directory. Directories end with '/'.",
            json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "Path relative to the workspace, or absolute." }
                },
                "required": ["path"],
                "additionalProperties": false
            }),
        )
        .read_only()
    }

    async fn call(&self, call: &ToolCall) -> Result<ToolResult> {
        let args: PathArgs = parse_args(call)?;
        let path = resolve_path(&self.workdir, &args.path);
        let mut dir = tokio::fs::read_dir(&path)
            .await
            .map_err(|e| io_error(LIST_DIRECTORY, &path, e))?;

        let mut entries = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| io_error(LIST_DIRECTORY, &path, e))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            entries.push(if is_dir { format!("{name}/") } else { name });
        }
        entries.sort();

        let text = if entries.is_empty() {
            "(empty directory)".to_string()
        } else {
            entries.join("\n")
        };
        Ok(ToolResult::text(&call.id, text))
    }
}
