use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for the entire YCode runtime.
#[derive(Error, Debug)]
pub enum YcodeError {
    // ── Validation errors ──────────────────────────────────────
    /// Bad tool input: todo shape, dates, empty content, unknown category or agent type.
    #[error("{0}")]
    Validation(String),

    // ── Consistency errors ─────────────────────────────────────
    #[error("{} is stale: {reason}", path.display())]
    Stale { path: PathBuf, reason: String },

    // ── LLM errors ─────────────────────────────────────────────
    #[error("llm provider error: {0}")]
    LlmProvider(String),

    // ── Tool errors ────────────────────────────────────────────
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("tool execution failed: {tool}: {reason}")]
    ToolExecution { tool: String, reason: String },

    // ── Child tool process errors ──────────────────────────────
    #[error("tool server error: {server}: {reason}")]
    Mcp { server: String, reason: String },

    // ── Skill errors ───────────────────────────────────────────
    #[error("skill error: {0}")]
    Skill(String),

    // ── Memory errors ──────────────────────────────────────────
    #[error("memory error: {0}")]
    Memory(String),

    // ── Config errors ──────────────────────────────────────────
    #[error("config error: {0}")]
    Config(String),

    #[error("config validation failed: {field}: {reason}")]
    ConfigValidation { field: String, reason: String },

    // ── Generic wrappers ───────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl YcodeError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn stale(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Stale {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Errors the model can correct on its next attempt.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Stale { .. } | Self::ToolNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, YcodeError>;
